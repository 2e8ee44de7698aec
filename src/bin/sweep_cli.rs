use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use sweep_analyzer::analysis::features::FeatureExtractor;
use sweep_analyzer::analysis::preprocess::{self, QualityGate};
use sweep_analyzer::audio::load_wav;
use sweep_analyzer::baseline::{BaselineStore, CacheSource};
use sweep_analyzer::calibration::{CalibrationProfile, CalibrationStore};
use sweep_analyzer::dataset::collect_features;
use sweep_analyzer::pipeline::CaptureAnalyzer;
use sweep_analyzer::{process_file, CaptureOutcome, PipelineConfig, PipelineContext};

#[derive(Parser, Debug)]
#[command(
    name = "sweep_cli",
    about = "Capture analysis and material classification harness"
)]
struct Cli {
    /// JSON configuration file (defaults are used when absent)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory that relative configured paths are resolved against
    #[arg(long)]
    root: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a recorded capture and print the classification event
    Analyze {
        #[arg(long)]
        input: PathBuf,
        /// Dataset whose baseline is subtracted
        #[arg(long)]
        dataset: Option<String>,
        #[arg(long)]
        device: Option<String>,
    },
    /// Resolve (and cache) a dataset's baseline spectrum
    Baseline {
        #[arg(long)]
        dataset: String,
        /// Drop the cached baseline before resolving
        #[arg(long)]
        refresh: bool,
    },
    /// Save a device calibration profile
    Calibrate {
        #[arg(long)]
        device: String,
        #[arg(long, default_value_t = 1.0)]
        gain: f64,
        /// Reference capture whose quality metrics are stored with the profile
        #[arg(long)]
        reference: Option<PathBuf>,
    },
    /// Print quality metrics and spectral descriptors of a capture
    Describe {
        #[arg(long)]
        input: PathBuf,
    },
    /// Build the labeled feature table from the dataset directories
    Export {
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = cli
        .config
        .map(PipelineConfig::load_from_file)
        .unwrap_or_default();
    if let Some(root) = cli.root {
        config = config.with_root(root);
    }

    match cli.command {
        Commands::Analyze {
            input,
            dataset,
            device,
        } => run_analyze(config, &input, dataset.as_deref(), device.as_deref()),
        Commands::Baseline { dataset, refresh } => run_baseline(&config, &dataset, refresh),
        Commands::Calibrate {
            device,
            gain,
            reference,
        } => run_calibrate(&config, &device, gain, reference.as_deref()),
        Commands::Describe { input } => run_describe(&config, &input),
        Commands::Export { output } => run_export(&config, &output),
    }
}

fn run_analyze(
    config: PipelineConfig,
    input: &Path,
    dataset: Option<&str>,
    device: Option<&str>,
) -> Result<ExitCode> {
    let context = PipelineContext::load(config, device).context("loading pipeline context")?;
    let outcome = process_file(&context, input, dataset)
        .with_context(|| format!("analyzing {}", input.display()))?;

    match outcome {
        CaptureOutcome::Classified(event) => {
            println!("{}", serde_json::to_string_pretty(&event)?);
            Ok(ExitCode::from(0))
        }
        CaptureOutcome::Rejected(rejection) => {
            eprintln!("{}", rejection.hint());
            println!("{}", serde_json::to_string_pretty(&rejection)?);
            Ok(ExitCode::from(2))
        }
    }
}

fn run_baseline(config: &PipelineConfig, dataset: &str, refresh: bool) -> Result<ExitCode> {
    let store = BaselineStore::new(&config.paths, &config.audio);
    if refresh {
        store.invalidate(dataset);
    }

    match store.resolve(dataset) {
        Some(baseline) => {
            println!(
                "{}",
                json!({
                    "dataset": dataset,
                    "bins": baseline.len(),
                    "cache": CacheSource::new(&config.paths.baseline_cache_dir).path_for(dataset),
                })
            );
            Ok(ExitCode::from(0))
        }
        None => {
            eprintln!("No baseline available for {dataset}");
            Ok(ExitCode::from(2))
        }
    }
}

fn run_calibrate(
    config: &PipelineConfig,
    device: &str,
    gain: f64,
    reference: Option<&Path>,
) -> Result<ExitCode> {
    let rate = config.audio.target_sample_rate;
    let profile = match reference {
        Some(path) => {
            let wave = load_wav(path, Some(rate))
                .with_context(|| format!("loading reference {}", path.display()))?;
            CalibrationProfile::measured(gain, rate, config.audio.highpass_cutoff_hz, &wave)
        }
        None => CalibrationProfile::new(gain, rate),
    };

    let saved = CalibrationStore::new(&config.paths.calibration_dir)
        .save(device, &profile)
        .with_context(|| format!("saving calibration for {device}"))?;
    println!("{}", saved.display());
    Ok(ExitCode::from(0))
}

fn run_describe(config: &PipelineConfig, input: &Path) -> Result<ExitCode> {
    let wave = load_wav(input, Some(config.audio.target_sample_rate))
        .with_context(|| format!("loading {}", input.display()))?;
    let (cleaned, _) = preprocess::preprocess(&wave, config.audio.highpass_cutoff_hz);
    let metrics = preprocess::measure(&cleaned.to_f64());
    let rejection = QualityGate::from_config(&config.quality)
        .check(metrics.avg_db, metrics.snr_db)
        .err();

    let extractor = FeatureExtractor::new(&config.audio, &config.summary);
    let spectrogram = extractor.spectrogram(&cleaned);
    let summary = extractor.summarize(&spectrogram, &cleaned);

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "metrics": metrics,
            "rejection": rejection,
            "summary": summary,
        }))?
    );
    Ok(ExitCode::from(0))
}

fn run_export(config: &PipelineConfig, output: &Path) -> Result<ExitCode> {
    let analyzer = CaptureAnalyzer::new(config, None);
    let table = collect_features(&analyzer, &config.paths.data_audio_dir, &config.dataset);
    if table.is_empty() {
        anyhow::bail!(
            "no training examples found under {}",
            config.paths.data_audio_dir.display()
        );
    }

    table
        .write_json(output)
        .with_context(|| format!("writing {}", output.display()))?;
    println!("{}", json!({ "rows": table.len(), "counts": table.counts() }));
    Ok(ExitCode::from(0))
}
