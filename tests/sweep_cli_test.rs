use std::fs;
use std::path::Path;
use std::process::Command;

use serde_json::Value;
use sweep_analyzer::analysis::model::ModelArtifact;
use sweep_analyzer::audio::{write_wav, Waveform};
use sweep_analyzer::PipelineConfig;

fn cli(root: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_sweep_cli"));
    command.arg("--root").arg(root);
    command
}

fn burst_capture() -> Waveform {
    let rate = 44_100;
    let samples = (0..rate as usize)
        .map(|i| {
            let t = i as f64 / rate as f64;
            let envelope = if (17_640..26_460).contains(&i) { 0.5 } else { 0.0005 };
            (envelope * (2.0 * std::f64::consts::PI * 2_000.0 * t).sin()) as f32
        })
        .collect();
    Waveform::new(samples, rate)
}

#[test]
fn calibrate_writes_profile() {
    let dir = tempfile::tempdir().unwrap();
    let output = cli(dir.path())
        .args(["calibrate", "--device", "usb mic/1", "--gain", "1.25"])
        .output()
        .expect("calibrate command");

    assert!(
        output.status.success(),
        "calibrate exited with {:?}",
        output.status.code()
    );
    let path = dir.path().join("calibration/usb_mic_1.json");
    let profile: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(profile["gain_scale"], 1.25);
    assert_eq!(profile["sample_rate"], 44_100);
}

#[test]
fn describe_prints_metrics_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("capture.wav");
    write_wav(&input, &burst_capture()).unwrap();

    let output = cli(dir.path())
        .args(["describe", "--input"])
        .arg(&input)
        .output()
        .expect("describe command");

    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).expect("stdout json");
    assert!(report["metrics"]["snr_db"].as_f64().unwrap() > 8.0);
    assert!(report["rejection"].is_null());
    assert!(report["summary"]["spectral_centroid"].as_f64().unwrap() > 0.0);
}

#[test]
fn analyze_without_model_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("capture.wav");
    write_wav(&input, &burst_capture()).unwrap();

    let output = cli(dir.path())
        .args(["analyze", "--input"])
        .arg(&input)
        .output()
        .expect("analyze command");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("robust_model.json"), "stderr was {stderr}");
}

#[test]
fn analyze_emits_prediction_event() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("capture.wav");
    write_wav(&input, &burst_capture()).unwrap();
    ModelArtifact::Constant {
        label: "plastic".to_string(),
        schema: vec![],
    }
    .save(dir.path().join("combined_all_model.json"))
    .unwrap();

    let output = cli(dir.path())
        .args(["analyze", "--device", "bench", "--input"])
        .arg(&input)
        .output()
        .expect("analyze command");

    assert!(
        output.status.success(),
        "analyze exited with {:?}: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );
    let event: Value = serde_json::from_slice(&output.stdout).expect("stdout json");
    assert_eq!(event["type"], "prediction");
    assert_eq!(event["prediction"], "plastic");
    assert_eq!(event["confidence"], 1.0);
    assert_eq!(event["device_id"], "bench");
    assert_eq!(event["calibrated"], false);
}

#[test]
fn analyze_reports_silence_rejection() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("silence.wav");
    write_wav(&input, &Waveform::new(vec![0.0; 44_100], 44_100)).unwrap();
    ModelArtifact::Constant {
        label: "plastic".to_string(),
        schema: vec![],
    }
    .save(dir.path().join("robust_model.json"))
    .unwrap();

    let output = cli(dir.path())
        .args(["analyze", "--input"])
        .arg(&input)
        .output()
        .expect("analyze command");

    assert_eq!(output.status.code(), Some(2));
    let rejection: Value = serde_json::from_slice(&output.stdout).expect("stdout json");
    assert_eq!(rejection["reason"], "too_quiet");
}

#[test]
fn export_writes_feature_table() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::default().with_root(dir.path());
    let dataset_dir = config.paths.data_audio_dir.join("dataset_2");
    fs::create_dir_all(&dataset_dir).unwrap();
    write_wav(dataset_dir.join("metal_a.wav"), &burst_capture()).unwrap();
    write_wav(dataset_dir.join("paper_a.wav"), &burst_capture()).unwrap();
    write_wav(
        dataset_dir.join("plastic_quiet.wav"),
        &Waveform::new(vec![0.0; 44_100], 44_100),
    )
    .unwrap();
    let table_path = dir.path().join("exports/features.json");

    let output = cli(dir.path())
        .args(["export", "--output"])
        .arg(&table_path)
        .output()
        .expect("export command");

    assert!(
        output.status.success(),
        "export exited with {:?}: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );
    let report: Value = serde_json::from_slice(&output.stdout).expect("stdout json");
    assert_eq!(report["rows"], 2);
    assert_eq!(report["counts"]["metal"], 1);
    assert_eq!(report["counts"]["paper"], 1);
    assert!(report["counts"]["plastic"].is_null());

    let table: Value = serde_json::from_str(&fs::read_to_string(&table_path).unwrap()).unwrap();
    let columns = table["columns"].as_array().unwrap();
    assert!(columns.iter().any(|c| c == "spectral_centroid"));
    let rows = table["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["label"], "metal");
    assert_eq!(rows[0]["values"].as_array().unwrap().len(), columns.len());
}

#[test]
fn export_without_samples_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = cli(dir.path())
        .args(["export", "--output"])
        .arg(dir.path().join("features.json"))
        .output()
        .expect("export command");

    assert_eq!(output.status.code(), Some(1));
    assert!(!dir.path().join("features.json").exists());
}
