// PipelineContext: everything a capture needs, loaded once
//
// The context bundles the configuration, the selected classifier and a
// capture analyzer (device calibration, baseline store, feature extractor). It is
// read-only after construction and shared by reference (or `Arc`) between
// captures. A reload builds a complete new context and swaps it in through
// `ContextHandle`; an existing context is never partially mutated.

use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::analysis::model::{load_best, LoadedModel};
use crate::calibration::{CalibrationProfile, CalibrationStore};
use crate::config::PipelineConfig;
use crate::error::{log_calibration_error, log_model_error, PipelineError};
use crate::pipeline::CaptureAnalyzer;

/// Startup-loaded state shared by every capture
pub struct PipelineContext {
    pub config: PipelineConfig,
    pub device_id: String,
    pub model: LoadedModel,
    pub analyzer: CaptureAnalyzer,
}

impl PipelineContext {
    /// Load calibration and model for `device_id` (or the configured default)
    ///
    /// # Errors
    /// Fails only if no usable model artifact can be loaded. A malformed
    /// calibration record is logged and the device treated as uncalibrated.
    pub fn load(config: PipelineConfig, device_id: Option<&str>) -> Result<Self, PipelineError> {
        let device_id = device_id.unwrap_or(&config.device_id).to_string();

        let store = CalibrationStore::new(&config.paths.calibration_dir);
        let calibration = match store.load(&device_id) {
            Ok(profile) => profile,
            Err(err) => {
                log_calibration_error(&err, "PipelineContext::load");
                None
            }
        };

        let model = load_best(&config.paths.model_candidates, &config.paths.model_dir)
            .inspect_err(|err| log_model_error(err, "PipelineContext::load"))?;

        tracing::info!(
            "[PipelineContext] Ready: device={}, calibrated={}, model={}",
            device_id,
            calibration.is_some(),
            model.path.display()
        );
        Ok(Self::from_parts(config, device_id, calibration, model))
    }

    /// Assemble a context from already-loaded parts
    pub fn from_parts(
        config: PipelineConfig,
        device_id: String,
        calibration: Option<CalibrationProfile>,
        model: LoadedModel,
    ) -> Self {
        let analyzer = CaptureAnalyzer::new(&config, calibration);
        Self {
            config,
            device_id,
            model,
            analyzer,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.analyzer.calibration().is_some()
    }

    pub fn model_path(&self) -> &Path {
        &self.model.path
    }
}

/// Swappable handle to the current context
///
/// Readers take a cheap `Arc` snapshot; a capture in flight keeps using the
/// context it started with even if a reload happens meanwhile.
pub struct ContextHandle {
    current: RwLock<Arc<PipelineContext>>,
}

impl ContextHandle {
    pub fn new(context: PipelineContext) -> Self {
        Self {
            current: RwLock::new(Arc::new(context)),
        }
    }

    /// Snapshot of the current context
    pub fn current(&self) -> Result<Arc<PipelineContext>, PipelineError> {
        self.current
            .read()
            .map(|guard| Arc::clone(&guard))
            .map_err(|_| PipelineError::ContextPoisoned)
    }

    /// Replace the whole context
    pub fn replace(&self, context: PipelineContext) -> Result<(), PipelineError> {
        let mut guard = self
            .current
            .write()
            .map_err(|_| PipelineError::ContextPoisoned)?;
        *guard = Arc::new(context);
        Ok(())
    }

    /// Load a fresh context from `config` and swap it in
    ///
    /// On failure the previous context stays active.
    pub fn reload(
        &self,
        config: PipelineConfig,
        device_id: Option<&str>,
    ) -> Result<(), PipelineError> {
        let context = PipelineContext::load(config, device_id)?;
        self.replace(context)?;
        tracing::info!("[PipelineContext] Reloaded");
        Ok(())
    }
}
