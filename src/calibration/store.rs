// CalibrationStore - JSON persistence of calibration profiles
//
// One file per device at `<dir>/<safe_device_id>.json`. A missing file means
// the device is uncalibrated; saving overwrites any earlier profile.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::CalibrationProfile;
use crate::audio::Waveform;
use crate::error::CalibrationError;

pub struct CalibrationStore {
    dir: PathBuf,
}

impl CalibrationStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding `device_id`'s profile
    pub fn path_for(&self, device_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", safe_file_stem(device_id)))
    }

    /// Load a device's profile
    ///
    /// # Returns
    /// * `Ok(None)` - No profile has been saved for this device
    /// * `Ok(Some(profile))` - Stored profile
    /// * `Err(..)` - The record exists but cannot be read or parsed
    pub fn load(&self, device_id: &str) -> Result<Option<CalibrationProfile>, CalibrationError> {
        let path = self.path_for(device_id);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!("[CalibrationStore] No profile for device {}", device_id);
                return Ok(None);
            }
            Err(err) => {
                return Err(CalibrationError::ReadFailed {
                    path,
                    reason: err.to_string(),
                })
            }
        };

        let profile: CalibrationProfile =
            serde_json::from_str(&contents).map_err(|err| CalibrationError::Malformed {
                device_id: device_id.to_string(),
                reason: err.to_string(),
            })?;
        if !profile.gain_scale.is_finite() {
            return Err(CalibrationError::Malformed {
                device_id: device_id.to_string(),
                reason: format!("gain_scale is {}", profile.gain_scale),
            });
        }
        Ok(Some(profile))
    }

    /// Persist a device's profile, replacing any earlier one
    ///
    /// # Returns
    /// Path of the written file
    pub fn save(
        &self,
        device_id: &str,
        profile: &CalibrationProfile,
    ) -> Result<PathBuf, CalibrationError> {
        let path = self.path_for(device_id);
        let write_err = |reason: String| CalibrationError::WriteFailed {
            path: path.clone(),
            reason,
        };

        fs::create_dir_all(&self.dir).map_err(|err| write_err(err.to_string()))?;
        let json = serde_json::to_string_pretty(profile).map_err(|err| write_err(err.to_string()))?;
        fs::write(&path, json).map_err(|err| write_err(err.to_string()))?;

        tracing::info!(
            "[CalibrationStore] Saved profile for device {} to {}",
            device_id,
            path.display()
        );
        Ok(path)
    }
}

/// Apply an optional profile; no profile returns the waveform unchanged
pub fn apply(wave: Waveform, profile: Option<&CalibrationProfile>) -> Waveform {
    match profile {
        Some(profile) => profile.apply(&wave),
        None => wave,
    }
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`
pub fn safe_file_stem(device_id: &str) -> String {
    device_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
