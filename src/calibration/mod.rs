// Calibration module - per-device gain profiles
//
// This module provides:
// - profile: CalibrationProfile (gain plus measured capture metrics)
// - store: JSON persistence keyed by device id, and `apply`

pub mod profile;
pub mod store;

pub use profile::CalibrationProfile;
pub use store::{apply, safe_file_stem, CalibrationStore};
