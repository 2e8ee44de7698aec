//! Classification event record handed to downstream consumers
//! (event transport, offline log, explanation layer).

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::analysis::classifier::Prediction;
use crate::analysis::features::SpectralSummary;

/// Discriminator serialized as the event's `type` field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Prediction,
}

/// One classified capture
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassificationEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Seconds since the Unix epoch
    pub timestamp: f64,
    pub prediction: String,
    pub confidence: f64,
    pub snr_db: f64,
    pub device_id: String,
    pub calibrated: bool,
    pub model_path: String,
    pub spectral_centroid: f64,
    pub spectral_energy: f64,
    pub spectral_entropy: f64,
    pub spectral_rolloff: f64,
    pub spectral_flux: f64,
    pub zero_crossing_rate: f64,
    pub spectral_bandwidth: f64,
    pub rms_db: f64,
}

impl ClassificationEvent {
    /// Build an event stamped with the current wall-clock time
    pub fn new(
        prediction: Prediction,
        snr_db: f64,
        summary: &SpectralSummary,
        device_id: &str,
        calibrated: bool,
        model_path: &str,
    ) -> Self {
        Self {
            kind: EventKind::Prediction,
            timestamp: unix_timestamp(),
            prediction: prediction.label,
            confidence: prediction.confidence,
            snr_db,
            device_id: device_id.to_string(),
            calibrated,
            model_path: model_path.to_string(),
            spectral_centroid: summary.spectral_centroid,
            spectral_energy: summary.spectral_energy,
            spectral_entropy: summary.spectral_entropy,
            spectral_rolloff: summary.spectral_rolloff,
            spectral_flux: summary.spectral_flux,
            zero_crossing_rate: summary.zero_crossing_rate,
            spectral_bandwidth: summary.spectral_bandwidth,
            rms_db: summary.rms_db,
        }
    }
}

fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> ClassificationEvent {
        let summary = SpectralSummary {
            spectral_centroid: 4_200.0,
            rms_db: -12.0,
            ..SpectralSummary::default()
        };
        ClassificationEvent::new(
            Prediction {
                label: "glass".to_string(),
                confidence: 0.73,
            },
            21.5,
            &summary,
            "desk-mic",
            true,
            "models/robust_model.json",
        )
    }

    #[test]
    fn test_event_json_shape() {
        let value = serde_json::to_value(sample_event()).unwrap();
        assert_eq!(value["type"], "prediction");
        assert_eq!(value["prediction"], "glass");
        assert_eq!(value["confidence"], 0.73);
        assert_eq!(value["device_id"], "desk-mic");
        assert_eq!(value["calibrated"], true);
        assert_eq!(value["spectral_centroid"], 4_200.0);
        assert_eq!(value["rms_db"], -12.0);
        assert!(value["timestamp"].as_f64().unwrap() > 0.0);
        // Only the published descriptors travel with the event
        assert!(value.get("mel_mean").is_none());
    }

    #[test]
    fn test_event_deserializes() {
        let event = sample_event();
        let json = serde_json::to_string(&event).unwrap();
        let parsed: ClassificationEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
