// Training configuration with documented defaults
use serde::{Deserialize, Serialize};

/// Options accepted at submission time. Every field has a default, so a
/// partial (or empty) configuration deserializes cleanly; unrecognized keys
/// are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of positive voice samples to synthesize.
    pub num_samples: u32,
    /// Voice identifiers used for sample generation.
    pub voices: Vec<String>,
    pub epochs: u32,
    pub batch_size: u32,
    pub learning_rate: f64,
    /// Detection threshold written into the deployment manifest.
    pub probability_cutoff: f64,
    pub sliding_window_size: u32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            num_samples: 2000,
            voices: vec![
                "en_US-amy-medium".to_string(),
                "en_US-joe-medium".to_string(),
            ],
            epochs: 30,
            batch_size: 512,
            learning_rate: 0.001,
            probability_cutoff: 0.97,
            sliding_window_size: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrainingConfig::default();
        assert_eq!(config.num_samples, 2000);
        assert_eq!(config.epochs, 30);
        assert_eq!(config.batch_size, 512);
        assert_eq!(config.learning_rate, 0.001);
        assert_eq!(config.probability_cutoff, 0.97);
        assert_eq!(config.sliding_window_size, 5);
        assert_eq!(config.voices.len(), 2);
    }

    #[test]
    fn test_missing_keys_fall_back_to_defaults() {
        let config: TrainingConfig =
            serde_json::from_str(r#"{"num_samples": 500, "epochs": 10}"#).unwrap();
        assert_eq!(config.num_samples, 500);
        assert_eq!(config.epochs, 10);
        assert_eq!(config.batch_size, 512);
        assert_eq!(config.probability_cutoff, 0.97);
    }

    #[test]
    fn test_unrecognized_keys_are_ignored() {
        let config: TrainingConfig =
            serde_json::from_str(r#"{"num_samples": 100, "colour": "blue"}"#).unwrap();
        assert_eq!(config.num_samples, 100);
    }

    #[test]
    fn test_empty_object_is_all_defaults() {
        let config: TrainingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, TrainingConfig::default());
    }
}
