// Deployment manifest data models
use crate::models::TrainingConfig;
use serde::{Deserialize, Serialize};

pub const MANIFEST_VERSION: u32 = 2;
pub const FEATURE_STEP_SIZE_MS: u32 = 10;
pub const TENSOR_ARENA_SIZE: u32 = 22348;
pub const MINIMUM_ESPHOME_VERSION: &str = "2024.7.0";

/// ESPHome-compatible descriptor pairing a trained model with the runtime
/// parameters needed to load and threshold it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    #[serde(rename = "type")]
    pub kind: String,
    /// Normalized wake-word identifier (spaces replaced by underscores).
    pub wake_word: String,
    pub author: String,
    pub website: String,
    /// Model filename, `<wake_word>.tflite`.
    pub model: String,
    pub trained_languages: Vec<String>,
    pub version: u32,
    pub micro: MicroParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicroParams {
    pub probability_cutoff: f64,
    pub sliding_window_size: u32,
    pub feature_step_size: u32,
    pub tensor_arena_size: u32,
    pub minimum_esphome_version: String,
}

impl ModelManifest {
    pub fn new(model_id: &str, author: &str, website: &str, config: &TrainingConfig) -> Self {
        Self {
            kind: "micro".to_string(),
            wake_word: model_id.to_string(),
            author: author.to_string(),
            website: website.to_string(),
            model: format!("{}.tflite", model_id),
            trained_languages: vec!["en".to_string()],
            version: MANIFEST_VERSION,
            micro: MicroParams {
                probability_cutoff: config.probability_cutoff,
                sliding_window_size: config.sliding_window_size,
                feature_step_size: FEATURE_STEP_SIZE_MS,
                tensor_arena_size: TENSOR_ARENA_SIZE,
                minimum_esphome_version: MINIMUM_ESPHOME_VERSION.to_string(),
            },
        }
    }
}
