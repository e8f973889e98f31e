use llm::ServiceConfig;
use std::time::Duration;
use thiserror::Error;
use vision::FaceSize;

use crate::prompts::{ANALYSIS_PROMPT, FALLBACK_PROMPT};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} prompt must not be empty")]
    EmptyPrompt(&'static str),
    #[error("minimum face size must be positive, got {0}")]
    ZeroFaceSize(FaceSize),
    #[error("target size must be positive, got {0}")]
    ZeroTargetSize(FaceSize),
    #[error("jpeg quality must be within 1..=100, got {0}")]
    Quality(u8),
    #[error("analysis timeout must be positive")]
    ZeroTimeout,
}

/// Settings for one [`CapturePipeline`](crate::CapturePipeline).
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub camera_index: u32,
    pub min_face_size: FaceSize,
    pub enhancement_enabled: bool,
    pub analysis_prompt: String,
    pub fallback_prompt: String,
    pub debug: bool,
    /// Canonical size of the face image sent for analysis.
    pub target_size: FaceSize,
    pub jpeg_quality: u8,
    pub analysis_timeout: Duration,
    pub preview_interval: Duration,
    pub service: ServiceConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            min_face_size: FaceSize::new(30, 30),
            enhancement_enabled: true,
            analysis_prompt: ANALYSIS_PROMPT.to_string(),
            fallback_prompt: FALLBACK_PROMPT.to_string(),
            debug: false,
            target_size: FaceSize::new(300, 300),
            jpeg_quality: 85,
            analysis_timeout: Duration::from_secs(30),
            preview_interval: Duration::from_millis(33),
            service: ServiceConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analysis_prompt.trim().is_empty() {
            return Err(ConfigError::EmptyPrompt("analysis"));
        }
        if self.fallback_prompt.trim().is_empty() {
            return Err(ConfigError::EmptyPrompt("fallback"));
        }
        if self.min_face_size.width == 0 || self.min_face_size.height == 0 {
            return Err(ConfigError::ZeroFaceSize(self.min_face_size));
        }
        if self.target_size.width == 0 || self.target_size.height == 0 {
            return Err(ConfigError::ZeroTargetSize(self.target_size));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::Quality(self.jpeg_quality));
        }
        if self.analysis_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}
