use thiserror::Error;

/// Failures reported by a [`VideoDevice`](crate::VideoDevice).
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("video device {index} is unavailable")]
    Unavailable { index: u32 },
    #[error("no images match {0}")]
    NoMatches(String),
    #[error("invalid pattern: {0}")]
    Pattern(String),
    #[error("failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },
    #[error("device error: {0}")]
    Device(String),
}
