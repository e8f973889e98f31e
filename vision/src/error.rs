use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("frame buffer holds {actual} bytes, expected {expected} for {width}x{height}")]
    InvalidFrame {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("image dimensions are zero")]
    ZeroDimensions,

    #[error("invalid size {0:?}, expected WIDTHxHEIGHT")]
    InvalidSize(String),

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("failed to load face model: {0}")]
    Model(String),
}
