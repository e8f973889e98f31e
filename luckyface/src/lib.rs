//! LuckyFace: point a camera at someone, find their face and ask a vision
//! model for a fortune.
//!
//! [`CapturePipeline`] owns the camera and the analysis lifecycle; [`run`]
//! drives it from a command channel.

pub mod config;
pub mod driver;
pub mod logging;
pub mod pipeline;
pub mod prompts;

pub use config::{ConfigError, PipelineConfig};
pub use driver::{Command, camera_check, run};
pub use logging::init_logging;
pub use pipeline::{CaptureOutcome, CapturePipeline, PipelineEvent, PipelineFault, PipelineState};
pub use prompts::{ANALYSIS_PROMPT, FALLBACK_PROMPT};
