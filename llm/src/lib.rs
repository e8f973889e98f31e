//! Remote vision-model analysis.
//!
//! The [`VisionAnalyzer`] trait is the seam the capture pipeline talks to.
//! [`AnalysisClient`] implements it against an OpenAI-compatible
//! `chat/completions` endpoint. Failures never escape as `Err`; they are folded
//! into an [`AnalysisOutcome`] and finally into an [`AnalysisResult`].

pub mod client;
pub mod config;
pub mod model;
pub mod result;
pub mod traits;

pub use client::AnalysisClient;
pub use config::{ApiKey, ServiceConfig};
pub use result::{Analysis, AnalysisResult};
pub use traits::{AnalysisOutcome, FailureKind, ImageData, LlmError, VisionAnalyzer};
