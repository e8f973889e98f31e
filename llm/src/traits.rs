use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Base64 image ready to embed in a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageData {
    pub mime: String,
    pub base64: String,
}

impl ImageData {
    pub fn new(mime: impl Into<String>, base64: impl Into<String>) -> Self {
        Self {
            mime: mime.into(),
            base64: base64.into(),
        }
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.base64)
    }
}

/// Category of a failed analysis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Authentication,
    RateLimited,
    /// The service refused the request (other 4xx).
    Rejected,
    Server,
    Timeout,
    Transport,
    MalformedResponse,
}

impl FailureKind {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Authentication,
            429 => Self::RateLimited,
            400..=499 => Self::Rejected,
            _ => Self::Server,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Authentication => "authentication failed",
            Self::RateLimited => "rate limited",
            Self::Rejected => "request rejected",
            Self::Server => "server error",
            Self::Timeout => "timed out",
            Self::Transport => "transport error",
            Self::MalformedResponse => "malformed response",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Success {
        text: String,
        model: String,
        tokens: Option<u32>,
    },
    Failure {
        kind: FailureKind,
        detail: String,
    },
}

impl AnalysisOutcome {
    pub fn failure(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            detail: detail.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Errors constructing a client. Analysis itself never fails with `Err`.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Something that can describe an image given a prompt.
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    async fn analyze(&self, image: &ImageData, prompt: &str) -> AnalysisOutcome;
}
