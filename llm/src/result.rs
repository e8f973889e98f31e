use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::traits::AnalysisOutcome;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub text: String,
    pub model: String,
}

/// Outcome of one capture cycle as shown to the user.
///
/// Either `analysis` or `error_message` is set, never both; a cycle with no
/// face carries neither.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    timestamp: DateTime<Utc>,
    face_detected: bool,
    analysis: Option<Analysis>,
    error_message: Option<String>,
    tokens_used: Option<u32>,
}

impl AnalysisResult {
    pub fn analyzed(text: impl Into<String>, model: impl Into<String>, tokens: Option<u32>) -> Self {
        Self {
            timestamp: Utc::now(),
            face_detected: true,
            analysis: Some(Analysis {
                text: text.into(),
                model: model.into(),
            }),
            error_message: None,
            tokens_used: tokens,
        }
    }

    pub fn failed(face_detected: bool, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            face_detected,
            analysis: None,
            error_message: Some(message.into()),
            tokens_used: None,
        }
    }

    pub fn no_face() -> Self {
        Self {
            timestamp: Utc::now(),
            face_detected: false,
            analysis: None,
            error_message: None,
            tokens_used: None,
        }
    }

    /// A successful outcome only becomes an analysis when a face was detected.
    pub fn from_outcome(face_detected: bool, outcome: AnalysisOutcome) -> Self {
        match outcome {
            AnalysisOutcome::Success {
                text,
                model,
                tokens,
            } if face_detected => Self::analyzed(text, model, tokens),
            AnalysisOutcome::Success { .. } => {
                Self::failed(false, "analysis returned for a frame without a detected face")
            }
            AnalysisOutcome::Failure { kind, detail } => {
                Self::failed(face_detected, format!("{kind}: {detail}"))
            }
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn face_detected(&self) -> bool {
        self.face_detected
    }

    pub fn analysis(&self) -> Option<&Analysis> {
        self.analysis.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn tokens_used(&self) -> Option<u32> {
        self.tokens_used
    }
}
