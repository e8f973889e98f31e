//! HTTP client for OpenAI-compatible vision models.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::model::{ChatRequest, ChatResponse, ErrorEnvelope};
use crate::traits::{AnalysisOutcome, FailureKind, ImageData, LlmError, VisionAnalyzer};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct AnalysisClient {
    config: ServiceConfig,
    timeout: Duration,
    http: reqwest::Client,
}

impl AnalysisClient {
    pub fn new(config: ServiceConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            config,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            http,
        })
    }

    /// Per-request deadline covering connect, send and body download.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    async fn send(&self, image: &ImageData, prompt: &str) -> AnalysisOutcome {
        let body = ChatRequest::vision(
            &self.config.model,
            self.config.max_tokens,
            prompt,
            image.data_uri(),
        );
        let resp = match self
            .http
            .post(self.config.completions_url())
            .bearer_auth(self.config.api_key.expose())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return transport_failure(e),
        };

        let status = resp.status();
        let text = match resp.text().await {
            Ok(text) => text,
            Err(e) => return transport_failure(e),
        };

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|env| env.error.message)
                .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));
            return AnalysisOutcome::failure(FailureKind::from_status(status.as_u16()), detail);
        }

        let parsed: ChatResponse = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(e) => {
                return AnalysisOutcome::failure(FailureKind::MalformedResponse, e.to_string())
            }
        };
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty());
        match content {
            Some(text) => AnalysisOutcome::Success {
                text,
                model: parsed.model.unwrap_or_else(|| self.config.model.clone()),
                tokens: parsed.usage.map(|u| u.total_tokens),
            },
            None => AnalysisOutcome::failure(
                FailureKind::MalformedResponse,
                "response contained no message content",
            ),
        }
    }
}

fn transport_failure(e: reqwest::Error) -> AnalysisOutcome {
    let kind = if e.is_timeout() {
        FailureKind::Timeout
    } else if e.is_decode() {
        FailureKind::MalformedResponse
    } else {
        FailureKind::Transport
    };
    AnalysisOutcome::failure(kind, e.to_string())
}

#[async_trait]
impl VisionAnalyzer for AnalysisClient {
    async fn analyze(&self, image: &ImageData, prompt: &str) -> AnalysisOutcome {
        let started = Instant::now();
        debug!(
            model = %self.config.model,
            payload_bytes = image.base64.len(),
            "sending analysis request"
        );
        let outcome = self.send(image, prompt).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if outcome.is_success() {
            info!(model = %self.config.model, elapsed_ms, "analysis complete");
        } else if let AnalysisOutcome::Failure { kind, detail } = &outcome {
            warn!(model = %self.config.model, elapsed_ms, %kind, %detail, "analysis failed");
        }
        outcome
    }
}
