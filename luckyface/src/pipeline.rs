//! Capture → detect → package → analyze state machine.

use llm::{AnalysisResult, ImageData, VisionAnalyzer};
use sensor::FrameSource;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use vision::{FaceLocator, FacePackager, Frame, RegionBounds};

use crate::config::{ConfigError, PipelineConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineFault {
    CameraUnavailable,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    CameraActive,
    Capturing,
    Detecting,
    NoFaceFound,
    Packaging,
    Dispatching,
    Done,
    Error(PipelineFault),
    Stopped,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(fault) => write!(f, "Error({fault:?})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Immediate answer to a capture request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The camera is not running.
    NotActive,
    /// An analysis is already in flight; the request was dropped.
    Busy,
    FrameUnavailable,
    NoFace { guidance: String },
    PackagingFailed(String),
    /// A background analysis was started for the face at `bounds`.
    Dispatched { bounds: RegionBounds },
}

/// Presentation events broadcast to subscribers.
#[derive(Clone, Debug)]
pub enum PipelineEvent {
    Analysis(AnalysisResult),
    NoFace {
        result: AnalysisResult,
        guidance: String,
    },
    Error(String),
}

pub struct CapturePipeline {
    config: PipelineConfig,
    state: PipelineState,
    source: FrameSource,
    locator: FaceLocator,
    packager: FacePackager,
    analyzer: Arc<dyn VisionAnalyzer>,
    preview: Option<Frame>,
    in_flight: Option<JoinHandle<()>>,
    results_tx: mpsc::Sender<AnalysisResult>,
    results_rx: mpsc::Receiver<AnalysisResult>,
    events: broadcast::Sender<PipelineEvent>,
    failed_reads: u64,
}

impl CapturePipeline {
    pub fn new(
        config: PipelineConfig,
        source: FrameSource,
        locator: FaceLocator,
        analyzer: Arc<dyn VisionAnalyzer>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let packager = FacePackager::new(config.target_size, config.jpeg_quality);
        let locator = locator.enhancement(config.enhancement_enabled);
        let (results_tx, results_rx) = mpsc::channel(4);
        let (events, _rx) = broadcast::channel(16);
        Ok(Self {
            config,
            state: PipelineState::Idle,
            source,
            locator,
            packager,
            analyzer,
            preview: None,
            in_flight: None,
            results_tx,
            results_rx,
            events,
            failed_reads: 0,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Frame reads that failed since construction.
    pub fn failed_reads(&self) -> u64 {
        self.failed_reads
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    /// Latest frame read by [`tick_preview`](Self::tick_preview).
    pub fn preview_frame(&self) -> Option<&Frame> {
        self.preview.as_ref()
    }

    fn transition(&mut self, to: PipelineState) {
        if self.state != to {
            debug!(from = %self.state, to = %to, "pipeline transition");
            self.state = to;
        }
    }

    fn emit(&self, event: PipelineEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn is_live(&self) -> bool {
        matches!(
            self.state,
            PipelineState::CameraActive | PipelineState::Dispatching
        )
    }

    /// Open the camera. Does nothing once stopped or while already running.
    pub fn start(&mut self) -> &PipelineState {
        match self.state {
            PipelineState::Idle | PipelineState::Error(_) => {
                let index = self.config.camera_index;
                if self.source.open(index) {
                    info!(index, "camera active");
                    self.transition(PipelineState::CameraActive);
                } else {
                    error!(index, "camera unavailable");
                    self.transition(PipelineState::Error(PipelineFault::CameraUnavailable));
                    self.emit(PipelineEvent::Error(format!("camera {index} is unavailable")));
                }
            }
            _ => {}
        }
        &self.state
    }

    /// One preview step: drain a finished analysis, then read a frame for display.
    pub fn tick_preview(&mut self) -> Option<&Frame> {
        if !self.is_live() {
            return None;
        }
        self.poll_completion();
        match self.source.read_frame() {
            Some(frame) => {
                self.preview = Some(frame);
                self.preview.as_ref()
            }
            None => {
                self.failed_reads += 1;
                warn!(failed_reads = self.failed_reads, "preview frame unavailable");
                None
            }
        }
    }

    pub fn trigger_analysis(&mut self) -> CaptureOutcome {
        self.capture_and_analyze()
    }

    /// Grab a frame, find the largest face and hand it to the analyzer.
    ///
    /// Everything up to dispatch runs on the caller; the remote call runs on
    /// a spawned task and its result arrives through
    /// [`poll_completion`](Self::poll_completion).
    pub fn capture_and_analyze(&mut self) -> CaptureOutcome {
        if !self.is_live() {
            return CaptureOutcome::NotActive;
        }
        self.poll_completion();
        if self.in_flight.is_some() {
            debug!("capture rejected, analysis in flight");
            return CaptureOutcome::Busy;
        }

        self.transition(PipelineState::Capturing);
        let Some(frame) = self.source.read_frame() else {
            self.failed_reads += 1;
            warn!("capture frame unavailable");
            self.emit(PipelineEvent::Error("could not read a frame from the camera".into()));
            self.transition(PipelineState::CameraActive);
            return CaptureOutcome::FrameUnavailable;
        };

        self.transition(PipelineState::Detecting);
        let Some(face) = self.locator.locate(&frame, self.config.min_face_size) else {
            self.transition(PipelineState::NoFaceFound);
            info!("no face found");
            let guidance = self.config.fallback_prompt.clone();
            self.emit(PipelineEvent::NoFace {
                result: AnalysisResult::no_face(),
                guidance: guidance.clone(),
            });
            self.transition(PipelineState::CameraActive);
            return CaptureOutcome::NoFace { guidance };
        };
        self.preview = Some(frame);

        self.transition(PipelineState::Packaging);
        let payload = match self.packager.package(&face) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "failed to package face");
                self.emit(PipelineEvent::Error(format!("failed to package face: {e}")));
                self.transition(PipelineState::CameraActive);
                return CaptureOutcome::PackagingFailed(e.to_string());
            }
        };

        let bounds = face.bounds();
        let image = ImageData::new(payload.media_type(), payload.to_base64());
        let analyzer = self.analyzer.clone();
        let prompt = self.config.analysis_prompt.clone();
        let limit = self.config.analysis_timeout;
        let tx = self.results_tx.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let result = match tokio::time::timeout(limit, analyzer.analyze(&image, &prompt)).await
            {
                Ok(outcome) => AnalysisResult::from_outcome(true, outcome),
                Err(_) => {
                    AnalysisResult::failed(true, format!("analysis timed out after {limit:?}"))
                }
            };
            let _ = tx.send(result).await;
        }));
        info!(
            ?bounds,
            bytes = payload.bytes().len(),
            captured_at = %face.pixels().captured_at(),
            "analysis dispatched"
        );
        self.transition(PipelineState::Dispatching);
        CaptureOutcome::Dispatched { bounds }
    }

    /// Collect a finished analysis without waiting.
    pub fn poll_completion(&mut self) -> Option<AnalysisResult> {
        let handle = self.in_flight.as_ref()?;
        let result = match self.results_rx.try_recv() {
            Ok(result) => result,
            Err(_) if handle.is_finished() => self
                .results_rx
                .try_recv()
                .unwrap_or_else(|_| AnalysisResult::failed(true, "analysis task ended without a result")),
            Err(_) => return None,
        };
        Some(self.finish(result))
    }

    /// Wait for the in-flight analysis, if any.
    pub async fn wait_for_completion(&mut self) -> Option<AnalysisResult> {
        let handle = self.in_flight.as_mut()?;
        if let Err(e) = handle.await {
            error!(error = %e, "analysis task failed");
        }
        let result = self
            .results_rx
            .try_recv()
            .unwrap_or_else(|_| AnalysisResult::failed(true, "analysis task ended without a result"));
        Some(self.finish(result))
    }

    fn finish(&mut self, result: AnalysisResult) -> AnalysisResult {
        self.in_flight = None;
        self.transition(PipelineState::Done);
        match result.error_message() {
            Some(msg) => warn!(%msg, "analysis finished with error"),
            None => info!(tokens = ?result.tokens_used(), "analysis finished"),
        }
        self.emit(PipelineEvent::Analysis(result.clone()));
        self.transition(PipelineState::CameraActive);
        result
    }

    /// Abort any analysis and release the camera. Final.
    pub fn stop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
            debug!("in-flight analysis aborted");
        }
        while self.results_rx.try_recv().is_ok() {}
        self.source.close();
        self.transition(PipelineState::Stopped);
    }
}

impl Drop for CapturePipeline {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}
