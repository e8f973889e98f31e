use async_trait::async_trait;
use image::{GrayImage, Rgb, RgbImage};
use llm::{AnalysisOutcome, FailureKind, ImageData, VisionAnalyzer};
use luckyface::{
    CaptureOutcome, CapturePipeline, Command, FALLBACK_PROMPT, PipelineConfig, PipelineEvent,
    PipelineFault, PipelineState, camera_check, run,
};
use sensor::{FrameSource, SensorError, VideoDevice};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use vision::{FaceDetector, FaceLocator, FaceRect, FaceSize, Frame};

#[derive(Clone)]
struct Camera {
    available: bool,
    fail_reads: Arc<AtomicBool>,
    reads: Arc<AtomicUsize>,
    limit: Option<usize>,
}

impl Camera {
    fn working() -> Self {
        Self {
            available: true,
            fail_reads: Arc::new(AtomicBool::new(false)),
            reads: Arc::new(AtomicUsize::new(0)),
            limit: None,
        }
    }

    fn missing() -> Self {
        Self {
            available: false,
            ..Self::working()
        }
    }
}

impl VideoDevice for Camera {
    fn open(&mut self, index: u32) -> Result<(), SensorError> {
        if self.available {
            Ok(())
        } else {
            Err(SensorError::Unavailable { index })
        }
    }

    fn read(&mut self) -> Result<Option<Frame>, SensorError> {
        let n = self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SensorError::Device("unplugged".into()));
        }
        if self.limit.is_some_and(|limit| n >= limit) {
            return Ok(None);
        }
        let img = RgbImage::from_pixel(640, 480, Rgb([120, 110, 100]));
        Ok(Some(Frame::from_rgb(img).unwrap()))
    }

    fn release(&mut self) {}
}

struct FixedFace(Option<FaceRect>);

impl FaceDetector for FixedFace {
    fn detect(&self, _: &GrayImage, _: FaceSize) -> Vec<FaceRect> {
        self.0.into_iter().collect()
    }
}

struct Replying {
    outcome: AnalysisOutcome,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl VisionAnalyzer for Replying {
    async fn analyze(&self, image: &ImageData, prompt: &str) -> AnalysisOutcome {
        assert_eq!(image.mime, "image/jpeg");
        assert!(!prompt.is_empty());
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

struct Hanging;

#[async_trait]
impl VisionAnalyzer for Hanging {
    async fn analyze(&self, _: &ImageData, _: &str) -> AnalysisOutcome {
        futures::future::pending::<AnalysisOutcome>().await
    }
}

const FACE: FaceRect = FaceRect::new(100, 100, 50, 50);

fn fortune() -> (Arc<Replying>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let analyzer = Arc::new(Replying {
        outcome: AnalysisOutcome::Success {
            text: "Red envelope: 88. Fortune smiles on you.".into(),
            model: "vision-test".into(),
            tokens: Some(42),
        },
        calls: calls.clone(),
    });
    (analyzer, calls)
}

fn config() -> PipelineConfig {
    PipelineConfig {
        enhancement_enabled: false,
        ..PipelineConfig::default()
    }
}

fn pipeline(
    camera: Camera,
    face: Option<FaceRect>,
    analyzer: Arc<dyn VisionAnalyzer>,
    config: PipelineConfig,
) -> CapturePipeline {
    CapturePipeline::new(
        config,
        FrameSource::new(Box::new(camera)),
        FaceLocator::new(Box::new(FixedFace(face))),
        analyzer,
    )
    .unwrap()
}

#[tokio::test]
async fn unavailable_camera_enters_error_state() {
    let (analyzer, calls) = fortune();
    let mut p = pipeline(Camera::missing(), Some(FACE), analyzer, config());
    let mut events = p.subscribe();

    assert_eq!(
        p.start(),
        &PipelineState::Error(PipelineFault::CameraUnavailable)
    );
    assert!(matches!(events.try_recv(), Ok(PipelineEvent::Error(_))));
    assert_eq!(p.capture_and_analyze(), CaptureOutcome::NotActive);
    assert!(p.tick_preview().is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn capture_before_start_is_not_active() {
    let (analyzer, _) = fortune();
    let camera = Camera::working();
    let reads = camera.reads.clone();
    let mut p = pipeline(camera, Some(FACE), analyzer, config());
    assert_eq!(p.trigger_analysis(), CaptureOutcome::NotActive);
    assert_eq!(reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn no_face_shows_guidance_without_calling_analyzer() {
    let (analyzer, calls) = fortune();
    let mut p = pipeline(Camera::working(), None, analyzer, PipelineConfig::default());
    let mut events = p.subscribe();
    p.start();

    let outcome = p.capture_and_analyze();
    assert_eq!(
        outcome,
        CaptureOutcome::NoFace {
            guidance: FALLBACK_PROMPT.to_string()
        }
    );
    assert_eq!(p.state(), &PipelineState::CameraActive);
    assert!(!p.in_flight());
    match events.try_recv() {
        Ok(PipelineEvent::NoFace { result, guidance }) => {
            assert!(!result.face_detected());
            assert!(result.analysis().is_none());
            assert!(result.error_message().is_none());
            assert_eq!(guidance, FALLBACK_PROMPT);
        }
        other => panic!("unexpected event {other:?}"),
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn successful_cycle_returns_to_camera_active() {
    let (analyzer, calls) = fortune();
    let mut p = pipeline(Camera::working(), Some(FACE), analyzer, config());
    let mut events = p.subscribe();
    p.start();

    let CaptureOutcome::Dispatched { bounds } = p.capture_and_analyze() else {
        panic!("expected dispatch");
    };
    assert_eq!((bounds.x, bounds.y, bounds.width, bounds.height), (90, 90, 70, 70));
    assert_eq!(p.state(), &PipelineState::Dispatching);
    assert!(p.in_flight());

    let result = p.wait_for_completion().await.unwrap();
    assert!(result.face_detected());
    assert_eq!(
        result.analysis().unwrap().text,
        "Red envelope: 88. Fortune smiles on you."
    );
    assert_eq!(result.tokens_used(), Some(42));
    assert!(result.error_message().is_none());
    assert_eq!(p.state(), &PipelineState::CameraActive);
    assert!(!p.in_flight());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(matches!(events.try_recv(), Ok(PipelineEvent::Analysis(_))));
}

#[tokio::test]
async fn preview_ticks_drain_completed_analysis() {
    let (analyzer, _) = fortune();
    let mut p = pipeline(Camera::working(), Some(FACE), analyzer, config());
    let mut events = p.subscribe();
    p.start();
    assert!(matches!(p.capture_and_analyze(), CaptureOutcome::Dispatched { .. }));

    for _ in 0..200 {
        if !p.in_flight() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(p.tick_preview().is_some());
    }
    assert!(!p.in_flight());
    assert!(p.preview_frame().is_some());
    match events.try_recv() {
        Ok(PipelineEvent::Analysis(result)) => assert!(result.analysis().is_some()),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn hanging_analysis_times_out_and_pipeline_recovers() {
    let cfg = PipelineConfig {
        analysis_timeout: Duration::from_millis(50),
        ..config()
    };
    let mut p = pipeline(Camera::working(), Some(FACE), Arc::new(Hanging), cfg);
    p.start();

    assert!(matches!(p.capture_and_analyze(), CaptureOutcome::Dispatched { .. }));
    assert_eq!(p.capture_and_analyze(), CaptureOutcome::Busy);

    let result = tokio::time::timeout(Duration::from_secs(5), p.wait_for_completion())
        .await
        .expect("pipeline stuck")
        .unwrap();
    assert!(result.face_detected());
    assert!(result.analysis().is_none());
    assert!(result.error_message().unwrap().contains("timed out"));
    assert_eq!(p.state(), &PipelineState::CameraActive);

    assert!(matches!(p.capture_and_analyze(), CaptureOutcome::Dispatched { .. }));
    p.stop();
}

#[tokio::test]
async fn remote_failure_is_reported_with_its_kind() {
    let calls = Arc::new(AtomicUsize::new(0));
    let analyzer = Arc::new(Replying {
        outcome: AnalysisOutcome::failure(FailureKind::RateLimited, "slow down"),
        calls,
    });
    let mut p = pipeline(Camera::working(), Some(FACE), analyzer, config());
    p.start();
    p.capture_and_analyze();
    let result = p.wait_for_completion().await.unwrap();
    assert!(result.face_detected());
    assert_eq!(result.error_message(), Some("rate limited: slow down"));
}

#[tokio::test]
async fn frame_read_failure_keeps_camera_active() {
    let (analyzer, calls) = fortune();
    let camera = Camera::working();
    let fail = camera.fail_reads.clone();
    let mut p = pipeline(camera, Some(FACE), analyzer, config());
    let mut events = p.subscribe();
    p.start();
    fail.store(true, Ordering::SeqCst);

    assert_eq!(p.capture_and_analyze(), CaptureOutcome::FrameUnavailable);
    assert_eq!(p.state(), &PipelineState::CameraActive);
    assert!(matches!(events.try_recv(), Ok(PipelineEvent::Error(_))));
    assert!(p.tick_preview().is_none());
    assert_eq!(p.failed_reads(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    fail.store(false, Ordering::SeqCst);
    assert!(matches!(p.capture_and_analyze(), CaptureOutcome::Dispatched { .. }));
}

#[tokio::test]
async fn stop_aborts_analysis_and_is_final() {
    let mut p = pipeline(Camera::working(), Some(FACE), Arc::new(Hanging), config());
    p.start();
    assert!(matches!(p.capture_and_analyze(), CaptureOutcome::Dispatched { .. }));

    p.stop();
    assert_eq!(p.state(), &PipelineState::Stopped);
    assert!(!p.in_flight());
    assert!(p.poll_completion().is_none());
    assert_eq!(p.start(), &PipelineState::Stopped);
    assert_eq!(p.capture_and_analyze(), CaptureOutcome::NotActive);
}

#[tokio::test]
async fn run_processes_commands_until_stop() {
    let (analyzer, calls) = fortune();
    let cfg = PipelineConfig {
        preview_interval: Duration::from_millis(5),
        ..config()
    };
    let p = pipeline(Camera::working(), Some(FACE), analyzer, cfg);
    let mut events = p.subscribe();
    let (tx, rx) = mpsc::channel(4);
    let driver = tokio::spawn(run(p, rx));

    tx.send(Command::Capture).await.unwrap();
    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, PipelineEvent::Analysis(_)));

    tx.send(Command::Stop).await.unwrap();
    let p = driver.await.unwrap();
    assert_eq!(p.state(), &PipelineState::Stopped);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn run_stops_when_commands_close() {
    let (analyzer, _) = fortune();
    let p = pipeline(Camera::working(), Some(FACE), analyzer, config());
    let (tx, rx) = mpsc::channel(1);
    drop(tx);
    let p = run(p, rx).await;
    assert_eq!(p.state(), &PipelineState::Stopped);
}

#[test]
fn camera_check_counts_faces_until_stream_ends() {
    let camera = Camera {
        limit: Some(3),
        ..Camera::working()
    };
    let mut source = FrameSource::new(Box::new(camera));
    let locator = FaceLocator::new(Box::new(FixedFace(Some(FACE)))).enhancement(false);
    assert_eq!(
        camera_check(&mut source, &locator, 0, FaceSize::new(30, 30), 10),
        Some(3)
    );
    assert!(!source.is_open());

    let mut missing = FrameSource::new(Box::new(Camera::missing()));
    assert_eq!(
        camera_check(&mut missing, &locator, 0, FaceSize::new(30, 30), 10),
        None
    );
}

#[test]
fn invalid_config_is_rejected() {
    let (analyzer, _) = fortune();
    let cfg = PipelineConfig {
        analysis_prompt: String::new(),
        ..config()
    };
    assert!(CapturePipeline::new(
        cfg,
        FrameSource::new(Box::new(Camera::working())),
        FaceLocator::new(Box::new(FixedFace(None))),
        analyzer,
    )
    .is_err());
}
