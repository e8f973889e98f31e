use anyhow::{Context, bail};
use clap::Parser;
use dotenvy::dotenv;
use llm::config::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use llm::{AnalysisClient, ApiKey, ServiceConfig};
use luckyface::{
    ANALYSIS_PROMPT, CapturePipeline, Command, FALLBACK_PROMPT, PipelineConfig, PipelineEvent,
    camera_check, init_logging, run,
};
use sensor::{FrameSource, ImageSequenceDevice, VideoDevice};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tracing::info;
use vision::{FaceDetector, FaceLocator, FaceSize, RustfaceDetector};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Camera device index
    #[arg(long, env = "LUCKYFACE_CAMERA", default_value_t = 0)]
    camera: u32,
    /// Smallest face to accept, as WIDTHxHEIGHT
    #[arg(long, env = "LUCKYFACE_MIN_FACE", default_value = "30x30")]
    min_face: FaceSize,
    /// Skip contrast enhancement before detection
    #[arg(long)]
    no_enhance: bool,
    #[arg(long, env = "LUCKYFACE_DEBUG")]
    debug: bool,
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,
    #[arg(long, env = "LUCKYFACE_MODEL", default_value = DEFAULT_MODEL)]
    model: String,
    /// Seconds to wait for an analysis
    #[arg(long, env = "LUCKYFACE_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,
    #[arg(long, default_value = ANALYSIS_PROMPT, hide_default_value = true)]
    analysis_prompt: String,
    #[arg(long, default_value = FALLBACK_PROMPT, hide_default_value = true)]
    fallback_prompt: String,
    /// Play image files matching this glob instead of a camera
    #[arg(long)]
    frames: Option<String>,
    /// SeetaFace model for the rustface detector
    #[arg(long, env = "LUCKYFACE_FACE_MODEL")]
    face_model: Option<PathBuf>,
    /// Haar cascade XML; replaces the rustface detector
    #[cfg(feature = "opencv")]
    #[arg(long)]
    cascade: Option<String>,
    /// Run detection on live frames and exit
    #[arg(long)]
    camera_test: bool,
    /// Frames to inspect in --camera-test mode
    #[arg(long, default_value_t = 100)]
    test_frames: usize,
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        let service = ServiceConfig::new(ApiKey::new(self.api_key.clone().unwrap_or_default()))
            .base_url(self.base_url.clone())
            .model(self.model.clone());
        PipelineConfig {
            camera_index: self.camera,
            min_face_size: self.min_face,
            enhancement_enabled: !self.no_enhance,
            analysis_prompt: self.analysis_prompt.clone(),
            fallback_prompt: self.fallback_prompt.clone(),
            debug: self.debug,
            analysis_timeout: Duration::from_secs(self.timeout_secs),
            service,
            ..PipelineConfig::default()
        }
    }

    fn device(&self) -> anyhow::Result<Box<dyn VideoDevice>> {
        if let Some(pattern) = &self.frames {
            return Ok(Box::new(ImageSequenceDevice::new(pattern.clone()).looping(true)));
        }
        #[cfg(feature = "opencv")]
        return Ok(Box::new(sensor::OpenCvCamera::new()));
        #[cfg(not(feature = "opencv"))]
        bail!("no camera backend in this build; pass --frames or enable the opencv feature");
    }

    fn detector(&self) -> anyhow::Result<Box<dyn FaceDetector>> {
        #[cfg(feature = "opencv")]
        if let Some(cascade) = &self.cascade {
            return Ok(Box::new(vision::HaarCascadeDetector::from_path(cascade)?));
        }
        let Some(path) = &self.face_model else {
            bail!("a face model is required; pass --face-model");
        };
        let detector = RustfaceDetector::from_path(path)
            .with_context(|| format!("loading face model {}", path.display()))?;
        Ok(Box::new(detector))
    }
}

async fn read_commands(tx: mpsc::Sender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let cmd = match line.trim() {
            "" | "c" => Command::Capture,
            "q" => Command::Stop,
            other => {
                println!("unknown command {other:?}; press enter to capture, q to quit");
                continue;
            }
        };
        if tx.send(cmd).await.is_err() || cmd == Command::Stop {
            break;
        }
    }
}

async fn print_events(mut events: broadcast::Receiver<PipelineEvent>) {
    loop {
        match events.recv().await {
            Ok(PipelineEvent::Analysis(result)) => {
                if let Some(analysis) = result.analysis() {
                    println!("\n{}\n", analysis.text);
                } else if let Some(msg) = result.error_message() {
                    println!("\nAnalysis failed: {msg}\n");
                }
            }
            Ok(PipelineEvent::NoFace { guidance, .. }) => println!("\n{guidance}\n"),
            Ok(PipelineEvent::Error(msg)) => eprintln!("error: {msg}"),
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    let config = cli.pipeline_config();
    init_logging(config.debug);
    config.validate()?;
    let mut source = FrameSource::new(cli.device()?);
    let locator = FaceLocator::new(cli.detector()?).enhancement(config.enhancement_enabled);

    if cli.camera_test {
        let Some(hits) = camera_check(
            &mut source,
            &locator,
            config.camera_index,
            config.min_face_size,
            cli.test_frames,
        ) else {
            bail!("camera {} is unavailable", config.camera_index);
        };
        info!(hits, "camera test finished");
        return Ok(());
    }

    if config.service.api_key.is_empty() {
        bail!("OPENAI_API_KEY is not set");
    }
    let client = AnalysisClient::new(config.service.clone())?.timeout(config.analysis_timeout);
    let pipeline = CapturePipeline::new(config, source, locator, Arc::new(client))?;

    tokio::spawn(print_events(pipeline.subscribe()));
    let (tx, rx) = mpsc::channel(8);
    tokio::spawn(read_commands(tx));
    println!("Press enter to capture, q to quit.");

    let pipeline = run(pipeline, rx).await;
    info!(state = %pipeline.state(), "luckyface stopped");
    Ok(())
}
