use sensor::FrameSource;
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};
use vision::{FaceLocator, FaceSize};

use crate::pipeline::{CapturePipeline, CaptureOutcome, PipelineState};

/// Requests from the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Capture,
    Stop,
}

/// Drive `pipeline` until [`Command::Stop`] arrives or the sender goes away.
///
/// Preview frames are read on every `preview_interval` tick, which is also
/// where finished analyses are picked up. The stopped pipeline is handed back.
pub async fn run(
    mut pipeline: CapturePipeline,
    mut commands: mpsc::Receiver<Command>,
) -> CapturePipeline {
    pipeline.start();
    let mut ticker = time::interval(pipeline.config().preview_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                pipeline.tick_preview();
            }
            cmd = commands.recv() => match cmd {
                Some(Command::Capture) => {
                    if matches!(pipeline.state(), PipelineState::Error(_)) {
                        pipeline.start();
                    }
                    match pipeline.capture_and_analyze() {
                        CaptureOutcome::Dispatched { bounds } => debug!(?bounds, "capture dispatched"),
                        other => info!(outcome = ?other, "capture finished"),
                    }
                }
                Some(Command::Stop) | None => break,
            }
        }
    }

    pipeline.stop();
    pipeline
}

/// Open the device and run face detection on up to `limit` frames.
///
/// Returns how many frames contained a face. Stops early when a read fails.
pub fn camera_check(
    source: &mut FrameSource,
    locator: &FaceLocator,
    index: u32,
    min_size: FaceSize,
    limit: usize,
) -> Option<usize> {
    if !source.open(index) {
        return None;
    }
    let mut hits = 0;
    for n in 0..limit {
        let Some(frame) = source.read_frame() else {
            warn!(frame = n, "frame read failed, ending camera check");
            break;
        };
        match locator.locate(&frame, min_size) {
            Some(face) => {
                hits += 1;
                info!(frame = n, bounds = ?face.bounds(), "face detected");
            }
            None => debug!(frame = n, "no face"),
        }
    }
    source.close();
    Some(hits)
}
