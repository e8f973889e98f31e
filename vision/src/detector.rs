use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use image::GrayImage;
use rustface::{ImageData, Model};

use crate::error::VisionError;
use crate::face::{FaceDetector, FaceRect, FaceSize};

/// rustface refuses minimum sizes below this.
const RUSTFACE_MIN_FACE: u32 = 20;
/// Equivalent of a 1.1 scale step between pyramid levels.
const PYRAMID_SCALE: f32 = 1.0 / 1.1;
const SCORE_THRESHOLD: f64 = 2.0;
const WINDOW_STEP: u32 = 4;

/// Face detector backed by the `rustface` crate (SeetaFace cascade).
///
/// The model is read once; each call builds a fresh detector from a clone of
/// it, so the type can be shared across threads.
pub struct RustfaceDetector {
    model: Model,
}

impl RustfaceDetector {
    /// Load a SeetaFace model such as `seeta_fd_frontal_v1.0.bin`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, VisionError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| VisionError::Model(format!("{}: {e}", path.display())))?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, VisionError> {
        let model = rustface::read_model(reader).map_err(|e| VisionError::Model(e.to_string()))?;
        Ok(Self { model })
    }
}

impl FaceDetector for RustfaceDetector {
    fn detect(&self, gray: &GrayImage, min_size: FaceSize) -> Vec<FaceRect> {
        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(min_size.width.min(min_size.height).max(RUSTFACE_MIN_FACE));
        detector.set_score_thresh(SCORE_THRESHOLD);
        detector.set_pyramid_scale_factor(PYRAMID_SCALE);
        detector.set_slide_window_step(WINDOW_STEP, WINDOW_STEP);

        let (w, h) = gray.dimensions();
        detector
            .detect(&ImageData::new(gray.as_raw(), w, h))
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceRect::new(bbox.x(), bbox.y(), bbox.width(), bbox.height())
            })
            .collect()
    }
}
