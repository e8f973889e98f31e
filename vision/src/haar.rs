//! OpenCV Haar cascade detector, available with the `opencv` feature.

use std::sync::Mutex;

use image::GrayImage;
use opencv::{
    core::{Mat, Rect, Size, Vector},
    objdetect::CascadeClassifier,
    prelude::*,
};
use tracing::warn;

use crate::error::VisionError;
use crate::face::{FaceDetector, FaceRect, FaceSize};

const SCALE_FACTOR: f64 = 1.1;
const MIN_NEIGHBORS: i32 = 5;

/// Viola-Jones detector loaded from a cascade XML such as
/// `haarcascade_frontalface_default.xml`.
pub struct HaarCascadeDetector {
    classifier: Mutex<CascadeClassifier>,
}

impl HaarCascadeDetector {
    pub fn from_path(path: &str) -> Result<Self, VisionError> {
        let classifier =
            CascadeClassifier::new(path).map_err(|e| VisionError::Model(e.to_string()))?;
        if classifier.empty().map_err(|e| VisionError::Model(e.to_string()))? {
            return Err(VisionError::Model(format!("{path}: cascade is empty")));
        }
        Ok(Self {
            classifier: Mutex::new(classifier),
        })
    }

    fn run(&self, gray: &GrayImage, min_size: FaceSize) -> opencv::Result<Vec<FaceRect>> {
        let (w, h) = gray.dimensions();
        let mat = Mat::new_rows_cols_with_data(h as i32, w as i32, gray.as_raw())?;
        let mut faces = Vector::<Rect>::new();
        let mut classifier = match self.classifier.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        classifier.detect_multi_scale(
            &*mat,
            &mut faces,
            SCALE_FACTOR,
            MIN_NEIGHBORS,
            0,
            Size::new(min_size.width as i32, min_size.height as i32),
            Size::new(0, 0),
        )?;
        Ok(faces
            .iter()
            .map(|r| FaceRect::new(r.x, r.y, r.width.max(0) as u32, r.height.max(0) as u32))
            .collect())
    }
}

impl FaceDetector for HaarCascadeDetector {
    fn detect(&self, gray: &GrayImage, min_size: FaceSize) -> Vec<FaceRect> {
        self.run(gray, min_size).unwrap_or_else(|e| {
            warn!(?e, "cascade detection failed");
            Vec::new()
        })
    }
}
