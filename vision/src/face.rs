//! Face localisation: pick the most prominent detection, pad it and crop it
//! out of the source frame.

use std::fmt;
use std::str::FromStr;

use image::GrayImage;
use tracing::debug;

use crate::enhance::ImageEnhancer;
use crate::error::VisionError;
use crate::frame::Frame;

/// Fraction of the face width added on every side before cropping.
const PADDING_RATIO: f64 = 0.2;

/// Width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceSize {
    pub width: u32,
    pub height: u32,
}

impl FaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for FaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for FaceSize {
    type Err = VisionError;

    /// Parse `WIDTHxHEIGHT`, e.g. `30x30`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VisionError::InvalidSize(s.to_string());
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width = w.trim().parse().map_err(|_| invalid())?;
        let height = h.trim().parse().map_err(|_| invalid())?;
        Ok(Self { width, height })
    }
}

/// Candidate rectangle reported by a [`FaceDetector`], in the coordinates of
/// the image it was given. Detectors may report boxes that poke out of the
/// image, hence the signed origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl FaceRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Rectangle fully inside a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionBounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Padded, bounds-clamped crop of a frame holding one face.
#[derive(Clone, Debug)]
pub struct FaceRegion {
    bounds: RegionBounds,
    pixels: Frame,
}

impl FaceRegion {
    /// Location of the crop in source-frame coordinates.
    pub fn bounds(&self) -> RegionBounds {
        self.bounds
    }

    pub fn pixels(&self) -> &Frame {
        &self.pixels
    }
}

/// Pluggable face detection backend.
///
/// Implementations return every candidate they find, in their natural output
/// order. Selection and padding are left to [`FaceLocator`].
pub trait FaceDetector: Send + Sync {
    /// Detect faces in a grayscale image, ignoring anything smaller than
    /// `min_size`.
    fn detect(&self, gray: &GrayImage, min_size: FaceSize) -> Vec<FaceRect>;
}

/// Finds the most prominent face in a frame.
pub struct FaceLocator {
    detector: Box<dyn FaceDetector>,
    enhancer: Option<ImageEnhancer>,
}

impl FaceLocator {
    /// Create a locator with contrast enhancement enabled.
    pub fn new(detector: Box<dyn FaceDetector>) -> Self {
        Self {
            detector,
            enhancer: Some(ImageEnhancer::default()),
        }
    }

    /// Toggle the enhancement pass that runs before detection.
    pub fn enhancement(mut self, enabled: bool) -> Self {
        self.enhancer = enabled.then(ImageEnhancer::default);
        self
    }

    /// Locate the largest face in `frame`.
    ///
    /// Returns `None` when nothing at least `min_size` is found. Absence of a
    /// face is an ordinary outcome, not an error.
    pub fn locate(&self, frame: &Frame, min_size: FaceSize) -> Option<FaceRegion> {
        let gray = match &self.enhancer {
            Some(enhancer) => enhancer.enhance(frame).to_luma(),
            None => frame.to_luma(),
        };
        let candidates: Vec<FaceRect> = self
            .detector
            .detect(&gray, min_size)
            .into_iter()
            .filter(|r| r.width >= min_size.width && r.height >= min_size.height)
            .collect();
        debug!(count = candidates.len(), "face candidates");

        let chosen = select_largest(&candidates)?;
        let bounds = pad_and_clamp(chosen, frame.width(), frame.height())?;
        debug!(?chosen, ?bounds, "face located");
        Some(FaceRegion {
            bounds,
            pixels: frame.crop(bounds),
        })
    }
}

/// Largest-area rectangle; on ties the earliest one wins.
pub fn select_largest(candidates: &[FaceRect]) -> Option<FaceRect> {
    candidates.iter().copied().fold(None, |best, r| match best {
        Some(b) if b.area() >= r.area() => Some(b),
        _ => Some(r),
    })
}

/// Grow `rect` by 20% of its width on every side, then intersect with a
/// `frame_width` x `frame_height` frame.
///
/// Returns `None` if nothing of the rectangle lies inside the frame.
pub fn pad_and_clamp(rect: FaceRect, frame_width: u32, frame_height: u32) -> Option<RegionBounds> {
    let pad = (rect.width as f64 * PADDING_RATIO) as i64;
    let x0 = (rect.x as i64 - pad).max(0);
    let y0 = (rect.y as i64 - pad).max(0);
    let x1 = (rect.x as i64 + rect.width as i64 + pad).min(frame_width as i64);
    let y1 = (rect.y as i64 + rect.height as i64 + pad).min(frame_height as i64);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(RegionBounds {
        x: x0 as u32,
        y: y0 as u32,
        width: (x1 - x0) as u32,
        height: (y1 - y0) as u32,
    })
}
