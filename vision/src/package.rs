//! Canonical-size JPEG packaging of face crops.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{Rgb, RgbImage};

use crate::error::VisionError;
use crate::face::{FaceRegion, FaceSize};

pub const JPEG_MEDIA_TYPE: &str = "image/jpeg";

/// Compressed image bytes plus their media type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedPayload {
    bytes: Vec<u8>,
    media_type: String,
    width: u32,
    height: u32,
}

impl EncodedPayload {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Pixel dimensions of the encoded image.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    /// `data:` URI suitable for embedding in a JSON request.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.to_base64())
    }
}

/// Resizes face crops to a fixed size and encodes them as JPEG.
#[derive(Clone, Copy, Debug)]
pub struct FacePackager {
    target: FaceSize,
    quality: u8,
}

impl FacePackager {
    /// `quality` is the JPEG quality, 1..=100.
    pub fn new(target: FaceSize, quality: u8) -> Self {
        Self {
            target,
            quality: quality.clamp(1, 100),
        }
    }

    pub fn target(&self) -> FaceSize {
        self.target
    }

    pub fn package(&self, region: &FaceRegion) -> Result<EncodedPayload, VisionError> {
        let FaceSize { width, height } = self.target;
        if width == 0 || height == 0 {
            return Err(VisionError::ZeroDimensions);
        }
        let resized = resize_area(&region.pixels().to_rgb(), width, height);

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, self.quality)
            .encode_image(&resized)
            .map_err(|e| VisionError::Encode(e.to_string()))?;
        Ok(EncodedPayload {
            bytes,
            media_type: JPEG_MEDIA_TYPE.to_string(),
            width,
            height,
        })
    }
}

/// Resize with area averaging whenever an axis shrinks.
///
/// Every destination pixel is the coverage-weighted mean of the source pixels
/// under its footprint. Pure upscales fall back to a triangle filter.
pub fn resize_area(src: &RgbImage, width: u32, height: u32) -> RgbImage {
    let (src_w, src_h) = src.dimensions();
    if (width, height) == (src_w, src_h) {
        return src.clone();
    }
    if width >= src_w && height >= src_h {
        return image::imageops::resize(src, width, height, FilterType::Triangle);
    }

    let cols = footprints(src_w, width);
    let rows = footprints(src_h, height);

    // Horizontal pass into a src_h x width float buffer.
    let mut horizontal = vec![[0f32; 3]; src_h as usize * width as usize];
    for y in 0..src_h {
        for (x, taps) in cols.iter().enumerate() {
            let acc = &mut horizontal[y as usize * width as usize + x];
            for &(sx, weight) in taps {
                let px = src.get_pixel(sx, y).0;
                for c in 0..3 {
                    acc[c] += px[c] as f32 * weight;
                }
            }
        }
    }

    RgbImage::from_fn(width, height, |x, y| {
        let mut acc = [0f32; 3];
        for &(sy, weight) in &rows[y as usize] {
            let px = horizontal[sy as usize * width as usize + x as usize];
            for c in 0..3 {
                acc[c] += px[c] * weight;
            }
        }
        Rgb(acc.map(|v| v.round().clamp(0.0, 255.0) as u8))
    })
}

/// Source indices and normalised weights covered by each destination index.
fn footprints(src_len: u32, dst_len: u32) -> Vec<Vec<(u32, f32)>> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|d| {
            let start = d as f64 * scale;
            let end = (start + scale).min(src_len as f64);
            let mut taps = Vec::new();
            let mut s = start.floor() as u32;
            while (s as f64) < end && s < src_len {
                let covered = end.min(s as f64 + 1.0) - start.max(s as f64);
                if covered > 0.0 {
                    taps.push((s, covered));
                }
                s += 1;
            }
            let total: f64 = taps.iter().map(|(_, w)| w).sum();
            taps.into_iter()
                .map(|(s, w)| (s, (w / total) as f32))
                .collect()
        })
        .collect()
}
