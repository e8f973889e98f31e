//! Captured video frames.

use chrono::{DateTime, Utc};
use image::{GrayImage, RgbImage};

use crate::error::VisionError;
use crate::face::RegionBounds;

/// Order of the three interleaved channels in a [`Frame`] buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    /// Native order of most camera drivers.
    Bgr,
}

/// Dense 3-channel pixel buffer produced by a single capture.
///
/// A frame never changes after construction; every transform returns a new
/// one.
#[derive(Clone, Debug)]
pub struct Frame {
    width: u32,
    height: u32,
    order: ChannelOrder,
    data: Vec<u8>,
    captured_at: DateTime<Utc>,
}

impl Frame {
    /// Wrap a raw interleaved buffer of `width * height * 3` bytes.
    pub fn new(
        width: u32,
        height: u32,
        order: ChannelOrder,
        data: Vec<u8>,
    ) -> Result<Self, VisionError> {
        if width == 0 || height == 0 {
            return Err(VisionError::ZeroDimensions);
        }
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(VisionError::InvalidFrame {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            order,
            data,
            captured_at: Utc::now(),
        })
    }

    /// Build a frame from an RGB image.
    pub fn from_rgb(image: RgbImage) -> Result<Self, VisionError> {
        let (width, height) = image.dimensions();
        Self::new(width, height, ChannelOrder::Rgb, image.into_raw())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    /// Raw interleaved bytes in [`Frame::order`].
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Pixel at `(x, y)` as `[r, g, b]`, whatever the storage order.
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let i = self.offset(x, y);
        let px = [self.data[i], self.data[i + 1], self.data[i + 2]];
        match self.order {
            ChannelOrder::Rgb => px,
            ChannelOrder::Bgr => [px[2], px[1], px[0]],
        }
    }

    /// Copy the frame into an RGB image, swapping channels if needed.
    pub fn to_rgb(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| image::Rgb(self.rgb_at(x, y)))
    }

    /// Single-channel luminance view used by detectors.
    pub fn to_luma(&self) -> GrayImage {
        image::imageops::grayscale(&self.to_rgb())
    }

    /// Same geometry, order and timestamp with a new pixel buffer.
    pub(crate) fn with_data(&self, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), self.data.len());
        Self {
            data,
            ..self.clone_meta()
        }
    }

    /// Copy out the sub-rectangle `bounds`, which must lie inside the frame.
    pub(crate) fn crop(&self, bounds: RegionBounds) -> Self {
        let row_len = bounds.width as usize * 3;
        let mut data = Vec::with_capacity(row_len * bounds.height as usize);
        for y in bounds.y..bounds.y + bounds.height {
            let start = self.offset(bounds.x, y);
            data.extend_from_slice(&self.data[start..start + row_len]);
        }
        Self {
            width: bounds.width,
            height: bounds.height,
            data,
            ..self.clone_meta()
        }
    }

    fn clone_meta(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            order: self.order,
            data: Vec::new(),
            captured_at: self.captured_at,
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 3
    }
}
