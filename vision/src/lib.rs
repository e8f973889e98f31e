//! Frame-level image processing for LuckyFace.
//!
//! The crate covers everything that happens to a captured [`Frame`] before it
//! leaves the process: local-contrast enhancement ([`ImageEnhancer`]), face
//! localisation ([`FaceLocator`] over a pluggable [`FaceDetector`]) and
//! packaging of the face crop into a transport-ready [`EncodedPayload`].
//!
//! ```
//! use vision::{FaceDetector, FaceLocator, FaceRect, FaceSize, Frame};
//!
//! struct Fixed;
//! impl FaceDetector for Fixed {
//!     fn detect(&self, _: &image::GrayImage, _: FaceSize) -> Vec<FaceRect> {
//!         vec![FaceRect::new(100, 100, 50, 50)]
//!     }
//! }
//!
//! let frame = Frame::from_rgb(image::RgbImage::new(640, 480)).unwrap();
//! let locator = FaceLocator::new(Box::new(Fixed)).enhancement(false);
//! let face = locator.locate(&frame, FaceSize::new(30, 30)).unwrap();
//! assert_eq!(face.bounds().x, 90);
//! assert_eq!(face.bounds().width, 70);
//! ```

pub mod detector;
pub mod enhance;
pub mod error;
pub mod face;
pub mod frame;
#[cfg(feature = "opencv")]
pub mod haar;
pub mod package;

pub use detector::RustfaceDetector;
pub use enhance::ImageEnhancer;
pub use error::VisionError;
pub use face::{
    FaceDetector, FaceLocator, FaceRect, FaceRegion, FaceSize, RegionBounds, pad_and_clamp,
    select_largest,
};
pub use frame::{ChannelOrder, Frame};
#[cfg(feature = "opencv")]
pub use haar::HaarCascadeDetector;
pub use package::{EncodedPayload, FacePackager, JPEG_MEDIA_TYPE};
