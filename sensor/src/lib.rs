//! Frame acquisition for LuckyFace.
//!
//! A [`FrameSource`] wraps any [`VideoDevice`] and turns device failures into
//! the simple open/read/close contract the capture pipeline relies on.

#[cfg(feature = "opencv")]
pub mod camera;
pub mod device;
pub mod error;
pub mod sequence;
pub mod source;

#[cfg(feature = "opencv")]
pub use camera::OpenCvCamera;
pub use device::VideoDevice;
pub use error::SensorError;
pub use sequence::ImageSequenceDevice;
pub use source::FrameSource;
