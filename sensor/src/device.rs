use vision::Frame;

use crate::SensorError;

/// Low-level capture device.
///
/// Implementations may return errors freely; [`FrameSource`](crate::FrameSource)
/// absorbs them.
pub trait VideoDevice: Send {
    /// Acquire the device with the given index.
    fn open(&mut self, index: u32) -> Result<(), SensorError>;
    /// Grab the next frame. `Ok(None)` means end of stream.
    fn read(&mut self) -> Result<Option<Frame>, SensorError>;
    /// Release the device. Must tolerate repeated calls.
    fn release(&mut self);
}
