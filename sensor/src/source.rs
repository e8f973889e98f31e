use tracing::{debug, warn};
use vision::Frame;

use crate::VideoDevice;

/// Open/read/close wrapper around a [`VideoDevice`].
///
/// No method returns an error or panics; device failures are logged and
/// surface as `false` or `None`.
pub struct FrameSource {
    device: Box<dyn VideoDevice>,
    open: bool,
}

impl FrameSource {
    pub fn new(device: Box<dyn VideoDevice>) -> Self {
        Self {
            device,
            open: false,
        }
    }

    /// Acquire the device. Reopening an open source releases it first.
    pub fn open(&mut self, index: u32) -> bool {
        if self.open {
            self.close();
        }
        match self.device.open(index) {
            Ok(()) => {
                debug!(index, "frame source opened");
                self.open = true;
            }
            Err(e) => {
                warn!(index, error = %e, "failed to open frame source");
                self.device.release();
                self.open = false;
            }
        }
        self.open
    }

    /// Next frame, or `None` when closed, exhausted or failing.
    pub fn read_frame(&mut self) -> Option<Frame> {
        if !self.open {
            return None;
        }
        match self.device.read() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "frame read failed");
                None
            }
        }
    }

    pub fn close(&mut self) {
        if self.open {
            self.device.release();
            self.open = false;
            debug!("frame source closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.close();
    }
}
