//! Webcam capture through OpenCV `videoio`.

use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture},
};
use tracing::debug;
use vision::{ChannelOrder, Frame};

use crate::{SensorError, VideoDevice};

fn device_err(e: opencv::Error) -> SensorError {
    SensorError::Device(e.to_string())
}

/// Camera addressed by its system index. Frames are produced in BGR order.
#[derive(Default)]
pub struct OpenCvCamera {
    capture: Option<VideoCapture>,
    scratch: Mat,
}

impl OpenCvCamera {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VideoDevice for OpenCvCamera {
    fn open(&mut self, index: u32) -> Result<(), SensorError> {
        self.release();
        let capture =
            VideoCapture::new(index as i32, videoio::CAP_ANY).map_err(device_err)?;
        if !capture.is_opened().map_err(device_err)? {
            return Err(SensorError::Unavailable { index });
        }
        debug!(index, "camera opened");
        self.capture = Some(capture);
        Ok(())
    }

    fn read(&mut self) -> Result<Option<Frame>, SensorError> {
        let capture = self
            .capture
            .as_mut()
            .ok_or_else(|| SensorError::Device("camera is not open".into()))?;
        if !capture.read(&mut self.scratch).map_err(device_err)? {
            return Err(SensorError::Device("camera returned no frame".into()));
        }
        let size = self.scratch.size().map_err(device_err)?;
        if size.width <= 0 || size.height <= 0 {
            return Err(SensorError::Device("camera returned an empty frame".into()));
        }
        if self.scratch.channels() != 3 {
            return Err(SensorError::Device(format!(
                "expected 3 channels, got {}",
                self.scratch.channels()
            )));
        }
        let data = if self.scratch.is_continuous() {
            self.scratch.data_bytes().map_err(device_err)?.to_vec()
        } else {
            self.scratch
                .try_clone()
                .map_err(device_err)?
                .data_bytes()
                .map_err(device_err)?
                .to_vec()
        };
        let frame = Frame::new(size.width as u32, size.height as u32, ChannelOrder::Bgr, data)
            .map_err(|e| SensorError::Device(e.to_string()))?;
        Ok(Some(frame))
    }

    fn release(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            let _ = capture.release();
            debug!("camera released");
        }
    }
}
