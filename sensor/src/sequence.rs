use glob::glob;
use std::path::PathBuf;
use tracing::debug;
use vision::Frame;

use crate::{SensorError, VideoDevice};

/// Plays image files matching a glob pattern as successive frames.
///
/// Useful as a stand-in webcam. Files are visited in lexical path order.
pub struct ImageSequenceDevice {
    pattern: String,
    paths: Vec<PathBuf>,
    index: usize,
    looping: bool,
}

impl ImageSequenceDevice {
    /// Create a device that will read files matching `pattern` once opened.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            paths: Vec::new(),
            index: 0,
            looping: false,
        }
    }

    /// Wrap around to the first file after the last one.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Number of files found by the last `open`.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl VideoDevice for ImageSequenceDevice {
    fn open(&mut self, _index: u32) -> Result<(), SensorError> {
        let mut paths: Vec<PathBuf> = glob(&self.pattern)
            .map_err(|e| SensorError::Pattern(e.msg.to_string()))?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect();
        if paths.is_empty() {
            return Err(SensorError::NoMatches(self.pattern.clone()));
        }
        paths.sort();
        debug!(pattern = %self.pattern, count = paths.len(), "image sequence opened");
        self.paths = paths;
        self.index = 0;
        Ok(())
    }

    fn read(&mut self) -> Result<Option<Frame>, SensorError> {
        if self.paths.is_empty() {
            return Err(SensorError::Device("image sequence is not open".into()));
        }
        if self.index >= self.paths.len() {
            if !self.looping {
                return Ok(None);
            }
            self.index = 0;
        }
        let path = &self.paths[self.index];
        self.index += 1;
        let decode_err = |reason: String| SensorError::Decode {
            path: path.display().to_string(),
            reason,
        };
        let image = image::open(path).map_err(|e| decode_err(e.to_string()))?;
        let frame = Frame::from_rgb(image.to_rgb8()).map_err(|e| decode_err(e.to_string()))?;
        Ok(Some(frame))
    }

    fn release(&mut self) {
        self.paths.clear();
        self.index = 0;
    }
}
