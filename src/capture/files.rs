use std::path::PathBuf;

use image::RgbImage;

use super::{Camera, CaptureError, StreamRequest, VideoStream};

/// A camera backed by still images on disk.
///
/// Each frame read advances to the next file, so pressing the shutter once per
/// file captures them all in order.
pub struct FileCamera {
    paths: Vec<PathBuf>,
}

impl FileCamera {
    pub fn new(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl Camera for FileCamera {
    type Stream = FileStream;

    fn open(&mut self, _request: &StreamRequest) -> Result<FileStream, CaptureError> {
        if self.paths.is_empty() {
            return Err(CaptureError::CameraUnavailable(
                "no camera device found".to_string(),
            ));
        }
        if let Some(missing) = self.paths.iter().find(|p| !p.is_file()) {
            return Err(CaptureError::CameraUnavailable(format!(
                "cannot read {}",
                missing.display()
            )));
        }
        Ok(FileStream {
            paths: self.paths.clone(),
            next: 0,
            stopped: false,
        })
    }
}

pub struct FileStream {
    paths: Vec<PathBuf>,
    next: usize,
    stopped: bool,
}

impl VideoStream for FileStream {
    fn current_frame(&mut self) -> Result<RgbImage, CaptureError> {
        if self.stopped {
            return Err(CaptureError::SessionClosed);
        }
        let path = self
            .paths
            .get(self.next)
            .ok_or_else(|| CaptureError::Frame("no more frames".to_string()))?;
        let frame = image::open(path)
            .map_err(|e| CaptureError::Frame(format!("{}: {}", path.display(), e)))?
            .to_rgb8();
        self.next += 1;
        Ok(frame)
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}
