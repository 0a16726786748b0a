//! Camera capture sessions.
//!
//! A [`CaptureSession`] owns an open [`VideoStream`] for as long as the user is on
//! the capture screen. Each shutter press encodes the current frame as JPEG. The
//! stream is stopped when the session is completed, cancelled, or dropped.

mod files;

pub use files::{FileCamera, FileStream};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage};
use thiserror::Error;

use crate::models::CapturedImage;

/// Maximum number of frames a session will hold.
pub const MAX_IMAGES: usize = 8;
/// Minimum number of frames before a session can be completed.
pub const MIN_IMAGES: usize = 2;
/// JPEG quality used when the caller does not pick one.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("Capture limit reached ({MAX_IMAGES} images)")]
    CaptureLimitReached,

    #[error("At least {MIN_IMAGES} images are required, {0} captured")]
    NotEnoughImages(usize),

    #[error("Capture session is closed")]
    SessionClosed,

    #[error("Failed to read frame: {0}")]
    Frame(String),

    #[error("Failed to encode frame: {0}")]
    Encode(#[from] image::ImageError),
}

/// Which way the requested camera should face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    /// Rear camera, pointing away from the user.
    Environment,
    User,
}

/// Constraints passed when opening a camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub facing: Facing,
    pub audio: bool,
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self {
            facing: Facing::Environment,
            audio: false,
        }
    }
}

/// A device that can hand out live video streams.
pub trait Camera {
    type Stream: VideoStream;

    /// Acquire a stream. Fails with [`CaptureError::CameraUnavailable`] when
    /// permission is denied or no device exists.
    fn open(&mut self, request: &StreamRequest) -> Result<Self::Stream, CaptureError>;
}

/// A live video feed.
pub trait VideoStream {
    /// The frame currently being shown.
    fn current_frame(&mut self) -> Result<RgbImage, CaptureError>;

    /// Release the underlying device. Must be safe to call more than once.
    fn stop(&mut self);
}

impl<S: VideoStream + ?Sized> VideoStream for Box<S> {
    fn current_frame(&mut self) -> Result<RgbImage, CaptureError> {
        (**self).current_frame()
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}

/// A stream whose concrete camera type has been erased.
pub type BoxedStream = Box<dyn VideoStream + Send>;

pub struct CaptureSession<S: VideoStream> {
    stream: Option<S>,
    images: Vec<CapturedImage>,
    jpeg_quality: u8,
}

impl<S: VideoStream> CaptureSession<S> {
    /// Open a rear-facing, video-only stream on `camera`.
    pub fn start<C>(camera: &mut C) -> Result<Self, CaptureError>
    where
        C: Camera<Stream = S>,
    {
        Self::start_with_quality(camera, DEFAULT_JPEG_QUALITY)
    }

    pub fn start_with_quality<C>(camera: &mut C, jpeg_quality: u8) -> Result<Self, CaptureError>
    where
        C: Camera<Stream = S>,
    {
        let stream = camera.open(&StreamRequest::default()).map_err(|e| {
            tracing::error!("Camera error: {}", e);
            e
        })?;
        tracing::info!("Capture session started");
        Ok(Self {
            stream: Some(stream),
            images: Vec::new(),
            jpeg_quality: jpeg_quality.clamp(1, 100),
        })
    }

    pub fn images(&self) -> &[CapturedImage] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    pub fn can_capture(&self) -> bool {
        self.is_open() && self.images.len() < MAX_IMAGES
    }

    pub fn can_complete(&self) -> bool {
        self.is_open() && self.images.len() >= MIN_IMAGES
    }

    /// Erase the stream type, keeping the open stream and any images taken.
    pub fn boxed(mut self) -> CaptureSession<BoxedStream>
    where
        S: Send + 'static,
    {
        CaptureSession {
            stream: self.stream.take().map(|s| Box::new(s) as BoxedStream),
            images: std::mem::take(&mut self.images),
            jpeg_quality: self.jpeg_quality,
        }
    }

    /// Snapshot and encode the current frame.
    pub fn capture(&mut self) -> Result<&CapturedImage, CaptureError> {
        if self.images.len() >= MAX_IMAGES {
            return Err(CaptureError::CaptureLimitReached);
        }
        let stream = self.stream.as_mut().ok_or(CaptureError::SessionClosed)?;
        let frame = stream.current_frame()?;
        let bytes = encode_jpeg(frame, self.jpeg_quality)?;
        let image = CapturedImage::jpeg(bytes);
        tracing::info!(
            id = %image.id,
            size = image.bytes.len(),
            "Captured {}/{}",
            self.images.len() + 1,
            MAX_IMAGES
        );
        self.images.push(image);
        Ok(&self.images[self.images.len() - 1])
    }

    /// Release the stream and hand over the captured images, in capture order.
    ///
    /// With fewer than [`MIN_IMAGES`] held the session stays open and nothing is
    /// returned.
    pub fn complete(&mut self) -> Result<Vec<CapturedImage>, CaptureError> {
        if !self.is_open() {
            return Err(CaptureError::SessionClosed);
        }
        if self.images.len() < MIN_IMAGES {
            return Err(CaptureError::NotEnoughImages(self.images.len()));
        }
        self.release();
        Ok(std::mem::take(&mut self.images))
    }

    /// Release the stream and discard every captured image.
    pub fn cancel(mut self) {
        self.release();
        self.images.clear();
        tracing::info!("Capture session cancelled");
    }

    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            tracing::debug!("Camera stream released");
        }
    }
}

impl<S: VideoStream> Drop for CaptureSession<S> {
    fn drop(&mut self) {
        self.release();
    }
}

fn encode_jpeg(frame: RgbImage, quality: u8) -> Result<Vec<u8>, CaptureError> {
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    DynamicImage::ImageRgb8(frame).write_with_encoder(encoder)?;
    Ok(bytes)
}
