use uuid::Uuid;

/// MIME type of every frame produced by a capture session.
pub const JPEG_MIME_TYPE: &str = "image/jpeg";

/// A single encoded camera frame.
///
/// Created on each shutter press and never modified afterwards. The bytes are the
/// compressed image as it will be sent to the inference endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub id: Uuid,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl CapturedImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self::new(bytes, JPEG_MIME_TYPE)
    }
}
