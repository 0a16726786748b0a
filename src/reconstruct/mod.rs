//! Reconstruction: turning captured images into an [`ObjectDescription`].
//!
//! One call sends a fixed instruction plus every image to a multimodal inference
//! endpoint and expects exactly one JSON document back. There is no retry and no
//! locally synthesized fallback. Only one call may be outstanding per client.

mod gemini;
mod prompt;
mod validate;

pub use gemini::{GeminiBackend, DEFAULT_ENDPOINT, DEFAULT_MODEL};
pub use prompt::instruction;
pub use validate::{validate, GeometryError};

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;

use crate::capture::MIN_IMAGES;
use crate::models::{CapturedImage, ObjectDescription};

/// Default upper bound on vertices accepted in a returned mesh.
pub const DEFAULT_MAX_MESH_VERTICES: usize = 65_536;

#[derive(Debug, Error)]
pub enum ReconstructionError {
    #[error("At least {MIN_IMAGES} images are required, got {0}")]
    NotEnoughImages(usize),

    #[error("A reconstruction is already in progress")]
    Busy,

    #[error("Invalid API key: {0}")]
    MissingCredential(String),

    #[error("Inference request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Inference endpoint error: {0}")]
    Endpoint(String),

    #[error("AI returned invalid JSON geometry: {0}")]
    InvalidResponseFormat(String),

    #[error("AI returned malformed geometry: {0}")]
    MalformedGeometry(#[from] GeometryError),
}

/// An image as it travels inside an inference request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64 (standard alphabet, padded) encoding of the image bytes.
    pub data: String,
}

impl From<&CapturedImage> for InlineImage {
    fn from(image: &CapturedImage) -> Self {
        Self {
            mime_type: image.mime_type.clone(),
            data: STANDARD.encode(&image.bytes),
        }
    }
}

/// One outbound call: the instruction followed by the images, in capture order.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub instruction: String,
    pub images: Vec<InlineImage>,
}

impl InferenceRequest {
    pub fn new(images: &[CapturedImage]) -> Self {
        Self {
            instruction: instruction(images.len()),
            images: images.iter().map(InlineImage::from).collect(),
        }
    }
}

/// A hosted multimodal model that answers an [`InferenceRequest`] with text.
pub trait InferenceBackend: Send + Sync {
    fn generate(
        &self,
        request: &InferenceRequest,
    ) -> impl Future<Output = Result<String, ReconstructionError>> + Send;
}

/// A credential for the inference endpoint.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    /// Reject absent, blank, or placeholder keys before anything is sent.
    pub fn parse(raw: Option<&str>) -> Result<Self, ReconstructionError> {
        let key = raw.map(str::trim).unwrap_or_default();
        if key.is_empty() {
            return Err(ReconstructionError::MissingCredential(
                "no API key configured, set GEMINI_API_KEY".to_string(),
            ));
        }
        if key.contains("INSERT") {
            return Err(ReconstructionError::MissingCredential(
                "API key is still a placeholder".to_string(),
            ));
        }
        Ok(Self(key.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

pub struct ReconstructionClient<B> {
    backend: B,
    in_flight: AtomicBool,
    max_vertices: usize,
}

impl<B: InferenceBackend> ReconstructionClient<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            in_flight: AtomicBool::new(false),
            max_vertices: DEFAULT_MAX_MESH_VERTICES,
        }
    }

    pub fn with_max_vertices(mut self, max_vertices: usize) -> Self {
        self.max_vertices = max_vertices;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Largest mesh, in vertices, this client accepts.
    pub fn max_vertices(&self) -> usize {
        self.max_vertices
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Send `images` for reconstruction and parse the single returned document.
    pub async fn reconstruct(
        &self,
        images: &[CapturedImage],
    ) -> Result<ObjectDescription, ReconstructionError> {
        if images.len() < MIN_IMAGES {
            return Err(ReconstructionError::NotEnoughImages(images.len()));
        }
        let _guard = InFlight::acquire(&self.in_flight).ok_or(ReconstructionError::Busy)?;

        tracing::info!("Processing {} images for reconstruction", images.len());
        let request = InferenceRequest::new(images);
        let text = self.backend.generate(&request).await.map_err(|e| {
            tracing::error!("Reconstruction error: {}", e);
            e
        })?;

        let description = parse_description(&text)?;
        validate(&description, self.max_vertices)?;
        tracing::info!(
            name = %description.name,
            shape = description.shape_type.as_str(),
            "Reconstruction complete"
        );
        Ok(description)
    }
}

/// Parse the endpoint's text as an [`ObjectDescription`].
pub fn parse_description(text: &str) -> Result<ObjectDescription, ReconstructionError> {
    serde_json::from_str(text.trim()).map_err(|e| {
        let preview: String = text.chars().take(100).collect();
        tracing::error!(response = %preview, "JSON parse error: {}", e);
        ReconstructionError::InvalidResponseFormat(e.to_string())
    })
}

/// Holds the in-flight flag for the duration of one call.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
