#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::{Rgb, RgbImage};
use tokio::sync::Notify;

use xenoar::capture::{Camera, CaptureError, StreamRequest, VideoStream};
use xenoar::library::AssetLibrary;
use xenoar::models::CapturedImage;
use xenoar::reconstruct::{InferenceBackend, InferenceRequest, ReconstructionError};
use xenoar::store::Database;

pub const MUG_JSON: &str = r##"{"name":"Mug","shapeType":"box","dimensions":{"width":1,"height":1,"depth":1},"material":{"color":"#ffffff","metalness":0,"roughness":1},"spatialDescription":"a mug"}"##;

pub const ROCK_JSON: &str = r##"{
    "name": "Rock",
    "shapeType": "complex",
    "meshData": {
        "vertices": [0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1],
        "indices": [0, 2, 1, 0, 1, 3, 0, 3, 2, 1, 2, 3]
    },
    "dimensions": { "width": 1, "height": 1, "depth": 1 },
    "material": { "color": "#7a6f65", "metalness": 0.05, "roughness": 0.95, "textureDesc": "legacy-param-ignored" },
    "spatialDescription": "a small tetrahedral rock"
}"##;

pub fn memory_db() -> Database {
    let db = Database::open_memory().expect("Failed to create in-memory database");
    db.migrate().expect("Failed to run migrations");
    db
}

pub fn empty_library() -> AssetLibrary {
    AssetLibrary::load(memory_db()).expect("Failed to load library")
}

pub fn images(count: usize) -> Vec<CapturedImage> {
    (0..count)
        .map(|i| CapturedImage::jpeg(vec![0xFF, 0xD8, i as u8, 0xFF, 0xD9]))
        .collect()
}

/// A camera that shows a solid colour, changing shade on every frame.
pub struct StillCamera {
    pub available: bool,
    pub released: Arc<AtomicBool>,
    pub requests: Arc<Mutex<Vec<StreamRequest>>>,
}

impl StillCamera {
    pub fn new() -> Self {
        Self {
            available: true,
            released: Arc::new(AtomicBool::new(false)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn denied() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn was_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

pub struct StillStream {
    shade: u8,
    released: Arc<AtomicBool>,
}

impl Camera for StillCamera {
    type Stream = StillStream;

    fn open(&mut self, request: &StreamRequest) -> Result<StillStream, CaptureError> {
        self.requests.lock().unwrap().push(*request);
        if !self.available {
            return Err(CaptureError::CameraUnavailable(
                "permission denied".to_string(),
            ));
        }
        Ok(StillStream {
            shade: 0,
            released: Arc::clone(&self.released),
        })
    }
}

impl VideoStream for StillStream {
    fn current_frame(&mut self) -> Result<RgbImage, CaptureError> {
        self.shade = self.shade.wrapping_add(16);
        Ok(RgbImage::from_pixel(16, 16, Rgb([self.shade, 64, 128])))
    }

    fn stop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// An inference backend that answers with canned text.
#[derive(Clone)]
pub struct ScriptedBackend {
    pub reply: Result<String, String>,
    pub calls: Arc<AtomicUsize>,
    pub image_counts: Arc<Mutex<Vec<usize>>>,
    /// When set, each call waits for a notification before answering.
    pub gate: Option<Arc<Notify>>,
}

impl ScriptedBackend {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
            image_counts: Arc::new(Mutex::new(Vec::new())),
            gate: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            ..Self::replying("")
        }
    }

    pub fn gated(text: &str, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::replying(text)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InferenceBackend for ScriptedBackend {
    async fn generate(&self, request: &InferenceRequest) -> Result<String, ReconstructionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.image_counts.lock().unwrap().push(request.images.len());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.reply.clone().map_err(ReconstructionError::Endpoint)
    }
}
