use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ApiState;
use crate::capture::{MAX_IMAGES, MIN_IMAGES};
use crate::library::LibraryError;
use crate::models::*;
use crate::reconstruct::{validate, InferenceBackend, ReconstructionError};
use crate::scene::{self, ExportFormat, Scene};

// ============================================================
// Error Handling
// ============================================================

/// Log a storage failure and return a sanitized response to the client.
fn library_error(e: LibraryError) -> (StatusCode, String) {
    tracing::error!("Library error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn reconstruction_error(e: ReconstructionError) -> (StatusCode, String) {
    let status = match &e {
        ReconstructionError::NotEnoughImages(_) => StatusCode::BAD_REQUEST,
        ReconstructionError::Busy => StatusCode::CONFLICT,
        ReconstructionError::MissingCredential(_) => StatusCode::SERVICE_UNAVAILABLE,
        ReconstructionError::Http(_)
        | ReconstructionError::Endpoint(_)
        | ReconstructionError::InvalidResponseFormat(_)
        | ReconstructionError::MalformedGeometry(_) => StatusCode::BAD_GATEWAY,
    };
    tracing::warn!("Reconstruction failed: {}", e);
    (status, e.to_string())
}

fn not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "Model not found".to_string())
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Library
// ============================================================

pub async fn list_models<B>(State(state): State<ApiState<B>>) -> Json<Vec<StoredObject>> {
    let library = state.library.lock().expect("library lock poisoned");
    Json(library.objects().to_vec())
}

pub async fn get_model<B>(
    State(state): State<ApiState<B>>,
    Path(id): Path<Uuid>,
) -> Result<Json<StoredObject>, (StatusCode, String)> {
    let library = state.library.lock().expect("library lock poisoned");
    library.get(id).cloned().map(Json).ok_or_else(not_found)
}

pub async fn save_model<B: InferenceBackend>(
    State(state): State<ApiState<B>>,
    Json(description): Json<ObjectDescription>,
) -> Result<(StatusCode, Json<StoredObject>), (StatusCode, String)> {
    validate(&description, state.client.max_vertices())
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    let mut library = state.library.lock().expect("library lock poisoned");
    library
        .add(&description)
        .map(|stored| (StatusCode::CREATED, Json(stored)))
        .map_err(library_error)
}

pub async fn delete_model<B>(
    State(state): State<ApiState<B>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let mut library = state.library.lock().expect("library lock poisoned");
    if library.remove(id).map_err(library_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

pub async fn export_model<B>(
    State(state): State<ApiState<B>>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, (StatusCode, String)> {
    let format = match query.format.as_deref() {
        Some(name) => name
            .parse::<ExportFormat>()
            .map_err(|e| (StatusCode::BAD_REQUEST, e))?,
        None => ExportFormat::default(),
    };
    let description = {
        let library = state.library.lock().expect("library lock poisoned");
        library.get(id).ok_or_else(not_found)?.params.clone()
    };

    let file = scene::export(&Scene::materialize(&description), format)
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    let headers = [
        (header::CONTENT_TYPE, file.mime_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file.file_name),
        ),
    ];
    Ok((headers, file.bytes).into_response())
}

// ============================================================
// Reconstruction
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInput {
    pub mime_type: String,
    /// Base64-encoded image bytes.
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconstructInput {
    pub images: Vec<ImageInput>,
}

pub async fn reconstruct<B: InferenceBackend>(
    State(state): State<ApiState<B>>,
    Json(input): Json<ReconstructInput>,
) -> Result<Json<ObjectDescription>, (StatusCode, String)> {
    if input.images.len() < MIN_IMAGES || input.images.len() > MAX_IMAGES {
        return Err((
            StatusCode::BAD_REQUEST,
            format!(
                "Between {} and {} images are required, got {}",
                MIN_IMAGES,
                MAX_IMAGES,
                input.images.len()
            ),
        ));
    }

    let images = input
        .images
        .into_iter()
        .enumerate()
        .map(|(i, image)| {
            if !image.mime_type.starts_with("image/") {
                return Err((
                    StatusCode::BAD_REQUEST,
                    format!("Image {} has unsupported type {}", i, image.mime_type),
                ));
            }
            let bytes = STANDARD.decode(image.data.as_bytes()).map_err(|e| {
                (
                    StatusCode::BAD_REQUEST,
                    format!("Image {} is not valid base64: {}", i, e),
                )
            })?;
            Ok(CapturedImage::new(bytes, image.mime_type))
        })
        .collect::<Result<Vec<_>, _>>()?;

    state
        .client
        .reconstruct(&images)
        .await
        .map(Json)
        .map_err(reconstruction_error)
}
