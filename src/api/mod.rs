mod handlers;

use std::sync::{Arc, Mutex};

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::library::AssetLibrary;
use crate::reconstruct::{InferenceBackend, ReconstructionClient};

pub use handlers::{ExportQuery, ImageInput, ReconstructInput};

/// Shared state behind the HTTP API.
pub struct ApiState<B> {
    pub library: Arc<Mutex<AssetLibrary>>,
    pub client: Arc<ReconstructionClient<B>>,
}

impl<B> ApiState<B> {
    pub fn new(library: AssetLibrary, client: ReconstructionClient<B>) -> Self {
        Self {
            library: Arc::new(Mutex::new(library)),
            client: Arc::new(client),
        }
    }
}

impl<B> Clone for ApiState<B> {
    fn clone(&self) -> Self {
        Self {
            library: Arc::clone(&self.library),
            client: Arc::clone(&self.client),
        }
    }
}

pub fn create_router<B: InferenceBackend + 'static>(state: ApiState<B>) -> Router {
    let api = Router::new()
        // Library
        .route(
            "/models",
            get(handlers::list_models::<B>).post(handlers::save_model::<B>),
        )
        .route(
            "/models/{id}",
            get(handlers::get_model::<B>).delete(handlers::delete_model::<B>),
        )
        .route("/models/{id}/export", get(handlers::export_model::<B>))
        // Reconstruction
        .route("/reconstructions", post(handlers::reconstruct::<B>))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
