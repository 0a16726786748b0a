mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};
use tokio::sync::Notify;
use uuid::Uuid;

use common::*;
use xenoar::api::{create_router, ApiState, ImageInput, ReconstructInput};
use xenoar::models::*;
use xenoar::reconstruct::ReconstructionClient;

fn setup_with(backend: ScriptedBackend) -> (TestServer, ApiState<ScriptedBackend>) {
    let state = ApiState::new(empty_library(), ReconstructionClient::new(backend));
    let app = create_router(state.clone());
    let server = TestServer::new(app).expect("Failed to create test server");
    (server, state)
}

fn setup() -> TestServer {
    setup_with(ScriptedBackend::replying(MUG_JSON)).0
}

fn mug() -> Value {
    serde_json::from_str(MUG_JSON).unwrap()
}

async fn save_mug(server: &TestServer) -> StoredObject {
    server.post("/api/v1/models").json(&mug()).await.json::<StoredObject>()
}

fn upload(count: usize) -> ReconstructInput {
    ReconstructInput {
        images: images(count)
            .iter()
            .map(|image| ImageInput {
                mime_type: image.mime_type.clone(),
                data: STANDARD.encode(&image.bytes),
            })
            .collect(),
    }
}

mod health {
    use super::*;

    #[tokio::test]
    async fn reports_ok() {
        let server = setup();

        let response = server.get("/api/v1/health").await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>(), json!({ "status": "ok" }));
    }
}

mod models {
    use super::*;

    #[tokio::test]
    async fn starts_empty() {
        let server = setup();

        let response = server.get("/api/v1/models").await;

        response.assert_status_ok();
        assert!(response.json::<Vec<StoredObject>>().is_empty());
    }

    #[tokio::test]
    async fn saving_returns_the_stored_object() {
        let server = setup();

        let response = server.post("/api/v1/models").json(&mug()).await;

        response.assert_status(StatusCode::CREATED);
        let stored = response.json::<StoredObject>();
        assert_eq!(stored.name, "Mug");
        assert_eq!(stored.params.shape_type, ShapeKind::Box);
    }

    #[tokio::test]
    async fn lists_newest_first() {
        let server = setup();
        let first = save_mug(&server).await;
        let second = save_mug(&server).await;

        let listed = server.get("/api/v1/models").await.json::<Vec<StoredObject>>();

        let ids: Vec<Uuid> = listed.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn rejects_invalid_geometry() {
        let server = setup();
        let mut body = mug();
        body["dimensions"]["height"] = json!(-1);

        let response = server.post("/api/v1/models").json(&body).await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(server.get("/api/v1/models").await.json::<Vec<StoredObject>>().is_empty());
    }

    #[tokio::test]
    async fn applies_the_configured_vertex_limit() {
        let state = ApiState::new(
            empty_library(),
            ReconstructionClient::new(ScriptedBackend::replying(MUG_JSON)).with_max_vertices(3),
        );
        let server = TestServer::new(create_router(state)).expect("Failed to create test server");
        let rock: Value = serde_json::from_str(ROCK_JSON).unwrap();

        let response = server.post("/api/v1/models").json(&rock).await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.text().contains("limit is 3"));
    }

    #[tokio::test]
    async fn gets_a_model_by_id() {
        let server = setup();
        let stored = save_mug(&server).await;

        let response = server.get(&format!("/api/v1/models/{}", stored.id)).await;

        response.assert_status_ok();
        assert_eq!(response.json::<StoredObject>(), stored);
    }

    #[tokio::test]
    async fn returns_404_for_unknown_model() {
        let server = setup();

        let response = server.get(&format!("/api/v1/models/{}", Uuid::new_v4())).await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deletes_a_model() {
        let server = setup();
        let stored = save_mug(&server).await;

        let response = server.delete(&format!("/api/v1/models/{}", stored.id)).await;
        response.assert_status(StatusCode::NO_CONTENT);

        let again = server.delete(&format!("/api/v1/models/{}", stored.id)).await;
        again.assert_status(StatusCode::NOT_FOUND);
    }
}

mod export {
    use super::*;

    #[tokio::test]
    async fn downloads_gltf_by_default() {
        let server = setup();
        let stored = save_mug(&server).await;

        let response = server
            .get(&format!("/api/v1/models/{}/export", stored.id))
            .await;

        response.assert_status_ok();
        assert_eq!(response.header("content-type"), "model/gltf+json");
        assert_eq!(
            response.header("content-disposition"),
            "attachment; filename=\"Mug.gltf\""
        );
        let document: Value = serde_json::from_slice(response.as_bytes()).unwrap();
        assert_eq!(document["asset"]["version"], "2.0");
    }

    #[tokio::test]
    async fn downloads_glb_on_request() {
        let server = setup();
        let stored = save_mug(&server).await;

        let response = server
            .get(&format!("/api/v1/models/{}/export", stored.id))
            .add_query_param("format", "glb")
            .await;

        response.assert_status_ok();
        assert_eq!(response.header("content-type"), "model/gltf-binary");
        assert_eq!(&response.as_bytes()[0..4], b"glTF");
    }

    #[tokio::test]
    async fn rejects_unknown_formats() {
        let server = setup();
        let stored = save_mug(&server).await;

        let response = server
            .get(&format!("/api/v1/models/{}/export", stored.id))
            .add_query_param("format", "obj")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }
}

mod reconstructions {
    use super::*;

    #[tokio::test]
    async fn returns_the_description() {
        let server = setup();

        let response = server.post("/api/v1/reconstructions").json(&upload(3)).await;

        response.assert_status_ok();
        let description = response.json::<ObjectDescription>();
        assert_eq!(description.name, "Mug");
    }

    #[tokio::test]
    async fn does_not_save_to_the_library() {
        let server = setup();

        server.post("/api/v1/reconstructions").json(&upload(2)).await.assert_status_ok();

        assert!(server.get("/api/v1/models").await.json::<Vec<StoredObject>>().is_empty());
    }

    #[tokio::test]
    async fn rejects_too_few_or_too_many_images() {
        let backend = ScriptedBackend::replying(MUG_JSON);
        let (server, _) = setup_with(backend.clone());

        server
            .post("/api/v1/reconstructions")
            .json(&upload(1))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .post("/api/v1/reconstructions")
            .json(&upload(9))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn rejects_non_image_payloads() {
        let server = setup();
        let mut input = upload(2);
        input.images[1].mime_type = "text/plain".to_string();

        let response = server.post("/api/v1/reconstructions").json(&input).await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rejects_bad_base64() {
        let server = setup();
        let mut input = upload(2);
        input.images[0].data = "***".to_string();

        let response = server.post("/api/v1/reconstructions").json(&input).await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn maps_unreadable_replies_to_bad_gateway() {
        let (server, _) = setup_with(ScriptedBackend::replying("no geometry here"));

        let response = server.post("/api/v1/reconstructions").json(&upload(2)).await;

        response.assert_status(StatusCode::BAD_GATEWAY);
        assert!(response.text().contains("AI returned invalid JSON geometry"));
    }

    #[tokio::test]
    async fn refuses_a_second_call_while_one_is_pending() {
        let gate = Arc::new(Notify::new());
        let (server, state) = setup_with(ScriptedBackend::gated(MUG_JSON, Arc::clone(&gate)));

        let pending = {
            let client = Arc::clone(&state.client);
            tokio::spawn(async move { client.reconstruct(&images(2)).await })
        };
        while !state.client.is_busy() {
            tokio::task::yield_now().await;
        }

        let response = server.post("/api/v1/reconstructions").json(&upload(2)).await;
        response.assert_status(StatusCode::CONFLICT);

        gate.notify_one();
        assert!(pending.await.unwrap().is_ok());
    }
}
