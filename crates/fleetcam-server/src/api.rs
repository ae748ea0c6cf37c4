use std::sync::Arc;

use axum::{
    extract::{
        rejection::{BytesRejection, JsonRejection, QueryRejection},
        DefaultBodyLimit, Path, Query, State,
    },
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use fleetcam_shared::DeviceId;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::sync::SyncService;
use crate::validation::{validate_struct, ConfigUpdateRequest, ErrorReportRequest};
use crate::views::{AdminView, DeviceSummaryView, DeviceView, ErrorView};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SyncService>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any);

    let image_route = format!("{}/:id/:name", state.config.image_public_prefix);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/devices", get(list_fleet))
        .route("/devices/:id/config", get(get_device_config))
        .route("/devices/:id/errors", get(get_device_errors).post(report_device_error))
        .route("/devices/:id/images", get(list_device_images).post(upload_device_image))
        .route(
            "/admin/devices/:id/config",
            get(get_admin_config).put(update_admin_config),
        )
        .route(&image_route, get(download_image))
        .layer(DefaultBodyLimit::max(state.config.max_image_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    max_image_size: usize,
}

#[derive(Serialize)]
struct ImageUploadResponse {
    stored: bool,
    path: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigQuery {
    #[serde(default)]
    initial_connection: bool,
}

fn device_id(raw: &str) -> Result<DeviceId, ServerError> {
    Ok(DeviceId::parse(raw)?)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        max_image_size: state.config.max_image_size,
    })
}

// ─── Device-facing endpoints ───

async fn list_fleet(
    State(state): State<AppState>,
) -> Result<Json<Vec<DeviceSummaryView>>, ServerError> {
    Ok(Json(state.service.get_fleet_summary().await?))
}

async fn get_device_config(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    query: Result<Query<ConfigQuery>, QueryRejection>,
) -> Result<Json<DeviceView>, ServerError> {
    let id = device_id(&raw_id)?;
    let Query(query) = query.map_err(|e| ServerError::InvalidInput(e.body_text()))?;

    let view = state
        .service
        .get_device_config(&id, query.initial_connection)
        .await?;
    Ok(Json(view))
}

async fn get_device_errors(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Vec<ErrorView>>, ServerError> {
    let id = device_id(&raw_id)?;
    Ok(Json(state.service.get_device_errors(&id).await?))
}

async fn report_device_error(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<ErrorReportRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let id = device_id(&raw_id)?;
    let Json(req) = payload?;
    validate_struct(&req)?;

    state.service.report_device_error(&id, req.error_code).await?;
    Ok(Json(serde_json::json!({ "recorded": true })))
}

async fn upload_device_image(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ImageUploadResponse>, ServerError> {
    let id = device_id(&raw_id)?;
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::PayloadTooLarge {
                max: state.config.max_image_size,
            }
        } else {
            ServerError::InvalidInput(rejection.body_text())
        }
    })?;
    let size = body.len();
    let path = state.service.record_device_image(&id, body).await?;

    info!(device = %id, size, "Image uploaded via API");
    Ok(Json(ImageUploadResponse { stored: true, path }))
}

async fn list_device_images(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Vec<String>>, ServerError> {
    let id = device_id(&raw_id)?;
    Ok(Json(state.service.list_device_images(&id).await?))
}

async fn download_image(
    State(state): State<AppState>,
    Path((raw_id, name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ServerError> {
    let id = device_id(&raw_id)?;
    let data = state.service.read_device_image(&id, &name).await?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], data))
}

// ─── Admin endpoints ───

async fn get_admin_config(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<AdminView>, ServerError> {
    let id = device_id(&raw_id)?;
    Ok(Json(state.service.get_device_config_for_admin(&id).await?))
}

async fn update_admin_config(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<ConfigUpdateRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let id = device_id(&raw_id)?;
    let Json(req) = payload?;
    let patch = req.into_patch()?;

    state.service.update_device_config(&id, patch).await?;
    Ok(Json(serde_json::json!({ "updated": true })))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use fleetcam_store::{Database, DefaultConfig};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::image_store::ImageStore;
    use crate::repository::SqliteRepository;

    async fn test_app() -> (Router, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Database::open_at(&dir.path().join("fleet.db")).unwrap();
        let repo = Arc::new(SqliteRepository::new(db, DefaultConfig::default()));
        let image_store = ImageStore::new(dir.path().join("images"), 1024)
            .await
            .unwrap();
        let config = ServerConfig {
            max_image_size: 1024,
            ..ServerConfig::default()
        };
        let service = SyncService::new(
            repo.clone(),
            repo.clone(),
            repo,
            Arc::new(image_store),
            config.image_public_prefix.clone(),
        );
        let state = AppState {
            service: Arc::new(service),
            config: Arc::new(config),
        };
        (build_router(state), dir)
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    async fn send_json(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let (status, body) = send(app, req).await;
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn with_json(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _dir) = test_app().await;
        let (status, json) = send_json(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_device_sync_scenario() {
        let (app, _dir) = test_app().await;

        let (status, _) = send_json(&app, get("/devices/dev-1/config")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) =
            send_json(&app, get("/devices/dev-1/config?initialConnection=true")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["paused"], false);
        assert_eq!(json["backup"], false);
        assert_eq!(json["resolution"], 2);
        assert_eq!(json["pxFormat"], "PXFORMAT_JPEG");
        assert_eq!(json["hours"], serde_json::json!(["12:00"]));
        assert!(json["timestamp"].is_string());
        assert!(json.get("id").is_none());

        let (status, json) = send_json(
            &app,
            with_json(
                "PUT",
                "/admin/devices/dev-1/config",
                serde_json::json!({
                    "paused": true,
                    "pxFormat": "PXFORMAT_JPEG",
                    "resolution": 5,
                    "hours": ["08:00", "20:00"],
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["updated"], true);

        let (status, json) = send_json(&app, get("/admin/devices/dev-1/config")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["id"], "dev-1");
        assert_eq!(json["paused"], true);
        assert_eq!(json["resolution"], 5);
        assert_eq!(json["hours"], serde_json::json!(["08:00", "20:00"]));
        assert!(json["lastModified"].is_string());
        assert!(json["lastPinged"].is_string());

        let (status, json) = send_json(&app, get("/devices")).await;
        assert_eq!(status, StatusCode::OK);
        let fleet = json.as_array().unwrap();
        assert_eq!(fleet.len(), 1);
        assert_eq!(fleet[0]["id"], "dev-1");
        assert!(fleet[0].get("paused").is_none());
    }

    #[tokio::test]
    async fn test_update_unknown_device_is_404() {
        let (app, _dir) = test_app().await;
        let (status, json) = send_json(
            &app,
            with_json(
                "PUT",
                "/admin/devices/ghost/config",
                serde_json::json!({
                    "paused": false,
                    "pxFormat": "PXFORMAT_JPEG",
                    "resolution": 1,
                    "hours": [],
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].as_str().unwrap().contains("ghost"));

        let (status, _) = send_json(&app, get("/admin/devices/ghost/config")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_resolution_bounds() {
        let (app, _dir) = test_app().await;
        send_json(&app, get("/devices/dev-1/config?initialConnection=true")).await;

        for (resolution, expected) in [
            (0, StatusCode::OK),
            (63, StatusCode::OK),
            (64, StatusCode::BAD_REQUEST),
            (-1, StatusCode::BAD_REQUEST),
        ] {
            let (status, _) = send_json(
                &app,
                with_json(
                    "PUT",
                    "/admin/devices/dev-1/config",
                    serde_json::json!({
                        "paused": false,
                        "pxFormat": "PXFORMAT_JPEG",
                        "resolution": resolution,
                        "hours": ["12:00"],
                    }),
                ),
            )
            .await;
            assert_eq!(status, expected, "resolution {resolution}");
        }

        let (_, json) = send_json(&app, get("/admin/devices/dev-1/config")).await;
        assert_eq!(json["resolution"], 63);
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let (app, _dir) = test_app().await;
        let req = Request::builder()
            .method("POST")
            .uri("/devices/dev-1/errors")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, json) = send_json(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_invalid_device_id_is_400() {
        let (app, _dir) = test_app().await;
        for uri in ["/devices/%2E%2E/errors", "/devices/a%5Cb/errors", "/devices/a%2Fb/errors"] {
            let (status, json) = send_json(&app, get(uri)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(json["error"]
                .as_str()
                .unwrap()
                .starts_with("Invalid path parameter"));
        }
    }

    #[tokio::test]
    async fn test_padded_id_is_a_different_device() {
        let (app, _dir) = test_app().await;

        let (status, _) =
            send_json(&app, get("/devices/cam/config?initialConnection=true")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send_json(&app, get("/devices/cam%20/config")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) =
            send_json(&app, get("/devices/cam%20/config?initialConnection=true")).await;
        assert_eq!(status, StatusCode::OK);

        let (_, json) = send_json(&app, get("/devices")).await;
        let ids: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["cam", "cam "]);
    }

    #[tokio::test]
    async fn test_report_and_list_errors() {
        let (app, _dir) = test_app().await;

        let (status, _) = send_json(
            &app,
            with_json(
                "POST",
                "/devices/dev-1/errors",
                serde_json::json!({ "errorCode": 404 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = send_json(&app, get("/devices/dev-1/errors")).await;
        assert_eq!(status, StatusCode::OK);
        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["id"], "dev-1");
        assert_eq!(entries[0]["error"], 404);
        assert!(entries[0]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_upload_list_download_image() {
        let (app, _dir) = test_app().await;

        let req = Request::post("/devices/dev-1/images")
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(Body::from(&b"\xff\xd8\xff\xe0jpeg"[..]))
            .unwrap();
        let (status, json) = send_json(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        let path = json["path"].as_str().unwrap().to_string();
        assert!(path.starts_with("/images/dev-1/"));

        let (status, json) = send_json(&app, get("/devices/dev-1/images")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!([path.clone()]));

        let (status, body) = send(&app, get(&path)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"\xff\xd8\xff\xe0jpeg");
    }

    #[tokio::test]
    async fn test_listed_path_is_fetchable_for_reserved_characters() {
        let (app, _dir) = test_app().await;

        let req = Request::post("/devices/cam%3F1%20%23x/images")
            .body(Body::from(&b"\xff\xd8img"[..]))
            .unwrap();
        let (status, json) = send_json(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        let path = json["path"].as_str().unwrap().to_string();
        assert!(path.starts_with("/images/cam%3F1%20%23x/"), "{path}");

        let (_, json) = send_json(&app, get("/devices/cam%3F1%20%23x/images")).await;
        assert_eq!(json, serde_json::json!([path.clone()]));

        let (status, body) = send(&app, get(&path)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"\xff\xd8img");
    }

    #[tokio::test]
    async fn test_oversized_upload_rejected() {
        let (app, _dir) = test_app().await;
        let req = Request::post("/devices/dev-1/images")
            .body(Body::from(vec![0u8; 2048]))
            .unwrap();
        let (status, json) = send_json(&app, req).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json["error"], "Image too large (max 1024 bytes)");

        let (_, json) = send_json(&app, get("/devices/dev-1/images")).await;
        assert_eq!(json, serde_json::json!([]));
    }
}
