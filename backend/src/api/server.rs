//! HTTP Server for the nestmap API.
//!
//! Provides REST endpoints for uploading a mapping table plus an input
//! table and getting the nested documents back.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                               |
//! |--------|-------------------|-------------------------------------------|
//! | GET    | `/health`         | Health check                              |
//! | POST   | `/api/transform`  | Multipart `mapping` + `file` → documents  |

use axum::{
    extract::{Multipart, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::{net::SocketAddr, path::Path, sync::Arc};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use super::types::{error_response, TransformResponse};
use crate::config::EngineConfig;
use crate::error::{PipelineError, ServerError, ServerResult};
use crate::mapping::is_json_path;
use crate::transform::pipeline::transform_bytes;

/// Build the application router.
pub fn router(config: EngineConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/transform", post(transform_upload))
        .layer(cors)
        .with_state(Arc::new(config))
}

/// Start the HTTP server
pub async fn start_server(port: u16, config: EngineConfig) -> std::io::Result<()> {
    let app = router(config);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("nestmap server running on http://localhost:{}", port);
    println!("   POST /api/transform - multipart: mapping + file");
    println!("   GET  /health        - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "nestmap",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "transform": "POST /api/transform"
        }
    }))
}

/// One uploaded multipart part.
struct Upload {
    bytes: Vec<u8>,
    json: bool,
}

impl Upload {
    fn new(bytes: Vec<u8>, file_name: Option<&str>, content_type: Option<&str>) -> Self {
        let json = file_name.is_some_and(|n| is_json_path(Path::new(n)))
            || content_type.is_some_and(|c| c.starts_with("application/json"));
        Self { bytes, json }
    }
}

/// Transform endpoint
async fn transform_upload(
    State(config): State<Arc<EngineConfig>>,
    mut multipart: Multipart,
) -> ServerResult<Json<TransformResponse>> {
    let mut mapping: Option<Upload> = None;
    let mut file: Option<Upload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);

        if name != "mapping" && name != "file" {
            continue;
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?
            .to_vec();
        let upload = Upload::new(bytes, file_name.as_deref(), content_type.as_deref());

        info!(part = %name, file = file_name.as_deref().unwrap_or("unknown"), bytes = upload.bytes.len(), "received upload");
        if name == "mapping" {
            mapping = Some(upload);
        } else {
            file = Some(upload);
        }
    }

    let mapping = mapping.ok_or_else(|| ServerError::BadRequest("No mapping provided".to_string()))?;
    let file = file.ok_or_else(|| ServerError::BadRequest("No file provided".to_string()))?;

    let config = Arc::clone(&config);
    let result = tokio::task::spawn_blocking(move || {
        transform_bytes(&mapping.bytes, mapping.json, &file.bytes, file.json, &config)
    })
    .await
    .map_err(|e| ServerError::Internal(e.to_string()))??;

    info!(documents = result.documents, "transform request done");
    Ok(Json(TransformResponse::from(result)))
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::BadRequest(_) | ServerError::Pipeline(PipelineError::Csv(_)) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(PipelineError::Mapping(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(error = %self, status = status.as_u16(), "request rejected");
        }

        (status, Json(error_response(&self.to_string()))).into_response()
    }
}
