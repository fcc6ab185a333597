#[cfg(test)]
#[path = "server_test.rs"]
mod tests;

use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::DefaultBodyLimit;
use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use axum::Extension;
use axum::Json;
use axum::Router;
use serde_json::json;
use serde_json::Value;
use tower_http::trace::TraceLayer;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::GatewayError;
use crate::domain::models::QueryPayload;
use crate::domain::services::MAX_UPLOAD_BYTES;
use crate::infrastructure::gateway::upstream::Upstream;
use crate::infrastructure::gateway::UPLOAD_FIELD;

/// Room for multipart boundaries and headers on top of the largest
/// acceptable document.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            GatewayError::Network { .. } | GatewayError::MalformedResponse { .. } => {
                StatusCode::BAD_GATEWAY
            }
            GatewayError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::InvalidRequest { .. } | GatewayError::Unscoped => {
                StatusCode::BAD_REQUEST
            }
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Responding with error");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Responding with error");
        }

        return (status, Json(json!({ "detail": self.display_message() }))).into_response();
    }
}

async fn health() -> Json<Value> {
    return Json(json!({ "status": "ok" }));
}

async fn upload(
    Extension(upstream): Extension<Arc<Upstream>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, GatewayError> {
    while let Some(field) = multipart.next_field().await.map_err(|err| {
        return GatewayError::InvalidRequest {
            detail: format!("Failed to read upload: {}", err.body_text()),
        };
    })? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(|err| {
            return GatewayError::InvalidRequest {
                detail: format!("Failed to read upload: {}", err.body_text()),
            };
        })?;

        let res = upstream
            .upload(&file_name, &content_type, bytes.to_vec())
            .await?;
        return Ok(Json(res));
    }

    return Err(GatewayError::InvalidRequest {
        detail: "No file provided".to_string(),
    });
}

async fn query(
    Extension(upstream): Extension<Arc<Upstream>>,
    payload: Result<Json<QueryPayload>, JsonRejection>,
) -> Result<Json<Value>, GatewayError> {
    let Json(payload) = payload.map_err(|rejection| {
        return GatewayError::InvalidRequest {
            detail: rejection.body_text(),
        };
    })?;

    // A missing identifier is passed through for upstream to reject.
    let file_id = payload.file_id.unwrap_or_default();
    let res = upstream.query(&file_id, &payload.user_query).await?;

    return Ok(Json(res));
}

pub fn router(upstream: Arc<Upstream>) -> Router {
    return Router::new()
        .route("/api/health", get(health))
        .route("/api/upload", post(upload))
        .route("/api/query", post(query))
        .route("/api/chat", post(query))
        .layer(Extension(upstream))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(
            MAX_UPLOAD_BYTES as usize + MULTIPART_OVERHEAD_BYTES,
        ));
}

pub async fn start() -> Result<()> {
    let upstream = Arc::new(Upstream::from_config()?);
    let listen = Config::get(ConfigKey::Listen);
    let listener = tokio::net::TcpListener::bind(&listen).await?;

    tracing::info!(
        listen = listen.as_str(),
        upstream_url = upstream.url(),
        "Gateway listening"
    );
    println!("Gateway listening on http://{listen}");

    axum::serve(listener, router(upstream)).await?;

    return Ok(());
}
