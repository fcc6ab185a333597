pub mod client;
pub mod upstream;

use reqwest::multipart::Part;
use serde_json::Value;

use crate::domain::models::GatewayError;

/// Multipart field carrying the document, on both sides of the gateway.
pub const UPLOAD_FIELD: &str = "file";
pub const UPLOAD_FALLBACK_MESSAGE: &str = "Failed to upload file";
pub const QUERY_FALLBACK_MESSAGE: &str = "Failed to get response from backend";

fn convert_err(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        tracing::warn!(error = ?err, "Request timed out");
        return GatewayError::Timeout;
    }

    tracing::warn!(error = ?err, "Request failed before a response arrived");
    return GatewayError::network();
}

fn file_part(file_name: &str, content_type: &str, bytes: Vec<u8>) -> Result<Part, GatewayError> {
    return Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str(content_type)
        .map_err(|_| {
            return GatewayError::InvalidRequest {
                detail: format!("Invalid content type {content_type}"),
            };
        });
}

/// Reads a response as JSON, normalizing non-success statuses into
/// `GatewayError::Upstream`.
async fn read_json(res: reqwest::Response, fallback: &str) -> Result<Value, GatewayError> {
    let status = res.status().as_u16();
    let body = res.text().await.map_err(convert_err)?;
    tracing::debug!(status, "Received response");

    if !(200..300).contains(&status) {
        let err = GatewayError::from_response(status, &body, fallback);
        tracing::warn!(status, error = %err, "Request was rejected");
        return Err(err);
    }

    return serde_json::from_str::<Value>(&body).map_err(|err| {
        tracing::warn!(status, error = ?err, "Response body is not JSON");
        return GatewayError::MalformedResponse {
            reason: err.to_string(),
        };
    });
}
