#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

pub const NETWORK_ERROR_MESSAGE: &str =
    "Unable to reach the document service. Please try again.";

/// The single error shape surfaced by the gateway, on either side of it.
///
/// The `Display` implementation is the message shown to the user, so variants
/// carrying upstream details print them verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The request never reached its destination, or the connection dropped
    /// before a response arrived.
    #[error("{message}")]
    Network { message: String },

    #[error("The document service took too long to respond. Please try again.")]
    Timeout,

    /// Upstream answered with a non-success status.
    #[error("{detail}")]
    Upstream { status: u16, detail: String },

    /// Upstream answered successfully, but not with the JSON we expected.
    #[error("Received an unexpected response from the document service: {reason}")]
    MalformedResponse { reason: String },

    #[error("{detail}")]
    InvalidRequest { detail: String },

    #[error("No document is attached to this conversation. Upload a document first.")]
    Unscoped,
}

impl GatewayError {
    pub fn network() -> GatewayError {
        return GatewayError::Network {
            message: NETWORK_ERROR_MESSAGE.to_string(),
        };
    }

    /// Builds the normalized error for a non-success response. `fallback` is
    /// used when the body carries no usable detail.
    pub fn from_response(status: u16, body: &str, fallback: &str) -> GatewayError {
        return GatewayError::Upstream {
            status,
            detail: extract_detail(body).unwrap_or_else(|| return fallback.to_string()),
        };
    }

    pub fn display_message(&self) -> String {
        return self.to_string();
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Upstream { status, .. } => return Some(*status),
            _ => return None,
        }
    }
}

fn detail_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            if text.trim().is_empty() {
                return None;
            }
            return Some(text.to_string());
        }
        // FastAPI validation errors: [{"loc": [...], "msg": "...", "type": "..."}]
        Value::Array(items) => {
            let messages = items
                .iter()
                .filter_map(|item| {
                    return item.get("msg").and_then(|msg| return msg.as_str());
                })
                .collect::<Vec<&str>>();

            if messages.is_empty() {
                return None;
            }
            return Some(messages.join("; "));
        }
        Value::Null => return None,
        other => return Some(other.to_string()),
    }
}

fn extract_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => {
            for key in ["detail", "error", "message"] {
                if let Some(detail) = map.get(key).and_then(detail_from_value) {
                    return Some(detail);
                }
            }
            return None;
        }
        Ok(value @ Value::String(_)) => return detail_from_value(&value),
        _ => return Some(trimmed.to_string()),
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Safari does not support drag & drop. Please use the file picker.")]
    PlatformLimitation,

    #[error("Only PDF or image files (PNG, JPEG, TIFF, BMP) under 5MB are allowed.")]
    NoValidFiles,

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
