use std::sync::Arc;

use async_trait::async_trait;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use serde_json::Map;
use serde_json::Value;

use super::GatewayError;
use super::UploadCandidate;

/// Successful upload. Only `file_id` is required, anything else upstream
/// returns is kept as-is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub file_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,
}

/// Body accepted by the gateway's query route. Older clients sent
/// `document_id`/`query`, both spellings are understood.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPayload {
    #[serde(default, alias = "document_id")]
    pub file_id: Option<String>,
    #[serde(alias = "query")]
    pub user_query: String,
}

#[async_trait]
pub trait Gateway {
    /// Used before starting a chat to verify the gateway is reachable.
    async fn health_check(&self) -> Result<(), GatewayError>;

    /// Sends a validated file to the document service and returns the
    /// identifier it was stored under.
    async fn upload(
        &self,
        candidate: &UploadCandidate,
        bytes: Vec<u8>,
    ) -> Result<UploadReceipt, GatewayError>;

    /// Asks a question about a previously uploaded document.
    async fn query(&self, file_id: &str, user_query: &str) -> Result<QueryAnswer, GatewayError>;
}

pub type GatewayRef = Arc<dyn Gateway + Send + Sync>;
