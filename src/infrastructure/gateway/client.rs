#[cfg(test)]
#[path = "client_test.rs"]
mod tests;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::multipart::Form;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::convert_err;
use super::file_part;
use super::read_json;
use super::QUERY_FALLBACK_MESSAGE;
use super::UPLOAD_FALLBACK_MESSAGE;
use super::UPLOAD_FIELD;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Gateway;
use crate::domain::models::GatewayError;
use crate::domain::models::QueryAnswer;
use crate::domain::models::QueryPayload;
use crate::domain::models::UploadCandidate;
use crate::domain::models::UploadReceipt;

fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T, GatewayError> {
    return serde_json::from_value::<T>(body).map_err(|err| {
        return GatewayError::MalformedResponse {
            reason: err.to_string(),
        };
    });
}

/// Client side of the gateway, used by the terminal chat and upload commands.
pub struct GatewayClient {
    url: String,
    timeout: Duration,
    user_agent: String,
}

impl GatewayClient {
    pub fn new(url: &str, timeout: Duration, user_agent: &str) -> GatewayClient {
        return GatewayClient {
            url: url.trim_end_matches('/').to_string(),
            timeout,
            user_agent: user_agent.to_string(),
        };
    }

    pub fn from_config() -> Result<GatewayClient> {
        return Ok(GatewayClient::new(
            &Config::get(ConfigKey::GatewayURL),
            Duration::from_millis(Config::request_timeout()?),
            &Config::get(ConfigKey::UserAgent),
        ));
    }

    pub fn url(&self) -> &str {
        return &self.url;
    }
}

#[async_trait]
impl Gateway for GatewayClient {
    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<(), GatewayError> {
        let res = reqwest::Client::new()
            .get(format!("{url}/api/health", url = self.url))
            .header("user-agent", &self.user_agent)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(convert_err)?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            tracing::error!(status, "Gateway health check failed");
            let body = res.text().await.map_err(convert_err)?;
            return Err(GatewayError::from_response(
                status,
                &body,
                "Gateway health check failed",
            ));
        }

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn upload(
        &self,
        candidate: &UploadCandidate,
        bytes: Vec<u8>,
    ) -> Result<UploadReceipt, GatewayError> {
        let part = file_part(candidate.name(), candidate.mime_type(), bytes)?;
        let res = reqwest::Client::new()
            .post(format!("{url}/api/upload", url = self.url))
            .header("user-agent", &self.user_agent)
            .timeout(self.timeout)
            .multipart(Form::new().part(UPLOAD_FIELD, part))
            .send()
            .await
            .map_err(convert_err)?;

        let body = read_json(res, UPLOAD_FALLBACK_MESSAGE).await?;
        let receipt = parse_body::<UploadReceipt>(body)?;
        tracing::info!(
            file_id = receipt.file_id.as_str(),
            file_name = candidate.name(),
            "Uploaded document"
        );

        return Ok(receipt);
    }

    #[allow(clippy::implicit_return)]
    async fn query(&self, file_id: &str, user_query: &str) -> Result<QueryAnswer, GatewayError> {
        let payload = QueryPayload {
            file_id: Some(file_id.to_string()),
            user_query: user_query.to_string(),
        };

        let res = reqwest::Client::new()
            .post(format!("{url}/api/query", url = self.url))
            .header("user-agent", &self.user_agent)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(convert_err)?;

        let body = read_json(res, QUERY_FALLBACK_MESSAGE).await?;
        return parse_body::<QueryAnswer>(body);
    }
}
