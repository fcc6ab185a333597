#[cfg(test)]
#[path = "upstream_test.rs"]
mod tests;

use std::time::Duration;

use anyhow::Result;
use reqwest::multipart::Form;
use serde_json::Value;

use super::convert_err;
use super::file_part;
use super::read_json;
use super::QUERY_FALLBACK_MESSAGE;
use super::UPLOAD_FALLBACK_MESSAGE;
use super::UPLOAD_FIELD;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::GatewayError;

/// The document service behind the gateway. Both endpoints take multipart
/// forms and answer JSON, which is passed back untouched.
pub struct Upstream {
    url: String,
    timeout: Duration,
}

impl Upstream {
    pub fn new(url: &str, timeout: Duration) -> Upstream {
        return Upstream {
            url: url.trim_end_matches('/').to_string(),
            timeout,
        };
    }

    pub fn from_config() -> Result<Upstream> {
        return Ok(Upstream::new(
            &Config::get(ConfigKey::UpstreamURL),
            Duration::from_millis(Config::request_timeout()?),
        ));
    }

    pub fn url(&self) -> &str {
        return &self.url;
    }

    pub async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Value, GatewayError> {
        tracing::info!(
            endpoint = "upload",
            file_name,
            content_type,
            size = bytes.len(),
            "Forwarding request upstream"
        );

        let form = Form::new().part(UPLOAD_FIELD, file_part(file_name, content_type, bytes)?);
        let res = reqwest::Client::new()
            .post(format!("{url}/upload/", url = self.url))
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(convert_err)?;

        return read_json(res, UPLOAD_FALLBACK_MESSAGE).await;
    }

    pub async fn query(&self, file_id: &str, user_query: &str) -> Result<Value, GatewayError> {
        tracing::info!(endpoint = "query", file_id, "Forwarding request upstream");

        let form = Form::new()
            .text("file_id", file_id.to_string())
            .text("user_query", user_query.to_string());

        let res = reqwest::Client::new()
            .post(format!("{url}/query/", url = self.url))
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(convert_err)?;

        return read_json(res, QUERY_FALLBACK_MESSAGE).await;
    }
}
