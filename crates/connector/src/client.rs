//! HTTP client for the connector gateway that fronts the proprietary
//! accounting source.
//!
//! The gateway translates window queries into the source's own query
//! language and streams results back as JSON; this client only knows the
//! REST surface and the positional row contract.

use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use async_trait::async_trait;
use ledgersync_core::errors::Result as CoreResult;
use ledgersync_core::ledger::LedgerEntry;
use ledgersync_core::sync::{DateWindow, RemoteRecordSource, CONNECT_TIMEOUT_SECS, QUERY_TIMEOUT_SECS};

use crate::error::{ConnectorError, Result};
use crate::row::decode_row;

const MAX_LOG_BODY_CHARS: usize = 512;

/// Connector gateway endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    pub base_url: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_connect_timeout_secs() -> u64 {
    CONNECT_TIMEOUT_SECS
}

fn default_query_timeout_secs() -> u64 {
    QUERY_TIMEOUT_SECS
}

impl GatewayConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            query_timeout_secs: QUERY_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WindowQueryRequest<'a> {
    connector_ref: &'a str,
    company_id: &'a str,
    /// Inclusive ISO dates.
    from: String,
    to: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WindowQueryResponse {
    rows: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorResponse {
    code: String,
    message: String,
}

/// Client for the connector gateway REST API.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: reqwest::Client,
    query_client: reqwest::Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        // Window queries run minutes on large windows; they get their own
        // deadline instead of the probe timeout.
        let query_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.query_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            query_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("[Gateway] response status: {}", status);
            return;
        }
        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("[Gateway] response error ({}): {}", status, preview);
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(&body) {
                // Driver problems are reported by the gateway as a
                // dedicated code so they classify as config, not transport.
                if error.code == "driver_unavailable" || error.code == "company_file_missing" {
                    return Err(ConnectorError::Driver(error.message));
                }
                return Err(ConnectorError::api(
                    status.as_u16(),
                    format!("{}: {}", error.code, error.message),
                ));
            }
            return Err(ConnectorError::api(
                status.as_u16(),
                format!("Request failed: {}", body),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            ConnectorError::decode(format!("Failed to parse gateway response: {}", e))
        })
    }

    async fn health(&self, connector_ref: &str) -> Result<()> {
        let url = format!("{}/v1/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .headers(Self::headers())
            .query(&[("connectorRef", connector_ref)])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);
        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(&body) {
                if error.code == "driver_unavailable" || error.code == "company_file_missing" {
                    return Err(ConnectorError::Driver(error.message));
                }
                return Err(ConnectorError::api(
                    status.as_u16(),
                    format!("{}: {}", error.code, error.message),
                ));
            }
            return Err(ConnectorError::api(
                status.as_u16(),
                format!("Health check failed: {}", body),
            ));
        }
        Ok(())
    }

    async fn query_window(
        &self,
        connector_ref: &str,
        company_id: &str,
        window: &DateWindow,
    ) -> Result<Vec<LedgerEntry>> {
        let url = format!("{}/v1/query", self.base_url);
        let request = WindowQueryRequest {
            connector_ref,
            company_id,
            from: window.start.format("%Y-%m-%d").to_string(),
            to: window.end.format("%Y-%m-%d").to_string(),
        };

        let response = self
            .query_client
            .post(&url)
            .headers(Self::headers())
            .json(&request)
            .send()
            .await?;
        let parsed: WindowQueryResponse = Self::parse_response(response).await?;

        let mut entries = Vec::with_capacity(parsed.rows.len());
        for row in &parsed.rows {
            entries.push(decode_row(row)?);
        }
        debug!(
            "[Gateway] window {}..{} returned {} rows for company {}",
            window.start,
            window.end,
            entries.len(),
            company_id
        );
        Ok(entries)
    }
}

#[async_trait]
impl RemoteRecordSource for GatewayClient {
    async fn check_connection(&self, connector_ref: &str) -> CoreResult<()> {
        self.health(connector_ref).await?;
        Ok(())
    }

    async fn fetch_window(
        &self,
        connector_ref: &str,
        company_id: &str,
        window: &DateWindow,
    ) -> CoreResult<Vec<LedgerEntry>> {
        Ok(self.query_window(connector_ref, company_id, window).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_strips_trailing_slash_and_defaults_timeouts() {
        let config = GatewayConfig::new("http://gateway.local/");
        assert_eq!(config.base_url, "http://gateway.local");
        assert_eq!(config.connect_timeout_secs, CONNECT_TIMEOUT_SECS);
        assert_eq!(config.query_timeout_secs, QUERY_TIMEOUT_SECS);
    }

    #[test]
    fn config_deserializes_with_defaulted_timeouts() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"baseUrl":"http://gateway.local"}"#).expect("config");
        assert_eq!(config.connect_timeout_secs, CONNECT_TIMEOUT_SECS);
    }

    #[test]
    fn error_payload_with_driver_code_becomes_driver_error() {
        let body = r#"{"code":"driver_unavailable","message":"ODBC driver missing"}"#;
        let parsed: ApiErrorResponse = serde_json::from_str(body).expect("error body");
        assert_eq!(parsed.code, "driver_unavailable");
    }
}
