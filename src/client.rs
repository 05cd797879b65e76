//! HTTP client for the service's own JSON endpoints.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ClientError;
use crate::types::{ScanRequest, ScanResult, UrlCheckRequest, UrlCheckResult};
use crate::ui::{CheckBackend, ScanBackend};

pub const CHECK_FALLBACK_ERROR: &str = "Failed to check URL";
pub const SCAN_FALLBACK_ERROR: &str = "Failed to scan barcode";

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// `timeout` must cover the server's own upstream wait.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url: base_url.into().trim_end_matches('/').to_string() })
    }

    pub async fn check_url(&self, url: &str) -> Result<UrlCheckResult, ClientError> {
        self.post("/api/check-url", &UrlCheckRequest { url: url.to_string() }, CHECK_FALLBACK_ERROR)
            .await
    }

    pub async fn scan_barcode(&self, req: &ScanRequest) -> Result<ScanResult, ClientError> {
        self.post("/scan_barcode", req, SCAN_FALLBACK_ERROR).await
    }

    /// POST `body` as JSON; the response body is always parsed as JSON first.
    ///
    /// A non-success status or an `error` field yields [`ClientError::Server`]
    /// carrying that message, or `fallback` when the server gave none.
    async fn post<B, T>(&self, path: &str, body: &B, fallback: &str) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;
        let ok = resp.status().is_success();
        let text = resp.text().await?;
        let value: Value = serde_json::from_str(&text)?;

        let server_error = value.get("error").and_then(Value::as_str).map(str::to_string);
        match (ok, server_error) {
            (_, Some(e)) => Err(ClientError::Server(e)),
            (false, None) => Err(ClientError::Server(fallback.to_string())),
            (true, None) => Ok(serde_json::from_value(value)?),
        }
    }
}

impl CheckBackend for ApiClient {
    type Error = ClientError;

    async fn check_url(&self, url: &str) -> Result<UrlCheckResult, ClientError> {
        ApiClient::check_url(self, url).await
    }
}

impl ScanBackend for ApiClient {
    type Error = ClientError;

    async fn scan_barcode(&self, req: &ScanRequest) -> Result<ScanResult, ClientError> {
        ApiClient::scan_barcode(self, req).await
    }
}
