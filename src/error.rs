//! Error types. `Display` of each variant is the message shown to the user.

use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

use crate::types::ErrorBody;

/// Failures of a URL reputation lookup.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("URL is required")]
    EmptyUrl,

    #[error("VirusTotal API key not configured on server")]
    NotConfigured,

    #[error("Failed to submit URL to VirusTotal")]
    SubmitFailed,

    #[error("Failed to retrieve analysis results")]
    RetrieveFailed,

    #[error("Request timeout - VirusTotal API took too long to respond")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl From<reqwest::Error> for CheckError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CheckError::Timeout
        } else if e.is_decode() {
            CheckError::Unexpected(e.to_string())
        } else {
            CheckError::Network(e.to_string())
        }
    }
}

impl CheckError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CheckError::EmptyUrl => StatusCode::BAD_REQUEST,
            CheckError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            CheckError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for CheckError {
    fn into_response(self) -> axum::response::Response {
        error_response(self.status_code(), self.to_string())
    }
}

/// Failures while validating a scanned barcode.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Barcode invalid or Expiry Date not found (AI 17).")]
    MissingExpiry,

    #[error("Invalid expiry date: {0}")]
    InvalidDate(String),
}

impl IntoResponse for ScanError {
    fn into_response(self) -> axum::response::Response {
        error_response(StatusCode::BAD_REQUEST, self.to_string())
    }
}

/// Page rendering failed; only a broken template can cause this.
#[derive(Debug, Error)]
#[error("Template error: {0}")]
pub struct RenderError(#[from] pub tera::Error);

impl IntoResponse for RenderError {
    fn into_response(self) -> axum::response::Response {
        tracing::error!("{self}");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
    }
}

/// Failures seen by the HTTP client talking to our own endpoints.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Server answered with an error message (or the caller's fallback).
    #[error("{0}")]
    Server(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response from server: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub(crate) fn error_response(status: StatusCode, error: String) -> axum::response::Response {
    (status, Json(ErrorBody { error })).into_response()
}
