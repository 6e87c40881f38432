use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde_json::Value;
use tabularium_core::error::CoreError;

/// Every failure a client call can surface.
///
/// `Timeout` and `Transport` mean no HTTP response was obtained and are
/// retried by the request core. `Application` means the server answered with
/// a non-success status; it is never retried and its `Display` is exactly the
/// message the server supplied.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{method} {url} timed out after {}ms", .timeout.as_millis())]
    Timeout {
        method: Method,
        url: String,
        timeout: Duration,
    },

    /// Connection refused, DNS, TLS, reset mid-body, and so on.
    #[error("Network error on {method} {url}: {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{message}")]
    Application {
        status: u16,
        url: String,
        message: String,
        /// Parsed response body: JSON when possible, raw text otherwise.
        body: Value,
    },

    /// A 2xx response whose body does not have the expected shape.
    #[error("Unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: CoreError,
    },

    #[error("Expected a response body from {url} but got none")]
    EmptyBody { url: String },

    #[error("Invalid request URL {url}")]
    InvalidUrl { url: String },

    /// Rejected locally before any request was made.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ApiError {
    /// Whether no HTTP response was obtained.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Timeout { .. } | ApiError::Transport { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Application { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&Value> {
        match self {
            ApiError::Application { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            ApiError::Timeout { url, .. }
            | ApiError::Transport { url, .. }
            | ApiError::Application { url, .. }
            | ApiError::Decode { url, .. }
            | ApiError::EmptyBody { url }
            | ApiError::InvalidUrl { url } => Some(url),
            ApiError::Core(_) => None,
        }
    }
}

/// Build the message for a non-success response.
///
/// Prefers a non-blank `error`, then `message`, then `details` string field
/// of a JSON object body; otherwise `Request failed: <status> <reason>`.
pub fn application_message(status: StatusCode, body: &Value) -> String {
    if let Value::Object(map) = body {
        for key in ["error", "message", "details"] {
            if let Some(Value::String(text)) = map.get(key) {
                if !text.trim().is_empty() {
                    return text.clone();
                }
            }
        }
    }

    match status.canonical_reason() {
        Some(reason) => format!("Request failed: {} {reason}", status.as_u16()),
        None => format!("Request failed: {}", status.as_u16()),
    }
}
