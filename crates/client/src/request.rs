//! HTTP request core shared by every facade call.
//!
//! [`RequestCore`] turns one logical REST call into one or more attempts:
//! each attempt is bounded by a timeout, transport failures are retried with
//! [`RetryPolicy`] backoff, and any received non-success status fails the
//! call immediately as [`ApiError::Application`].

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tabularium_core::error::CoreError;
use tokio::sync::RwLock;

use crate::config::ClientConfig;
use crate::error::{application_message, ApiError};
use crate::retry::RetryPolicy;

/// Likely causes printed after a final transport failure in debug mode.
pub const TRANSPORT_CHECKLIST: [&str; 7] = [
    "CORS: the backend must allow this origin, preview deployments included",
    "Wrong URL: the resolved base must point at the backend's /api prefix",
    "Protocol mismatch: an https page cannot call an http backend",
    "DNS/TLS: the host must resolve and present a valid certificate",
    "Cold start: serverless backends can take several seconds to wake up",
    "Ad-block or privacy extensions may block requests to the API host",
    "Timeout too short: raise TABULARIUM_API_TIMEOUT_MS for slow backends",
];

/// Body keys whose values never reach the logs.
const SENSITIVE_KEYS: [&str; 5] = ["password", "token", "secret", "authorization", "apikey"];

/// Logged strings are cut to this many characters.
const MAX_LOGGED_STRING: usize = 200;

/// Per-call overrides of the configured timeout and retry limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
    pub retries: Option<u32>,
}

/// Body of a successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// 204, or a 2xx with nothing in it.
    Empty,
    Json(Value),
    /// A 2xx body that is not valid JSON.
    Text(String),
}

/// A successful response together with the URL that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub url: String,
    pub body: ResponseBody,
}

impl ApiResponse {
    pub fn is_empty(&self) -> bool {
        self.body == ResponseBody::Empty
    }

    /// The body as JSON. Text bodies become JSON strings, empty bodies `null`.
    pub fn into_value(self) -> Value {
        match self.body {
            ResponseBody::Empty => Value::Null,
            ResponseBody::Json(value) => value,
            ResponseBody::Text(text) => Value::String(text),
        }
    }

    /// The body as JSON, failing on empty or non-JSON bodies.
    pub fn into_json(self) -> Result<Value, ApiError> {
        match self.body {
            ResponseBody::Json(value) => Ok(value),
            ResponseBody::Empty => Err(ApiError::EmptyBody { url: self.url }),
            ResponseBody::Text(text) => Err(ApiError::Decode {
                url: self.url,
                source: CoreError::Decode {
                    what: "response body",
                    source: serde::de::Error::custom(format!(
                        "expected JSON, got {} bytes of text",
                        text.len()
                    )),
                },
            }),
        }
    }

    /// Deserialize the body into `T`.
    pub fn decode<T: DeserializeOwned>(self, what: &'static str) -> Result<T, ApiError> {
        self.decode_with(|value| {
            serde_json::from_value(value).map_err(|source| CoreError::Decode { what, source })
        })
    }

    /// Convert the body with `convert`, attaching the URL to any failure.
    pub fn decode_with<T, F>(self, convert: F) -> Result<T, ApiError>
    where
        F: FnOnce(Value) -> Result<T, CoreError>,
    {
        let url = self.url.clone();
        let value = self.into_json()?;
        convert(value).map_err(|source| ApiError::Decode { url, source })
    }
}

/// Values that can change while the client is in use.
#[derive(Debug)]
struct RuntimeSettings {
    base_url_override: Option<String>,
    debug: bool,
}

/// Executes REST calls against the resolved base URL.
pub struct RequestCore {
    http: reqwest::Client,
    config: ClientConfig,
    runtime: RwLock<RuntimeSettings>,
}

impl RequestCore {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_client(http: reqwest::Client, config: ClientConfig) -> Self {
        let runtime = RwLock::new(RuntimeSettings {
            base_url_override: None,
            debug: config.debug,
        });
        Self {
            http,
            config,
            runtime,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The base URL the next call will use.
    pub async fn base_url(&self) -> String {
        let runtime = self.runtime.read().await;
        self.config
            .resolve_base_url(runtime.base_url_override.as_deref())
    }

    /// Point subsequent calls at another backend.
    pub async fn set_base_url(&self, url: impl Into<String>) {
        let url = url.into();
        tracing::info!(base_url = %url, "API base URL overridden");
        self.runtime.write().await.base_url_override = Some(url);
    }

    /// Drop the runtime override and fall back to the configured resolution.
    pub async fn clear_base_url(&self) {
        self.runtime.write().await.base_url_override = None;
    }

    pub async fn debug(&self) -> bool {
        self.runtime.read().await.debug
    }

    pub async fn set_debug(&self, enabled: bool) {
        self.runtime.write().await.debug = enabled;
    }

    pub async fn get(&self, path: &[&str]) -> Result<ApiResponse, ApiError> {
        self.request(Method::GET, path, None, RequestOptions::default())
            .await
    }

    pub async fn post(&self, path: &[&str], body: &Value) -> Result<ApiResponse, ApiError> {
        self.request(Method::POST, path, Some(body), RequestOptions::default())
            .await
    }

    pub async fn put(&self, path: &[&str], body: &Value) -> Result<ApiResponse, ApiError> {
        self.request(Method::PUT, path, Some(body), RequestOptions::default())
            .await
    }

    pub async fn delete(&self, path: &[&str]) -> Result<ApiResponse, ApiError> {
        self.request(Method::DELETE, path, None, RequestOptions::default())
            .await
    }

    /// Execute one logical call.
    ///
    /// `path` is a list of segments under the base URL; each one is
    /// percent-encoded on its own. A body passed with GET or DELETE is not
    /// sent.
    pub async fn request(
        &self,
        method: Method,
        path: &[&str],
        body: Option<&Value>,
        options: RequestOptions,
    ) -> Result<ApiResponse, ApiError> {
        let (base, debug) = {
            let runtime = self.runtime.read().await;
            let base = self
                .config
                .resolve_base_url(runtime.base_url_override.as_deref());
            (base, runtime.debug)
        };

        let url = build_url(&base, path)?;
        let timeout = options
            .timeout
            .unwrap_or_else(|| self.config.timeout_for(&base));
        let policy = RetryPolicy::with_retries(options.retries.unwrap_or(self.config.retries));
        let body = body.filter(|_| method_allows_body(&method));

        let mut attempt = 0u32;
        loop {
            if debug {
                match body {
                    Some(body) => tracing::info!(
                        %method,
                        %url,
                        attempt = attempt + 1,
                        body = %redact(body),
                        "API request",
                    ),
                    None => tracing::info!(%method, %url, attempt = attempt + 1, "API request"),
                }
            } else {
                tracing::debug!(%method, %url, attempt = attempt + 1, "API request");
            }

            let result = self.attempt(&method, &url, body, timeout).await;

            match result {
                Ok(response) => {
                    if debug {
                        tracing::info!(
                            %method,
                            %url,
                            empty = response.is_empty(),
                            "API request succeeded",
                        );
                    }
                    return Ok(response);
                }
                Err(e) if e.is_transport() && attempt < policy.max_retries => {
                    let delay = policy.delay(attempt);
                    tracing::warn!(
                        %method,
                        %url,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "API request failed, retrying",
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transport() {
                        tracing::error!(
                            %method,
                            %url,
                            attempts = attempt + 1,
                            error = %e,
                            "API request failed after all retries",
                        );
                        if debug {
                            for cause in TRANSPORT_CHECKLIST {
                                tracing::warn!("Check: {cause}");
                            }
                        }
                    } else if debug {
                        tracing::info!(
                            %method,
                            %url,
                            status = ?e.status(),
                            error = %e,
                            "API request rejected",
                        );
                    }
                    return Err(e);
                }
            }
        }
    }

    /// One bounded attempt: send, read the whole body, interpret.
    async fn attempt(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&Value>,
        timeout: Duration,
    ) -> Result<ApiResponse, ApiError> {
        let mut builder = self
            .http
            .request(method.clone(), url.clone())
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            // Sets `Content-Type: application/json`.
            builder = builder.json(body);
        }

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status();
            let text = response.text().await?;
            Ok::<_, reqwest::Error>((status, text))
        };

        let (status, text) = match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) if e.is_timeout() => {
                return Err(ApiError::Timeout {
                    method: method.clone(),
                    url: url.to_string(),
                    timeout,
                })
            }
            Ok(Err(source)) => {
                return Err(ApiError::Transport {
                    method: method.clone(),
                    url: url.to_string(),
                    source,
                })
            }
            Err(_elapsed) => {
                return Err(ApiError::Timeout {
                    method: method.clone(),
                    url: url.to_string(),
                    timeout,
                })
            }
        };

        interpret(status, &text, url.as_str())
    }
}

/// Classify a received response.
pub(crate) fn interpret(
    status: StatusCode,
    text: &str,
    url: &str,
) -> Result<ApiResponse, ApiError> {
    if !status.is_success() {
        let body = parse_body(text);
        return Err(ApiError::Application {
            status: status.as_u16(),
            url: url.to_string(),
            message: application_message(status, &body),
            body,
        });
    }

    let body = if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
        ResponseBody::Empty
    } else {
        match serde_json::from_str(text) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(text.to_string()),
        }
    };

    Ok(ApiResponse {
        url: url.to_string(),
        body,
    })
}

/// JSON if possible, raw text otherwise, `null` for nothing.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn method_allows_body(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::DELETE | Method::HEAD)
}

/// Append percent-encoded `segments` to `base`.
pub(crate) fn build_url(base: &str, segments: &[&str]) -> Result<Url, ApiError> {
    let invalid = || ApiError::InvalidUrl {
        url: base.to_string(),
    };
    let mut url = Url::parse(base).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Copy of a request body that is safe to log.
///
/// Values under sensitive keys are masked and long strings are truncated.
pub fn redact(body: &Value) -> Value {
    match body {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    let lowered = key
                        .to_ascii_lowercase()
                        .replace(|c: char| c == '_' || c == '-', "");
                    let value = if SENSITIVE_KEYS.iter().any(|s| lowered.contains(s)) {
                        Value::String("[redacted]".to_string())
                    } else {
                        redact(value)
                    };
                    (key.clone(), value)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        Value::String(text) if text.chars().count() > MAX_LOGGED_STRING => {
            let cut: String = text.chars().take(MAX_LOGGED_STRING).collect();
            Value::String(format!("{cut}… ({} chars)", text.chars().count()))
        }
        other => other.clone(),
    }
}
