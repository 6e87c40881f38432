use std::time::Duration;

use reqwest::{Method, Url};

/// Base used when nothing else is configured.
pub const LOCAL_API_URL: &str = "http://localhost:3000/api";

/// Base used when the app is served from a production deployment.
pub const PRODUCTION_API_URL: &str = "https://tabularium-backend.vercel.app/api";

/// Hosts ending with this suffix are production deployments.
pub const DEPLOYMENT_HOST_SUFFIX: &str = ".vercel.app";

/// Per-attempt timeout against local or unknown hosts.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Per-attempt timeout against production hosts (serverless cold starts).
pub const PRODUCTION_TIMEOUT: Duration = Duration::from_secs(20);

/// Transport retries after the first attempt.
pub const DEFAULT_RETRIES: u32 = 1;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has an invalid value {value:?}: expected {expected}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Verb tried first when upserting the AKIN profile.
///
/// The other verb is tried once if the backend answers 404 or 405.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpsertMethod {
    #[default]
    Post,
    Put,
}

impl UpsertMethod {
    pub fn method(self) -> Method {
        match self {
            UpsertMethod::Post => Method::POST,
            UpsertMethod::Put => Method::PUT,
        }
    }

    pub fn fallback(self) -> UpsertMethod {
        match self {
            UpsertMethod::Post => UpsertMethod::Put,
            UpsertMethod::Put => UpsertMethod::Post,
        }
    }
}

/// Client configuration.
///
/// Built once (usually from the environment) and handed to
/// [`RequestCore`](crate::request::RequestCore). The base-URL override and the
/// debug flag can later be changed at runtime on the core itself.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Explicit base URL chosen by the caller. Wins over everything else.
    pub base_url_override: Option<String>,
    /// Base URL provided by the environment (`TABULARIUM_API_URL`).
    pub env_base_url: Option<String>,
    /// Host the application is served from, used to detect production.
    pub deploy_host: Option<String>,
    /// Log every attempt and the troubleshooting checklist on failure.
    pub debug: bool,
    /// Per-attempt timeout. `None` picks [`DEFAULT_TIMEOUT`] or
    /// [`PRODUCTION_TIMEOUT`] from the resolved base.
    pub timeout: Option<Duration>,
    /// Transport retries after the first attempt.
    pub retries: u32,
    pub upsert_method: UpsertMethod,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url_override: None,
            env_base_url: None,
            deploy_host: None,
            debug: false,
            timeout: None,
            retries: DEFAULT_RETRIES,
            upsert_method: UpsertMethod::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default |
    /// |-----------------------------|---------|
    /// | `TABULARIUM_API_URL`        | unset   |
    /// | `TABULARIUM_DEPLOY_HOST`    | unset   |
    /// | `TABULARIUM_API_DEBUG`      | `false` |
    /// | `TABULARIUM_API_TIMEOUT_MS` | unset   |
    /// | `TABULARIUM_API_RETRIES`    | `1`     |
    /// | `TABULARIUM_UPSERT_METHOD`  | `POST`  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let debug = match var("TABULARIUM_API_DEBUG") {
            Some(v) => parse_flag(&v).ok_or(ConfigError::Invalid {
                var: "TABULARIUM_API_DEBUG",
                value: v,
                expected: "a boolean (1/0, true/false, yes/no, on/off)",
            })?,
            None => false,
        };

        let timeout = match var("TABULARIUM_API_TIMEOUT_MS") {
            Some(v) => Some(Duration::from_millis(v.trim().parse().map_err(|_| {
                ConfigError::Invalid {
                    var: "TABULARIUM_API_TIMEOUT_MS",
                    value: v.clone(),
                    expected: "a number of milliseconds",
                }
            })?)),
            None => None,
        };

        let retries = match var("TABULARIUM_API_RETRIES") {
            Some(v) => v.trim().parse::<u32>().map_err(|_| ConfigError::Invalid {
                var: "TABULARIUM_API_RETRIES",
                value: v.clone(),
                expected: "a non-negative integer",
            })?,
            None => DEFAULT_RETRIES,
        };

        let upsert_method = match var("TABULARIUM_UPSERT_METHOD") {
            Some(v) => match v.trim().to_ascii_uppercase().as_str() {
                "POST" => UpsertMethod::Post,
                "PUT" => UpsertMethod::Put,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "TABULARIUM_UPSERT_METHOD",
                        value: v,
                        expected: "POST or PUT",
                    })
                }
            },
            None => UpsertMethod::default(),
        };

        Ok(Self {
            base_url_override: None,
            env_base_url: var("TABULARIUM_API_URL"),
            deploy_host: var("TABULARIUM_DEPLOY_HOST"),
            debug,
            timeout,
            retries,
            upsert_method,
        })
    }

    /// Resolve the base URL. First match wins: `runtime_override`, the
    /// configured override, the environment base, the production default
    /// for deployment hosts, then localhost.
    pub fn resolve_base_url(&self, runtime_override: Option<&str>) -> String {
        let explicit = [
            runtime_override,
            self.base_url_override.as_deref(),
            self.env_base_url.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find(|url| !url.trim().is_empty());

        let chosen = match explicit {
            Some(url) => url,
            None if self.deploy_host.as_deref().is_some_and(is_deployment_host) => {
                PRODUCTION_API_URL
            }
            None => LOCAL_API_URL,
        };

        normalize_base_url(chosen)
    }

    /// Per-attempt timeout for calls against `base_url`.
    pub fn timeout_for(&self, base_url: &str) -> Duration {
        self.timeout.unwrap_or_else(|| {
            if targets_production(base_url) {
                PRODUCTION_TIMEOUT
            } else {
                DEFAULT_TIMEOUT
            }
        })
    }
}

/// Normalize a base URL to end with exactly one `/api` and no trailing slash.
pub fn normalize_base_url(raw: &str) -> String {
    let mut base = raw.trim().trim_end_matches('/').to_string();
    while base.ends_with("/api/api") {
        base.truncate(base.len() - "/api".len());
    }
    if !base.ends_with("/api") {
        base.push_str("/api");
    }
    base
}

/// Whether a bare host name (port and scheme tolerated) is a production
/// deployment.
pub fn is_deployment_host(host: &str) -> bool {
    let host = host.trim().to_ascii_lowercase();
    let host = host
        .split_once("://")
        .map_or(host.as_str(), |(_, rest)| rest)
        .split(|c: char| c == '/' || c == ':')
        .next()
        .unwrap_or_default();
    host.ends_with(DEPLOYMENT_HOST_SUFFIX)
}

/// Whether a resolved base URL points at a production deployment.
pub fn targets_production(base_url: &str) -> bool {
    Url::parse(base_url)
        .ok()
        .and_then(|url| url.host_str().map(is_deployment_host))
        .unwrap_or(false)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
