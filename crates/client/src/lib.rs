//! HTTP client for the Tabularium REST API.
//!
//! Provides the request core (base-URL resolution, timeouts, retries with
//! backoff, error classification), the typed API facade, view-model stores
//! for the library and the AKIN sheet, and the diagnostic suite.

pub mod api;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod request;
pub mod retry;
pub mod store;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::ApiError;
