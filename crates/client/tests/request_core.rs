//! Integration tests for the request core against the stub backend.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use reqwest::Method;
use serde_json::{json, Value};
use tabularium_client::config::ClientConfig;
use tabularium_client::error::ApiError;
use tabularium_client::request::{RequestCore, RequestOptions, ResponseBody};

use common::{dead_base_url, StubServer};

fn core(server: &StubServer) -> RequestCore {
    RequestCore::new(server.config())
}

// ---------------------------------------------------------------------------
// Test: trailing slash on the override is normalized away
// ---------------------------------------------------------------------------

#[tokio::test]
async fn override_with_trailing_slash_reaches_api() {
    let server = StubServer::start().await;
    let core = RequestCore::new(ClientConfig {
        base_url_override: Some(format!("{}/", server.base_url)),
        ..ClientConfig::default()
    });

    assert_eq!(core.base_url().await, server.base_url);
    let response = core.get(&["health"]).await.unwrap();
    assert_eq!(response.into_value(), json!({ "status": "ok" }));
    assert_eq!(server.hits(), vec!["GET /api/health"]);
}

// ---------------------------------------------------------------------------
// Test: JSON content type on writes, no body on GET/DELETE
// ---------------------------------------------------------------------------

#[tokio::test]
async fn writes_send_json_and_reads_send_no_body() {
    let server = StubServer::start().await;
    let core = core(&server);
    let body = json!({ "title": "X" });

    let echoed = core.post(&["echo"], &body).await.unwrap().into_json().unwrap();
    assert_eq!(echoed["contentType"], "application/json");
    assert_eq!(
        serde_json::from_str::<Value>(echoed["body"].as_str().unwrap()).unwrap(),
        body
    );

    for method in [Method::GET, Method::DELETE] {
        let echoed = core
            .request(method, &["echo"], Some(&body), RequestOptions::default())
            .await
            .unwrap()
            .into_json()
            .unwrap();
        assert_eq!(echoed["contentType"], Value::Null);
        assert_eq!(echoed["body"], "");
    }
}

// ---------------------------------------------------------------------------
// Test: success body shapes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn no_content_resolves_to_empty() {
    let server = StubServer::start().await;
    let response = core(&server).get(&["no-content"]).await.unwrap();
    assert_eq!(response.body, ResponseBody::Empty);
}

#[tokio::test]
async fn plain_text_success_is_kept_as_text() {
    let server = StubServer::start().await;
    let response = core(&server).get(&["text"]).await.unwrap();
    assert_eq!(response.body, ResponseBody::Text("pong".into()));
}

// ---------------------------------------------------------------------------
// Test: application errors are surfaced once, never retried
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bad_request_is_not_retried_and_keeps_server_message() {
    let server = StubServer::start().await;
    let core = RequestCore::new(ClientConfig {
        retries: 3,
        ..server.config()
    });

    let err = core.post(&["library"], &json!({})).await.unwrap_err();

    assert_eq!(err.to_string(), "Title is required");
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.body(), Some(&json!({ "error": "Title is required" })));
    let expected_url = format!("{}/library", server.base_url);
    assert_matches!(&err, ApiError::Application { url, .. } if *url == expected_url);
    assert_eq!(server.hit_count("POST /api/library"), 1);
}

#[tokio::test]
async fn server_error_with_text_body_uses_status_message() {
    let server = StubServer::start().await;
    let core = RequestCore::new(ClientConfig {
        retries: 2,
        ..server.config()
    });

    let err = core.get(&["broken"]).await.unwrap_err();

    assert_eq!(err.to_string(), "Request failed: 500 Internal Server Error");
    assert_eq!(err.body(), Some(&Value::String("upstream exploded".into())));
    assert_eq!(server.hit_count("GET /api/broken"), 1);
}

#[tokio::test]
async fn details_field_is_used_when_no_error_or_message() {
    let server = StubServer::start().await;
    let err = core(&server).get(&["details"]).await.unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert_eq!(err.to_string(), "Level must be positive");
}

// ---------------------------------------------------------------------------
// Test: transport failures are retried up to the limit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn timeouts_are_retried_then_reported() {
    let server = StubServer::start().await;
    let core = core(&server);

    let err = core
        .request(
            Method::GET,
            &["slow"],
            None,
            RequestOptions {
                timeout: Some(Duration::from_millis(100)),
                retries: Some(2),
            },
        )
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ApiError::Timeout { timeout, .. } if timeout == Duration::from_millis(100)
    );
    assert_eq!(server.hit_count("GET /api/slow"), 3);
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    let core = RequestCore::new(ClientConfig {
        base_url_override: Some(dead_base_url()),
        retries: 1,
        ..ClientConfig::default()
    });

    let err = core.get(&["health"]).await.unwrap_err();

    assert!(err.is_transport());
    assert_eq!(err.status(), None);
    assert_matches!(err, ApiError::Transport { .. });
}

// ---------------------------------------------------------------------------
// Test: runtime reconfiguration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn runtime_override_wins_until_cleared() {
    let server = StubServer::start().await;
    let core = RequestCore::new(ClientConfig {
        env_base_url: Some(dead_base_url()),
        retries: 0,
        ..ClientConfig::default()
    });

    core.set_base_url(format!("{}/api", server.base_url)).await;
    assert_eq!(core.base_url().await, server.base_url);
    core.get(&["health"]).await.unwrap();

    core.clear_base_url().await;
    assert!(core.get(&["health"]).await.unwrap_err().is_transport());
    assert_eq!(server.hit_count("GET /api/health"), 1);
}

#[tokio::test]
async fn debug_mode_does_not_change_outcomes() {
    let server = StubServer::start().await;
    let core = core(&server);
    core.set_debug(true).await;
    assert!(core.debug().await);

    let ok = core.post(&["echo"], &json!({ "password": "hunter2" })).await;
    assert!(ok.is_ok());
    let err = core.post(&["library"], &json!({ "title": " " })).await.unwrap_err();
    assert_eq!(err.to_string(), "Title is required");
}

// ---------------------------------------------------------------------------
// Test: path segments are percent-encoded
// ---------------------------------------------------------------------------

#[tokio::test]
async fn identifiers_are_encoded_as_single_segments() {
    let server = StubServer::start().await;
    let err = core(&server)
        .get(&["library", "a b/c"])
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(server.hits(), vec!["GET /api/library/a%20b%2Fc"]);
}
