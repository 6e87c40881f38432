//! In-process stub of the Tabularium backend for integration tests.
//!
//! Serves the REST surface under `/api` on an ephemeral port, keeps rows in
//! memory and records every request as `"METHOD /path"` so tests can assert
//! on what actually went over the wire.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::{Path, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use tabularium_client::{ApiClient, ClientConfig};

/// Mutable backend state shared between the stub and the test.
pub struct StubData {
    pub hits: Vec<String>,
    pub library: Vec<Value>,
    pub profile: Option<Value>,
    pub abilities: Vec<Value>,
    pub virtues: Vec<Value>,
    pub flaws: Vec<Value>,
    /// `POST /akin` answers 405 when false.
    pub akin_post_allowed: bool,
    /// Updates answer 204 instead of echoing the row.
    pub empty_updates: bool,
    pub ping_ok: bool,
    /// Library creates wait this long before storing the row.
    pub create_delay: Option<Duration>,
    next_id: u64,
}

impl Default for StubData {
    fn default() -> Self {
        Self {
            hits: Vec::new(),
            library: Vec::new(),
            profile: None,
            abilities: Vec::new(),
            virtues: Vec::new(),
            flaws: Vec::new(),
            akin_post_allowed: true,
            empty_updates: false,
            ping_ok: true,
            create_delay: None,
            next_id: 1,
        }
    }
}

impl StubData {
    fn next_id(&mut self, prefix: &str) -> String {
        let id = format!("{prefix}-{}", self.next_id);
        self.next_id += 1;
        id
    }

    fn collection(&mut self, name: &str) -> Option<&mut Vec<Value>> {
        match name {
            "abilities" => Some(&mut self.abilities),
            "virtues" => Some(&mut self.virtues),
            "flaws" => Some(&mut self.flaws),
            _ => None,
        }
    }
}

#[derive(Clone, Default)]
pub struct StubState(Arc<Mutex<StubData>>);

impl StubState {
    pub fn lock(&self) -> MutexGuard<'_, StubData> {
        self.0.lock().unwrap()
    }
}

/// A running stub backend.
pub struct StubServer {
    /// Base URL including the `/api` prefix.
    pub base_url: String,
    pub state: StubState,
}

impl StubServer {
    pub async fn start() -> Self {
        let state = StubState::default();
        let app = router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}/api"),
            state,
        }
    }

    /// Client configuration pointing at this stub.
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            base_url_override: Some(self.base_url.clone()),
            ..ClientConfig::default()
        }
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(self.config())
    }

    pub fn data(&self) -> MutexGuard<'_, StubData> {
        self.state.lock()
    }

    pub fn hits(&self) -> Vec<String> {
        self.data().hits.clone()
    }

    pub fn hit_count(&self, key: &str) -> usize {
        self.data().hits.iter().filter(|h| *h == key).count()
    }
}

/// A base URL nothing listens on.
pub fn dead_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api")
}

fn router(state: StubState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/_debug/ping-db", get(ping_db))
        .route("/api/library", get(list_library).post(create_library_item))
        .route(
            "/api/library/{id}",
            get(get_library_item)
                .put(update_library_item)
                .delete(delete_library_item),
        )
        .route("/api/akin", get(get_akin).post(post_akin).put(put_akin))
        .route("/api/akin/{collection}", axum::routing::post(create_sub))
        .route(
            "/api/akin/{collection}/{id}",
            axum::routing::put(update_sub).delete(delete_sub),
        )
        .route("/api/slow", get(slow))
        .route("/api/text", get(text))
        .route(
            "/api/echo",
            get(echo).post(echo).put(echo).delete(echo),
        )
        .route("/api/no-content", get(no_content))
        .route("/api/broken", get(broken))
        .route("/api/details", get(details))
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

async fn record(State(state): State<StubState>, request: Request, next: Next) -> Response {
    let key = format!("{} {}", request.method(), request.uri().path());
    state.lock().hits.push(key);
    next.run(request).await
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn merge(row: &mut Value, body: Value) {
    if let (Value::Object(row), Value::Object(body)) = (row, body) {
        for (key, value) in body {
            if key != "id" {
                row.insert(key, value);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn ping_db(State(state): State<StubState>) -> Json<Value> {
    if state.lock().ping_ok {
        Json(json!({ "ok": true, "driver": "stub" }))
    } else {
        Json(json!({ "ok": false, "error": "connection refused" }))
    }
}

// ---------------------------------------------------------------------------
// Library
// ---------------------------------------------------------------------------

async fn list_library(State(state): State<StubState>) -> Json<Value> {
    Json(Value::Array(state.lock().library.clone()))
}

async fn create_library_item(
    State(state): State<StubState>,
    Json(mut body): Json<Value>,
) -> Response {
    let has_title = body
        .get("title")
        .and_then(Value::as_str)
        .is_some_and(|t| !t.trim().is_empty());
    if !has_title {
        return error(StatusCode::BAD_REQUEST, "Title is required");
    }

    let delay = state.lock().create_delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut data = state.lock();
    body["id"] = json!(data.next_id("lib"));
    body["createdAt"] = json!("2024-05-01T12:00:00.000Z");
    body["updatedAt"] = json!("2024-05-01T12:00:00.000Z");
    data.library.push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn get_library_item(State(state): State<StubState>, Path(id): Path<String>) -> Response {
    match state.lock().library.iter().find(|r| r["id"] == id.as_str()) {
        Some(row) => Json(row.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "Item not found"),
    }
}

async fn update_library_item(
    State(state): State<StubState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut data = state.lock();
    let empty = data.empty_updates;
    let Some(row) = data.library.iter_mut().find(|r| r["id"] == id.as_str()) else {
        return error(StatusCode::NOT_FOUND, "Item not found");
    };
    merge(row, body);
    row["updatedAt"] = json!("2024-05-02T08:30:00.000Z");

    if empty {
        StatusCode::NO_CONTENT.into_response()
    } else {
        Json(row.clone()).into_response()
    }
}

async fn delete_library_item(State(state): State<StubState>, Path(id): Path<String>) -> Response {
    let mut data = state.lock();
    let before = data.library.len();
    data.library.retain(|r| r["id"] != id.as_str());
    if data.library.len() == before {
        return error(StatusCode::NOT_FOUND, "Item not found");
    }
    StatusCode::NO_CONTENT.into_response()
}

// ---------------------------------------------------------------------------
// Character sheet
// ---------------------------------------------------------------------------

async fn get_akin(State(state): State<StubState>) -> Json<Value> {
    let data = state.lock();
    Json(json!({
        "profile": data.profile,
        "abilities": data.abilities,
        "virtues": data.virtues,
        "flaws": data.flaws,
    }))
}

fn store_profile(state: &StubState, mut body: Value) -> Value {
    body["id"] = json!("akin");
    body["updatedAt"] = json!("2024-05-03T10:00:00.000Z");
    state.lock().profile = Some(body.clone());
    body
}

async fn post_akin(State(state): State<StubState>, Json(body): Json<Value>) -> Response {
    if !state.lock().akin_post_allowed {
        return error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
    }
    let stored = store_profile(&state, body);
    Json(json!({ "profile": stored })).into_response()
}

async fn put_akin(State(state): State<StubState>, Json(body): Json<Value>) -> Json<Value> {
    Json(store_profile(&state, body))
}

async fn create_sub(
    State(state): State<StubState>,
    Path(collection): Path<String>,
    Json(mut body): Json<Value>,
) -> Response {
    let mut data = state.lock();
    let id = data.next_id(&collection);
    let Some(rows) = data.collection(&collection) else {
        return error(StatusCode::NOT_FOUND, "Unknown collection");
    };
    body["id"] = json!(id);
    rows.push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn update_sub(
    State(state): State<StubState>,
    Path((collection, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let mut data = state.lock();
    let empty = data.empty_updates;
    let Some(rows) = data.collection(&collection) else {
        return error(StatusCode::NOT_FOUND, "Unknown collection");
    };
    let Some(row) = rows.iter_mut().find(|r| r["id"] == id.as_str()) else {
        return error(StatusCode::NOT_FOUND, "Entry not found");
    };
    merge(row, body);

    if empty {
        StatusCode::NO_CONTENT.into_response()
    } else {
        Json(row.clone()).into_response()
    }
}

async fn delete_sub(
    State(state): State<StubState>,
    Path((collection, id)): Path<(String, String)>,
) -> Response {
    let mut data = state.lock();
    let Some(rows) = data.collection(&collection) else {
        return error(StatusCode::NOT_FOUND, "Unknown collection");
    };
    rows.retain(|r| r["id"] != id.as_str());
    StatusCode::NO_CONTENT.into_response()
}

// ---------------------------------------------------------------------------
// Transport behaviour
// ---------------------------------------------------------------------------

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({ "ok": true }))
}

async fn text() -> &'static str {
    "pong"
}

async fn echo(headers: HeaderMap, body: String) -> Json<Value> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Json(json!({ "contentType": content_type, "body": body }))
}

async fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn broken() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response()
}

async fn details() -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "details": "Level must be positive" })),
    )
        .into_response()
}
