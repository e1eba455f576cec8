//! Common test utilities for Juggernaut integration tests
//!
//! This file contains shared functions for all integration tests: building
//! the application over a fresh database and sending JSON requests to it.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use juggernaut::{
    create_app,
    db::{init_pool, run_migrations, DbPool},
    rpa::{chromium::ChromiumLauncher, BrowserLauncher},
    AppState,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Step timeout used by every test application
pub const TEST_STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Creates a migrated in-memory database
///
/// Plain ":memory:" would give each pooled connection its own database,
/// so every call gets a unique shared-cache URI.
pub fn create_test_pool() -> Arc<DbPool> {
    let database_url = format!("file:it_{}?mode=memory&cache=shared", uuid::Uuid::new_v4());
    let pool = init_pool(&database_url).unwrap();
    run_migrations(&mut pool.get().unwrap()).unwrap();
    Arc::new(pool)
}

/// Creates a migrated database in a temporary directory
///
/// Needed when a background task run writes while the test reads. Keep the
/// directory alive for the whole test.
pub fn create_file_test_pool() -> (Arc<DbPool>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_pool(&dir.path().join("juggernaut.db").to_string_lossy()).unwrap();
    run_migrations(&mut pool.get().unwrap()).unwrap();
    (Arc::new(pool), dir)
}

/// Creates a test application with an in-memory SQLite database
///
/// Uses the real Chromium launcher; tests that execute tasks build their
/// app with [`create_test_app_with`] and a scripted launcher instead.
pub fn create_test_app() -> Router {
    create_test_app_with(create_test_pool(), Arc::new(ChromiumLauncher::default()))
}

/// Creates a test application over the given pool and browser launcher
pub fn create_test_app_with(pool: Arc<DbPool>, launcher: Arc<dyn BrowserLauncher>) -> Router {
    create_app(AppState::new(pool, launcher, TEST_STEP_TIMEOUT))
}

/// Sends a request and returns the status with the decoded JSON body
///
/// An empty body decodes to `Value::Null`.
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().uri(uri).method(method);
    let body = match body {
        Some(body) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

pub async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::DELETE, uri, None).await
}

/// Polls a task's status until it is no longer running
pub async fn wait_until_settled(app: &Router, task_id: &str) -> Value {
    for _ in 0..200 {
        let (status, body) = get(app, &format!("/rpa/tasks/{}/status", task_id)).await;
        assert_eq!(status, StatusCode::OK);
        if body["status"] != "running" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("task {} did not settle", task_id);
}
