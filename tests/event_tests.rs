/// Integration tests for the event bus
///
/// This file contains tests for publishing events over HTTP and receiving
/// them, and registry notifications, on the Server-Sent Events stream.

use axum::{
    body::{Body, Bytes},
    http::{Request, StatusCode},
    Router,
};
use futures::StreamExt;
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

mod common;
use common::*;

/// Opens the SSE stream and returns its body as a byte stream
async fn open_stream(app: &Router) -> impl futures::Stream<Item = Result<Bytes, axum::Error>> + Unpin {
    let request = Request::builder()
        .uri("/events/stream")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
    response.into_body().into_data_stream()
}

/// Reads the next SSE message, skipping keep-alive comments
async fn next_message<S>(stream: &mut S) -> String
where
    S: futures::Stream<Item = Result<Bytes, axum::Error>> + Unpin,
{
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("no SSE message within 5s")
            .expect("stream ended")
            .unwrap();
        let text = String::from_utf8(frame.to_vec()).unwrap();
        if !text.starts_with(':') {
            return text;
        }
    }
}

fn data_line(message: &str) -> Value {
    let data = message
        .lines()
        .find_map(|line| line.strip_prefix("data: "))
        .expect("message has no data line");
    serde_json::from_str(data).unwrap()
}

/// Tests publishing an event with no subscribers
#[tokio::test]
async fn test_publish_event_echoes_event() {
    let app = create_test_app();

    let (status, body) = post(
        &app,
        "/events",
        json!({"event_type": "mail.received", "source": "mail_reader", "data": {"count": 3}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "status": "published",
            "event": {"event_type": "mail.received", "source": "mail_reader", "data": {"count": 3}}
        })
    );
}

#[tokio::test]
async fn test_publish_event_requires_object_data() {
    let app = create_test_app();

    let (status, body) = post(
        &app,
        "/events",
        json!({"event_type": "x", "source": "y", "data": [1, 2]}),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());
}

/// Tests that a body which is not JSON gets the JSON error shape
#[tokio::test]
async fn test_publish_event_malformed_body_returns_json_error() {
    let app = create_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/events")
        .header("content-type", "application/json")
        .body(Body::from("{\"event_type\": "))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].as_str().unwrap().contains("JSON"));
}

/// Tests that an event type with a line break is refused
///
/// This test verifies:
/// 1. The publish answers 400 with a JSON error
/// 2. An open stream keeps delivering later events
#[tokio::test]
async fn test_publish_event_rejects_line_break_in_type() {
    let app = create_test_app();
    let mut stream = open_stream(&app).await;

    for event_type in ["bad\ntype", "bad\rtype"] {
        let (status, body) = post(
            &app,
            "/events",
            json!({"event_type": event_type, "source": "tester", "data": {}}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Event type must not contain line breaks");
    }

    let (status, _) = post(
        &app,
        "/events",
        json!({"event_type": "good.type", "source": "tester", "data": {}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let message = next_message(&mut stream).await;
    assert!(message.contains("event: good.type"));
    assert_eq!(data_line(&message)["source"], "tester");
}

/// Tests that a published event reaches a stream subscriber
///
/// This test verifies:
/// 1. The SSE message is named after the event type
/// 2. The data line carries the event as JSON
#[tokio::test]
async fn test_stream_receives_published_event() {
    let app = create_test_app();
    let mut stream = open_stream(&app).await;

    post(
        &app,
        "/events",
        json!({"event_type": "report.ready", "source": "reporter", "data": {"pages": 12}}),
    )
    .await;

    let message = next_message(&mut stream).await;
    assert!(message.contains("event: report.ready"));
    assert_eq!(
        data_line(&message),
        json!({"event_type": "report.ready", "source": "reporter", "data": {"pages": 12}})
    );
}

/// Tests that registry changes are announced on the stream
#[tokio::test]
async fn test_stream_receives_plugin_registry_events() {
    let app = create_test_app();
    let mut stream = open_stream(&app).await;

    post(
        &app,
        "/plugins/register",
        json!({"name": "Watcher", "description": "d", "version": "1.0", "endpoints": []}),
    )
    .await;
    delete(&app, "/plugins/watcher").await;

    let registered = data_line(&next_message(&mut stream).await);
    assert_eq!(registered["event_type"], "plugin.registered");
    assert_eq!(registered["source"], "plugin_registry");
    assert_eq!(registered["data"]["plugin_id"], "watcher");

    let unregistered = data_line(&next_message(&mut stream).await);
    assert_eq!(unregistered["event_type"], "plugin.unregistered");
    assert_eq!(unregistered["data"]["plugin_id"], "watcher");
}
