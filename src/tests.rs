use super::*;
use crate::repo::tests::setup_test_db;
use crate::rpa::scripted::ScriptedLauncher;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app() -> Router {
    let state = AppState::new(setup_test_db(), Arc::new(ScriptedLauncher::new()), Duration::from_secs(5));
    create_app(state)
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().uri(uri).method(method);
    let body = match body {
        Some(body) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = app.oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_root_and_health_routes() {
    let app = test_app();

    let (status, body) = send(app.clone(), Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Welcome to Juggernaut Bot API", "status": "online"}));

    let (status, body) = send(app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_plugin_routes() {
    let app = test_app();

    let (status, body) = send(
        app.clone(),
        Method::POST,
        "/plugins/register",
        Some(json!({
            "name": "Mail Reader",
            "description": "Polls a mailbox",
            "version": "1.0.0",
            "endpoints": ["/mail/poll"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "mail_reader");

    let (status, body) = send(app.clone(), Method::GET, "/plugins/mail_reader", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "registered");

    let (status, body) = send(app.clone(), Method::DELETE, "/plugins/mail_reader", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Plugin 'mail_reader' unregistered successfully");

    let (status, body) = send(app, Method::GET, "/plugins/mail_reader", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Plugin with id 'mail_reader' not found");
}

#[tokio::test]
async fn test_rpa_and_gateway_routes_are_mounted() {
    let app = test_app();

    let (status, body) = send(
        app.clone(),
        Method::POST,
        "/rpa/tasks",
        Some(json!({"name": "noop", "description": "does nothing", "steps": []})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"task_id": "task_1", "status": "created"}));

    let (status, body) = send(app.clone(), Method::GET, "/rpa/tasks/task_1/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "created");

    let (status, body) = send(app, Method::GET, "/gateway/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["registered_apis"], "0");
}

#[tokio::test]
async fn test_unsupported_method_returns_json_405() {
    let app = test_app();

    let (status, body) = send(app, Method::PUT, "/plugins", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "Method not allowed");
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let app = test_app();

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://dashboard.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}
