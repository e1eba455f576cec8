/// Integration tests for the plugin registry
///
/// This file contains tests for registering, listing, fetching and
/// unregistering plugins through the HTTP API, including the error cases.

use axum::http::StatusCode;
use serde_json::{json, Value};

mod common;
use common::*;

fn plugin_body(name: &str) -> Value {
    json!({
        "name": name,
        "description": format!("{} plugin", name),
        "version": "1.2.0",
        "endpoints": ["/run"]
    })
}

/// Tests registering a plugin and reading it back
///
/// This test verifies:
/// 1. The id is derived from the name
/// 2. `enabled` defaults to true
/// 3. GET /plugins/{id} returns the same plugin
#[tokio::test]
async fn test_register_and_get_plugin() {
    let app = create_test_app();

    let (status, plugin) = post(&app, "/plugins/register", plugin_body("Web Scraper")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plugin["id"], "web_scraper");
    assert_eq!(plugin["name"], "Web Scraper");
    assert_eq!(plugin["version"], "1.2.0");
    assert_eq!(plugin["enabled"], true);
    assert_eq!(plugin["status"], "registered");

    let (status, fetched) = get(&app, "/plugins/web_scraper").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, plugin);
}

#[tokio::test]
async fn test_register_disabled_plugin_with_config() {
    let app = create_test_app();

    let mut body = plugin_body("Notifier");
    body["enabled"] = json!(false);
    body["config"] = json!({"channel": "#ops"});

    let (status, plugin) = post(&app, "/plugins/register", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plugin["enabled"], false);
    // Endpoints and config are stored but not echoed
    assert!(plugin.get("config").is_none());
    assert!(plugin.get("endpoints").is_none());
}

/// Tests listing plugins
#[tokio::test]
async fn test_list_plugins() {
    let app = create_test_app();

    let (status, plugins) = get(&app, "/plugins").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plugins, json!([]));

    post(&app, "/plugins/register", plugin_body("Alpha")).await;
    post(&app, "/plugins/register", plugin_body("Beta")).await;

    let (status, plugins) = get(&app, "/plugins").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = plugins
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"alpha"));
    assert!(ids.contains(&"beta"));
}

/// Tests that a second plugin with the same derived id is rejected
#[tokio::test]
async fn test_register_duplicate_plugin_conflicts() {
    let app = create_test_app();

    let (status, _) = post(&app, "/plugins/register", plugin_body("Web Scraper")).await;
    assert_eq!(status, StatusCode::OK);

    // Different spelling, same slug
    let (status, body) = post(&app, "/plugins/register", plugin_body("web scraper")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Plugin with name 'web scraper' already registered");
}

#[tokio::test]
async fn test_register_plugin_with_unusable_name() {
    let app = create_test_app();

    let (status, body) = post(&app, "/plugins/register", plugin_body("ops/tools")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("does not produce a valid id"));
}

#[tokio::test]
async fn test_register_plugin_missing_fields_is_rejected() {
    let app = create_test_app();

    let (status, body) = post(&app, "/plugins/register", json!({"name": "Incomplete"})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("missing field"));
}

/// Tests unregistering a plugin
///
/// This test verifies:
/// 1. DELETE returns the confirmation message
/// 2. The plugin is gone afterwards
/// 3. A second DELETE returns 404
#[tokio::test]
async fn test_unregister_plugin() {
    let app = create_test_app();
    post(&app, "/plugins/register", plugin_body("Reporter")).await;

    let (status, body) = delete(&app, "/plugins/reporter").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Plugin 'reporter' unregistered successfully"}));

    let (status, _) = get(&app, "/plugins/reporter").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = delete(&app, "/plugins/reporter").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Plugin with id 'reporter' not found");
}

/// Tests that a name can be registered again after unregistering it
#[tokio::test]
async fn test_reregister_after_unregister() {
    let app = create_test_app();

    post(&app, "/plugins/register", plugin_body("Cycler")).await;
    delete(&app, "/plugins/cycler").await;

    let (status, plugin) = post(&app, "/plugins/register", plugin_body("Cycler")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plugin["id"], "cycler");
}
