use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::extract::WithRejection;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{instrument, debug, info};

use crate::db::DbPool;
use crate::dto::{PluginResponseDto, RegisterPluginDto};
use crate::errors::ApiError;
use crate::events::EventBus;
use crate::models::{is_usable_slug, slug_id, Event, Plugin};
use crate::repo;

use super::{is_unique_violation, JsonBody};

/// Source name on events published by the plugin registry
pub const PLUGIN_EVENT_SOURCE: &str = "plugin_registry";

/// Handler for registering a plugin
///
/// This function handles POST requests to `/plugins/register`.
///
/// ### Arguments
///
/// * `pool` - The database connection pool
/// * `events` - The event bus that announces the registration
/// * `payload` - The plugin definition; its id is derived from the name
///
/// ### Returns
///
/// The registered plugin as JSON, 409 if the id is taken, or 400 if the
/// name yields no usable id
#[instrument(skip(pool, events, payload), fields(name = %payload.name))]
pub async fn register_plugin_handler(
    // Extract the database pool from the application state
    State(pool): State<Arc<DbPool>>,
    State(events): State<EventBus>,
    // Extract and deserialize the JSON request body
    WithRejection(Json(payload), _): JsonBody<RegisterPluginDto>,
) -> Result<Json<PluginResponseDto>, ApiError> {
    let id = slug_id(&payload.name);
    if !is_usable_slug(&id) {
        return Err(ApiError::BadRequest(format!(
            "Plugin name '{}' does not produce a valid id",
            payload.name
        )));
    }

    let conflict = || ApiError::Conflict(format!("Plugin with name '{}' already registered", payload.name));

    if repo::get_plugin(&pool, &id).map_err(ApiError::Database)?.is_some() {
        debug!("Plugin {} already registered", id);
        return Err(conflict());
    }

    let plugin = Plugin::new(
        id,
        payload.name.clone(),
        payload.description.clone(),
        payload.version.clone(),
        payload.enabled,
        payload.endpoints.clone(),
        payload.config.clone(),
    );
    let plugin = match repo::create_plugin(&pool, plugin) {
        Ok(plugin) => plugin,
        Err(e) if is_unique_violation(&e) => return Err(conflict()),
        Err(e) => return Err(ApiError::Database(e)),
    };

    events.publish(Event::new(
        "plugin.registered",
        PLUGIN_EVENT_SOURCE,
        json!({"plugin_id": plugin.get_id(), "name": plugin.get_name()}),
    ));

    info!("Successfully registered plugin with id: {}", plugin.get_id());

    Ok(Json(PluginResponseDto::from(&plugin)))
}

/// Handler for listing all plugins
///
/// This function handles GET requests to `/plugins`.
#[instrument(skip(pool))]
pub async fn list_plugins_handler(
    State(pool): State<Arc<DbPool>>,
) -> Result<Json<Vec<PluginResponseDto>>, ApiError> {
    let plugins = repo::list_plugins(&pool)
        .map_err(ApiError::Database)?;

    Ok(Json(plugins.iter().map(PluginResponseDto::from).collect()))
}

/// Handler for retrieving a specific plugin
///
/// This function handles GET requests to `/plugins/{id}`.
///
/// ### Returns
///
/// The plugin as JSON, or 404 if no plugin has that id
#[instrument(skip(pool), fields(plugin_id = %id))]
pub async fn get_plugin_handler(
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<String>,
) -> Result<Json<PluginResponseDto>, ApiError> {
    let plugin = repo::get_plugin(&pool, &id)
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::NotFound(format!("Plugin with id '{}' not found", id)))?;

    Ok(Json(PluginResponseDto::from(&plugin)))
}

/// Handler for unregistering a plugin
///
/// This function handles DELETE requests to `/plugins/{id}`.
#[instrument(skip(pool, events), fields(plugin_id = %id))]
pub async fn unregister_plugin_handler(
    State(pool): State<Arc<DbPool>>,
    State(events): State<EventBus>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let removed = repo::delete_plugin(&pool, &id)
        .map_err(ApiError::Database)?;
    if !removed {
        return Err(ApiError::NotFound(format!("Plugin with id '{}' not found", id)));
    }

    events.publish(Event::new(
        "plugin.unregistered",
        PLUGIN_EVENT_SOURCE,
        json!({"plugin_id": id}),
    ));

    info!("Unregistered plugin {}", id);

    Ok(Json(json!({
        "message": format!("Plugin '{}' unregistered successfully", id)
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::json_body;
    use crate::repo::tests::setup_test_db;

    fn register_dto(name: &str) -> RegisterPluginDto {
        serde_json::from_value(json!({
            "name": name,
            "description": "Reads scanned documents",
            "version": "0.3.0",
            "endpoints": ["/ocr/scan"]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_register_plugin_handler() {
        let pool = setup_test_db();
        let events = EventBus::default();
        let mut rx = events.subscribe();

        let result = register_plugin_handler(
            State(pool.clone()),
            State(events.clone()),
            json_body(register_dto("Document OCR")),
        )
        .await
        .unwrap();

        assert_eq!(result.0.id, "document_ocr");
        assert_eq!(result.0.status, "registered");
        assert!(result.0.enabled);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, "plugin.registered");
        assert_eq!(event.data["plugin_id"], "document_ocr");

        let stored = repo::get_plugin(&pool, "document_ocr").unwrap().unwrap();
        assert_eq!(stored.get_endpoints(), vec!["/ocr/scan".to_string()]);
    }

    #[tokio::test]
    async fn test_register_plugin_handler_conflict() {
        let pool = setup_test_db();
        let events = EventBus::default();

        register_plugin_handler(State(pool.clone()), State(events.clone()), json_body(register_dto("OCR")))
            .await
            .unwrap();
        let err = register_plugin_handler(State(pool.clone()), State(events.clone()), json_body(register_dto("ocr")))
            .await
            .unwrap_err();

        match err {
            ApiError::Conflict(msg) => assert_eq!(msg, "Plugin with name 'ocr' already registered"),
            other => panic!("Expected Conflict error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_plugin_handler_rejects_unusable_name() {
        let pool = setup_test_db();

        let err = register_plugin_handler(State(pool.clone()), State(EventBus::default()), json_body(register_dto("")))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)), "Expected BadRequest error, got {:?}", err);

        let err = register_plugin_handler(State(pool.clone()), State(EventBus::default()), json_body(register_dto("a/b")))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_get_and_list_plugins_handlers() {
        let pool = setup_test_db();
        let events = EventBus::default();
        register_plugin_handler(State(pool.clone()), State(events.clone()), json_body(register_dto("OCR")))
            .await
            .unwrap();

        let plugin = get_plugin_handler(State(pool.clone()), Path("ocr".to_string()))
            .await
            .unwrap();
        assert_eq!(plugin.0.name, "OCR");

        let plugins = list_plugins_handler(State(pool.clone())).await.unwrap();
        assert_eq!(plugins.0.len(), 1);

        let err = get_plugin_handler(State(pool.clone()), Path("missing".to_string()))
            .await
            .unwrap_err();
        match err {
            ApiError::NotFound(msg) => assert_eq!(msg, "Plugin with id 'missing' not found"),
            other => panic!("Expected NotFound error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unregister_plugin_handler() {
        let pool = setup_test_db();
        let events = EventBus::default();
        register_plugin_handler(State(pool.clone()), State(events.clone()), json_body(register_dto("OCR")))
            .await
            .unwrap();
        let mut rx = events.subscribe();

        let result = unregister_plugin_handler(State(pool.clone()), State(events.clone()), Path("ocr".to_string()))
            .await
            .unwrap();
        assert_eq!(result.0["message"], "Plugin 'ocr' unregistered successfully");
        assert_eq!(rx.recv().await.unwrap().event_type, "plugin.unregistered");

        let err = unregister_plugin_handler(State(pool.clone()), State(events), Path("ocr".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
