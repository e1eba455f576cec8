/// Juggernaut: a plugin-based automation bot server
///
/// This library provides the core of the bot: a plugin registry, an
/// in-process event bus, a browser automation (RPA) plugin and an API
/// gateway registry, all served over a JSON web API.
///
/// ### Modules
///
/// - `config`: Layered configuration (defaults, config file, environment, flags)
/// - `db`: Database connection management and migrations
/// - `events`: Broadcast event bus
/// - `manifest`: Dependency manifest parsing and checking
/// - `models`: Data structures for registry records, tasks and events
/// - `repo`: Repository layer for database operations
/// - `rpa`: Browser sessions and the task runner
/// - `schema`: Database schema definitions
///
/// ### Web API
///
/// - `GET /`, `GET /health`: Liveness
/// - `POST /plugins/register`, `GET /plugins`, `GET|DELETE /plugins/{id}`: Plugin registry
/// - `POST /events`, `GET /events/stream`: Event publishing and SSE stream
/// - `/rpa/tasks...`: Creating, executing and inspecting RPA tasks
/// - `/gateway/...`: API registrations, docs and health

/// Configuration module
pub mod config;

/// Database connection module
pub mod db;

/// Data transfer objects module
pub mod dto;

/// Error handling module
pub mod errors;

/// Event bus module
pub mod events;

/// Web API handlers module
pub mod handlers;

/// Dependency manifest module
pub mod manifest;

/// Data models module
pub mod models;

/// Repository module for database operations
pub mod repo;

/// Browser automation module
pub mod rpa;

/// Database schema module
pub mod schema;

use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use db::DbPool;
use events::EventBus;
use rpa::{BrowserLauncher, TaskRunner};

/// Shared state handed to every handler
///
/// Handlers extract the parts they need (`State<Arc<DbPool>>`,
/// `State<EventBus>`, `State<TaskRunner>`) through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<DbPool>,
    pub events: EventBus,
    pub runner: TaskRunner,
}

impl AppState {
    /// Wires the pool, a fresh event bus and a task runner together
    ///
    /// ### Arguments
    ///
    /// * `pool` - The database connection pool
    /// * `launcher` - Starts a browser for every task run
    /// * `step_timeout` - Upper bound for a single browser step
    pub fn new(pool: Arc<DbPool>, launcher: Arc<dyn BrowserLauncher>, step_timeout: Duration) -> Self {
        let events = EventBus::default();
        let runner = TaskRunner::new(Arc::clone(&pool), launcher, events.clone(), step_timeout);
        Self { pool, events, runner }
    }
}

impl FromRef<AppState> for Arc<DbPool> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.pool)
    }
}

impl FromRef<AppState> for EventBus {
    fn from_ref(state: &AppState) -> Self {
        state.events.clone()
    }
}

impl FromRef<AppState> for TaskRunner {
    fn from_ref(state: &AppState) -> Self {
        state.runner.clone()
    }
}

/// Creates the application router with all routes configured
///
/// This function sets up the Axum router with all the API endpoints.
///
/// ### Arguments
///
/// * `state` - The shared application state
///
/// ### Returns
///
/// An Axum Router configured with all routes, permissive CORS and the state
pub fn create_app(state: AppState) -> Router {
    Router::new()
        // Liveness
        .route("/", get(handlers::root_handler))
        .route("/health", get(handlers::health_handler))
        // Plugin registry
        .route("/plugins", get(handlers::list_plugins_handler))
        .route("/plugins/register", post(handlers::register_plugin_handler))
        .route(
            "/plugins/{id}",
            get(handlers::get_plugin_handler).delete(handlers::unregister_plugin_handler),
        )
        // Event bus
        .route("/events", post(handlers::publish_event_handler))
        .route("/events/stream", get(handlers::event_stream_handler))
        .merge(rpa_routes())
        .merge(gateway_routes())
        // Known paths with an unsupported method answer 405 in the JSON error shape
        .method_not_allowed_fallback(handlers::method_not_allowed_handler)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        // Add the application state
        .with_state(state)
}

fn rpa_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/rpa/tasks",
            post(handlers::create_task_handler).get(handlers::list_tasks_handler),
        )
        .route("/rpa/tasks/{id}", get(handlers::get_task_handler))
        .route("/rpa/tasks/{id}/execute", post(handlers::execute_task_handler))
        .route("/rpa/tasks/{id}/status", get(handlers::task_status_handler))
        .route("/rpa/tasks/{id}/result", get(handlers::task_result_handler))
}

fn gateway_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/gateway/apis",
            post(handlers::register_api_handler).get(handlers::list_apis_handler),
        )
        .route(
            "/gateway/apis/{id}",
            get(handlers::get_api_handler).delete(handlers::unregister_api_handler),
        )
        .route("/gateway/docs", get(handlers::api_docs_handler))
        .route("/gateway/health", get(handlers::gateway_health_handler))
}

#[cfg(test)]
mod tests;
