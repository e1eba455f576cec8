use axum::Json;
use serde_json::{json, Value};

use crate::errors::ApiError;

/// Version reported by the health endpoints
pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Handler for the API root
///
/// This function handles GET requests to `/`.
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "Welcome to Juggernaut Bot API",
        "status": "online"
    }))
}

/// Handler for the liveness check
///
/// This function handles GET requests to `/health`.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": API_VERSION
    }))
}

/// Fallback for known paths hit with an unsupported method
pub async fn method_not_allowed_handler() -> ApiError {
    ApiError::MethodNotAllowed
}
