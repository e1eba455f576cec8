use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::extract::WithRejection;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{instrument, debug, info};

use crate::db::DbPool;
use crate::dto::{ApiAckDto, ApiDocDto, ApiDto, ApiListDto, RegisterApiDto};
use crate::errors::ApiError;
use crate::models::{is_usable_slug, slug_id, GatewayApi};
use crate::repo;

use super::{is_unique_violation, JsonBody};
use super::system_handlers::API_VERSION;

fn api_not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("API with id '{}' not found", id))
}

fn to_dto(api: &GatewayApi) -> Result<ApiDto, ApiError> {
    ApiDto::try_from(api).map_err(|e| ApiError::Database(e.into()))
}

/// Handler for registering an API with the gateway
///
/// This function handles POST requests to `/gateway/apis`.
///
/// ### Returns
///
/// An acknowledgement with the derived id, 409 if the id is taken, or 400
/// if the name yields no usable id
#[instrument(skip(pool, payload), fields(name = %payload.name, base_path = %payload.base_path))]
pub async fn register_api_handler(
    State(pool): State<Arc<DbPool>>,
    WithRejection(Json(payload), _): JsonBody<RegisterApiDto>,
) -> Result<Json<ApiAckDto>, ApiError> {
    let id = slug_id(&payload.name);
    if !is_usable_slug(&id) {
        return Err(ApiError::BadRequest(format!(
            "API name '{}' does not produce a valid id",
            payload.name
        )));
    }

    let conflict = || ApiError::Conflict(format!("API with name '{}' already registered", payload.name));

    if repo::get_api(&pool, &id).map_err(ApiError::Database)?.is_some() {
        debug!("API {} already registered", id);
        return Err(conflict());
    }

    let api = GatewayApi::new(
        id,
        payload.name.clone(),
        payload.base_path.clone(),
        &payload.routes,
        payload.rate_limit.clone(),
        payload.auth_config.clone(),
    );
    let api = match repo::create_api(&pool, api) {
        Ok(api) => api,
        Err(e) if is_unique_violation(&e) => return Err(conflict()),
        Err(e) => return Err(ApiError::Database(e)),
    };

    Ok(Json(ApiAckDto {
        api_id: api.get_id(),
        status: "registered".to_string(),
        message: format!("API '{}' registered successfully", api.get_name()),
    }))
}

/// Handler for listing registered APIs
///
/// This function handles GET requests to `/gateway/apis`.
#[instrument(skip(pool))]
pub async fn list_apis_handler(
    State(pool): State<Arc<DbPool>>,
) -> Result<Json<ApiListDto>, ApiError> {
    let apis = repo::list_apis(&pool)
        .map_err(ApiError::Database)?;

    let apis = apis.iter().map(to_dto).collect::<Result<Vec<_>, _>>()?;

    Ok(Json(ApiListDto { apis }))
}

/// Handler for retrieving one registered API
///
/// This function handles GET requests to `/gateway/apis/{id}`.
#[instrument(skip(pool), fields(api_id = %id))]
pub async fn get_api_handler(
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<String>,
) -> Result<Json<ApiDto>, ApiError> {
    let api = repo::get_api(&pool, &id)
        .map_err(ApiError::Database)?
        .ok_or_else(|| api_not_found(&id))?;

    Ok(Json(to_dto(&api)?))
}

/// Handler for unregistering an API
///
/// This function handles DELETE requests to `/gateway/apis/{id}`.
#[instrument(skip(pool), fields(api_id = %id))]
pub async fn unregister_api_handler(
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<String>,
) -> Result<Json<ApiAckDto>, ApiError> {
    let api = repo::delete_api(&pool, &id)
        .map_err(ApiError::Database)?
        .ok_or_else(|| api_not_found(&id))?;

    info!("Unregistered API {}", id);

    Ok(Json(ApiAckDto {
        api_id: id,
        status: "unregistered".to_string(),
        message: format!("API '{}' unregistered successfully", api.get_name()),
    }))
}

/// Handler for the combined route documentation
///
/// This function handles GET requests to `/gateway/docs`, keyed by API id.
#[instrument(skip(pool))]
pub async fn api_docs_handler(
    State(pool): State<Arc<DbPool>>,
) -> Result<Json<Value>, ApiError> {
    let apis = repo::list_apis(&pool)
        .map_err(ApiError::Database)?;

    let mut docs = BTreeMap::new();
    for api in &apis {
        let dto = to_dto(api)?;
        docs.insert(
            dto.id,
            ApiDocDto {
                name: dto.name,
                base_path: dto.base_path,
                routes: dto.routes,
            },
        );
    }

    Ok(Json(json!({ "api_documentation": docs })))
}

/// Handler for the gateway health check
///
/// This function handles GET requests to `/gateway/health`.
#[instrument(skip(pool))]
pub async fn gateway_health_handler(
    State(pool): State<Arc<DbPool>>,
) -> Result<Json<Value>, ApiError> {
    let count = repo::count_apis(&pool)
        .map_err(ApiError::Database)?;

    Ok(Json(json!({
        "status": "healthy",
        "version": API_VERSION,
        "registered_apis": count.to_string()
    })))
}
