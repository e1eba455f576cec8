use crate::db::DbPool;
use crate::models::GatewayApi;
use crate::schema::gateway_apis;
use diesel::prelude::*;
use anyhow::Result;
use tracing::{instrument, debug, info};

/// Inserts an API registration
///
/// ### Errors
///
/// Returns an error if:
/// - Unable to get a connection from the pool
/// - The insert fails, including a duplicate id
#[instrument(skip(pool, api), fields(api_id = %api.get_id()))]
pub fn create_api(pool: &DbPool, api: GatewayApi) -> Result<GatewayApi> {
    let conn = &mut pool.get()?;

    diesel::insert_into(gateway_apis::table)
        .values(&api)
        .execute(conn)?;

    info!("Registered API {} at {}", api.get_id(), api.get_base_path());

    Ok(api)
}

/// Retrieves an API registration by id
#[instrument(skip(pool), fields(api_id = %id))]
pub fn get_api(pool: &DbPool, id: &str) -> Result<Option<GatewayApi>> {
    let conn = &mut pool.get()?;

    let result = gateway_apis::table
        .find(id)
        .select(GatewayApi::as_select())
        .first::<GatewayApi>(conn)
        .optional()?;

    Ok(result)
}

/// Lists all API registrations in registration order
#[instrument(skip(pool))]
pub fn list_apis(pool: &DbPool) -> Result<Vec<GatewayApi>> {
    let conn = &mut pool.get()?;

    let result = gateway_apis::table
        .order((gateway_apis::created_at.asc(), gateway_apis::id.asc()))
        .select(GatewayApi::as_select())
        .load::<GatewayApi>(conn)?;

    debug!("Retrieved {} APIs", result.len());

    Ok(result)
}

/// Counts API registrations
pub fn count_apis(pool: &DbPool) -> Result<i64> {
    let conn = &mut pool.get()?;
    let count = gateway_apis::table.count().get_result(conn)?;
    Ok(count)
}

/// Deletes an API registration
///
/// ### Returns
///
/// The removed registration, or None if no API had the id
#[instrument(skip(pool), fields(api_id = %id))]
pub fn delete_api(pool: &DbPool, id: &str) -> Result<Option<GatewayApi>> {
    let conn = &mut pool.get()?;

    let removed = diesel::delete(gateway_apis::table.find(id))
        .returning(GatewayApi::as_returning())
        .get_result::<GatewayApi>(conn)
        .optional()?;

    if removed.is_some() {
        info!("Unregistered API {}", id);
    }

    Ok(removed)
}
