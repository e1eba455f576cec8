use crate::db::DbPool;
use crate::models::Plugin;
use crate::schema::plugins;
use diesel::prelude::*;
use anyhow::Result;
use tracing::{instrument, debug, info};

/// Inserts a plugin record
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `plugin` - The plugin to store; its id must be unused
///
/// ### Returns
///
/// A Result containing the stored Plugin
///
/// ### Errors
///
/// Returns an error if:
/// - Unable to get a connection from the pool
/// - The database insert operation fails, including a duplicate id
#[instrument(skip(pool, plugin), fields(plugin_id = %plugin.get_id()))]
pub fn create_plugin(pool: &DbPool, plugin: Plugin) -> Result<Plugin> {
    debug!("Registering plugin");

    let conn = &mut pool.get()?;

    diesel::insert_into(plugins::table)
        .values(&plugin)
        .execute(conn)?;

    info!("Registered plugin {}", plugin.get_id());

    Ok(plugin)
}

/// Retrieves a plugin by id
///
/// ### Returns
///
/// A Result containing an Option with the Plugin if found, or None if not found
#[instrument(skip(pool), fields(plugin_id = %id))]
pub fn get_plugin(pool: &DbPool, id: &str) -> Result<Option<Plugin>> {
    let conn = &mut pool.get()?;

    let result = plugins::table
        .find(id)
        .select(Plugin::as_select())
        .first::<Plugin>(conn)
        .optional()?;

    if result.is_none() {
        debug!("Plugin not found");
    }

    Ok(result)
}

/// Lists all plugins in registration order
#[instrument(skip(pool))]
pub fn list_plugins(pool: &DbPool) -> Result<Vec<Plugin>> {
    let conn = &mut pool.get()?;

    let result = plugins::table
        .order((plugins::created_at.asc(), plugins::id.asc()))
        .select(Plugin::as_select())
        .load::<Plugin>(conn)?;

    debug!("Retrieved {} plugins", result.len());

    Ok(result)
}

/// Deletes a plugin
///
/// ### Returns
///
/// A Result containing true if a plugin was removed, false if none had the id
#[instrument(skip(pool), fields(plugin_id = %id))]
pub fn delete_plugin(pool: &DbPool, id: &str) -> Result<bool> {
    let conn = &mut pool.get()?;

    let deleted = diesel::delete(plugins::table.find(id)).execute(conn)?;

    if deleted > 0 {
        info!("Unregistered plugin {}", id);
    }

    Ok(deleted > 0)
}
