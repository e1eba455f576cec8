use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::JsonValue;

/// A plugin registered with the bot
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::plugins)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Plugin {
    /// Slug derived from the plugin name
    id: String,

    /// Display name as registered
    name: String,

    description: String,

    /// Plugin version string, not interpreted
    version: String,

    /// Whether the plugin is enabled
    enabled: bool,

    /// Endpoint paths the plugin exposes, stored as a JSON array
    endpoints: JsonValue,

    /// Free-form configuration object
    config: JsonValue,

    /// When the plugin was registered
    created_at: NaiveDateTime,
}

impl Plugin {
    /// Creates a new plugin record
    ///
    /// ### Arguments
    ///
    /// * `id` - The registry id (see [`super::slug_id`])
    /// * `name` - The display name
    /// * `description` - What the plugin does
    /// * `version` - The plugin's own version
    /// * `enabled` - Whether the plugin starts enabled
    /// * `endpoints` - Paths the plugin serves
    /// * `config` - Plugin configuration
    pub fn new(
        id: String,
        name: String,
        description: String,
        version: String,
        enabled: bool,
        endpoints: Vec<String>,
        config: serde_json::Value,
    ) -> Self {
        Self {
            id,
            name,
            description,
            version,
            enabled,
            endpoints: JsonValue(serde_json::Value::from(endpoints)),
            config: JsonValue(config),
            created_at: Utc::now().naive_utc(),
        }
    }

    pub fn get_id(&self) -> String {
        self.id.clone()
    }

    pub fn get_name(&self) -> String {
        self.name.clone()
    }

    pub fn get_description(&self) -> String {
        self.description.clone()
    }

    pub fn get_version(&self) -> String {
        self.version.clone()
    }

    pub fn get_enabled(&self) -> bool {
        self.enabled
    }

    /// Gets the endpoint list
    ///
    /// Non-string entries are skipped.
    pub fn get_endpoints(&self) -> Vec<String> {
        self.endpoints
            .0
            .as_array()
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_config(&self) -> &JsonValue {
        &self.config
    }

    /// Gets the registration timestamp as a DateTime<Utc>
    pub fn get_created_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.created_at, Utc)
    }
}
