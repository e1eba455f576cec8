use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::JsonValue;

fn default_auth_required() -> bool {
    true
}

/// One route exposed by an API registered with the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Path relative to the API's base path
    pub path: String,

    /// HTTP methods accepted on the path
    pub methods: Vec<String>,

    pub description: String,

    /// Whether callers must authenticate, defaults to true
    #[serde(default = "default_auth_required")]
    pub auth_required: bool,
}

/// An API registered with the gateway plugin
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::gateway_apis)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GatewayApi {
    id: String,
    name: String,
    base_path: String,

    /// Route list, stored as a JSON array of [`Route`]
    routes: JsonValue,

    rate_limit: Option<JsonValue>,
    auth_config: Option<JsonValue>,
    created_at: NaiveDateTime,
}

impl GatewayApi {
    /// Creates a new gateway API record
    pub fn new(
        id: String,
        name: String,
        base_path: String,
        routes: &[Route],
        rate_limit: Option<serde_json::Value>,
        auth_config: Option<serde_json::Value>,
    ) -> Self {
        // Route is plain data, so this cannot fail
        let routes = serde_json::to_value(routes).unwrap_or_else(|_| serde_json::Value::Array(Vec::new()));
        Self {
            id,
            name,
            base_path,
            routes: JsonValue(routes),
            rate_limit: rate_limit.map(JsonValue),
            auth_config: auth_config.map(JsonValue),
            created_at: Utc::now().naive_utc(),
        }
    }

    pub fn get_id(&self) -> String {
        self.id.clone()
    }

    pub fn get_name(&self) -> String {
        self.name.clone()
    }

    pub fn get_base_path(&self) -> String {
        self.base_path.clone()
    }

    /// Decodes the stored route list
    ///
    /// ### Errors
    ///
    /// Returns an error if the stored JSON is not a list of routes
    pub fn get_routes(&self) -> serde_json::Result<Vec<Route>> {
        serde_json::from_value(self.routes.0.clone())
    }

    pub fn get_rate_limit(&self) -> Option<&JsonValue> {
        self.rate_limit.as_ref()
    }

    pub fn get_auth_config(&self) -> Option<&JsonValue> {
        self.auth_config.as_ref()
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.created_at, Utc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_route_auth_required_defaults_to_true() {
        let route: Route = serde_json::from_value(json!({
            "path": "/invoices",
            "methods": ["GET"],
            "description": "List invoices"
        }))
        .unwrap();
        assert!(route.auth_required);
    }

    #[test]
    fn test_gateway_api_routes_roundtrip() {
        let routes = vec![Route {
            path: "/invoices".to_string(),
            methods: vec!["GET".to_string(), "POST".to_string()],
            description: "Invoices".to_string(),
            auth_required: false,
        }];
        let api = GatewayApi::new(
            "billing".to_string(),
            "Billing".to_string(),
            "/billing".to_string(),
            &routes,
            Some(json!({"per_minute": 60})),
            None,
        );

        assert_eq!(api.get_routes().unwrap(), routes);
        assert_eq!(api.get_rate_limit().unwrap().0["per_minute"], 60);
        assert!(api.get_auth_config().is_none());
    }
}
