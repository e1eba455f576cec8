use juggernaut::dto::{
    ApiAckDto, ApiDto, ApiListDto, CreateTaskDto, PluginResponseDto, PublishEventDto,
    RegisterApiDto, RegisterPluginDto, TaskCreatedDto, TaskDto, TaskListDto, TaskResultDto,
    TaskStatusDto,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Error type for CLI client operations
#[derive(Debug)]
pub enum ClientError {
    /// Server returned an error status with a message body
    Server { status: reqwest::StatusCode, message: String },
    /// Network/connection/request error
    Request(reqwest::Error),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Server { status, message } => {
                write!(f, "Server error ({}): {}", status.as_u16(), message)
            }
            ClientError::Request(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Request(err) => Some(err),
            ClientError::Server { .. } => None,
        }
    }
}

/// Extension trait for checking HTTP responses and extracting server error messages
trait ResponseExt {
    /// Checks for error status and extracts the server's error message body
    async fn check(self) -> Result<reqwest::Response, ClientError>;

    /// Checks the status, then decodes the JSON body
    async fn decode<T: DeserializeOwned>(self) -> Result<T, ClientError>;
}

impl ResponseExt for reqwest::Response {
    async fn check(self) -> Result<reqwest::Response, ClientError> {
        if self.status().is_success() {
            return Ok(self);
        }
        let status = self.status();
        let message = match self.json::<Value>().await {
            Ok(body) => body
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("Unknown error")
                .to_string(),
            Err(_) => format!("HTTP {}", status),
        };
        Err(ClientError::Server { status, message })
    }

    async fn decode<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        self.check().await?.json().await.map_err(ClientError::Request)
    }
}

/// HTTP client wrapper for communicating with a Juggernaut server
pub struct JuggernautClient {
    /// The base URL of the server (e.g. "http://localhost:8080")
    base_url: String,
    /// The underlying HTTP client
    client: Client,
}

impl JuggernautClient {
    /// Creates a new JuggernautClient
    ///
    /// ### Arguments
    ///
    /// * `base_url` - The base URL of the Juggernaut server
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.client
            .get(self.url(path))
            .send()
            .await
            .map_err(ClientError::Request)?
            .decode()
            .await
    }

    async fn post<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(ClientError::Request)?
            .decode()
            .await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .map_err(ClientError::Request)?
            .decode()
            .await
    }

    // ── System endpoints ─────────────────────────────────────────────

    /// Fetches the server health report
    pub async fn health(&self) -> Result<Value, ClientError> {
        self.get("/health").await
    }

    // ── Plugin endpoints ─────────────────────────────────────────────

    /// Lists all registered plugins
    pub async fn list_plugins(&self) -> Result<Vec<PluginResponseDto>, ClientError> {
        self.get("/plugins").await
    }

    /// Registers a plugin
    pub async fn register_plugin(
        &self,
        plugin: &RegisterPluginDto,
    ) -> Result<PluginResponseDto, ClientError> {
        self.post("/plugins/register", plugin).await
    }

    /// Gets a plugin by id
    pub async fn get_plugin(&self, id: &str) -> Result<PluginResponseDto, ClientError> {
        self.get(&format!("/plugins/{}", id)).await
    }

    /// Unregisters a plugin, returning the server's message
    pub async fn unregister_plugin(&self, id: &str) -> Result<String, ClientError> {
        let body: Value = self.delete(&format!("/plugins/{}", id)).await?;
        Ok(body["message"].as_str().unwrap_or_default().to_string())
    }

    // ── Event endpoints ──────────────────────────────────────────────

    /// Publishes an event on the server's bus
    pub async fn publish_event(&self, event: &PublishEventDto) -> Result<Value, ClientError> {
        self.post("/events", event).await
    }

    // ── RPA endpoints ────────────────────────────────────────────────

    /// Creates an RPA task
    pub async fn create_task(&self, task: &CreateTaskDto) -> Result<TaskCreatedDto, ClientError> {
        self.post("/rpa/tasks", task).await
    }

    /// Lists all RPA tasks
    pub async fn list_tasks(&self) -> Result<Vec<TaskDto>, ClientError> {
        let list: TaskListDto = self.get("/rpa/tasks").await?;
        Ok(list.tasks)
    }

    /// Gets an RPA task by id
    pub async fn get_task(&self, id: &str) -> Result<TaskDto, ClientError> {
        self.get(&format!("/rpa/tasks/{}", id)).await
    }

    /// Starts a task run in the background
    pub async fn execute_task(&self, id: &str) -> Result<TaskStatusDto, ClientError> {
        self.client
            .post(self.url(&format!("/rpa/tasks/{}/execute", id)))
            .send()
            .await
            .map_err(ClientError::Request)?
            .decode()
            .await
    }

    /// Gets the execution status of a task
    pub async fn task_status(&self, id: &str) -> Result<TaskStatusDto, ClientError> {
        self.get(&format!("/rpa/tasks/{}/status", id)).await
    }

    /// Gets the outcome of the last finished run of a task
    pub async fn task_result(&self, id: &str) -> Result<TaskResultDto, ClientError> {
        self.get(&format!("/rpa/tasks/{}/result", id)).await
    }

    // ── Gateway endpoints ────────────────────────────────────────────

    /// Registers an API with the gateway
    pub async fn register_api(&self, api: &RegisterApiDto) -> Result<ApiAckDto, ClientError> {
        self.post("/gateway/apis", api).await
    }

    /// Lists all registered APIs
    pub async fn list_apis(&self) -> Result<Vec<ApiDto>, ClientError> {
        let list: ApiListDto = self.get("/gateway/apis").await?;
        Ok(list.apis)
    }

    /// Gets a registered API by id
    pub async fn get_api(&self, id: &str) -> Result<ApiDto, ClientError> {
        self.get(&format!("/gateway/apis/{}", id)).await
    }

    /// Unregisters an API
    pub async fn unregister_api(&self, id: &str) -> Result<ApiAckDto, ClientError> {
        self.delete(&format!("/gateway/apis/{}", id)).await
    }

    /// Fetches the generated documentation for all registered APIs
    pub async fn api_docs(&self) -> Result<Value, ClientError> {
        self.get("/gateway/docs").await
    }

    /// Fetches the gateway health report
    pub async fn gateway_health(&self) -> Result<Value, ClientError> {
        self.get("/gateway/health").await
    }
}
