use serde::{Deserialize, Serialize};

use crate::models::{GatewayApi, Plugin, Route, RpaTask, TaskResult, TaskState};

fn default_enabled() -> bool {
    true
}

/// Data transfer object for registering a plugin
///
/// This struct is used to deserialize JSON requests to `/plugins/register`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterPluginDto {
    /// Display name; the plugin id is derived from it
    pub name: String,

    pub description: String,

    pub version: String,

    /// Whether the plugin starts enabled, defaults to true
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Endpoint paths the plugin serves
    pub endpoints: Vec<String>,

    /// Plugin configuration, defaults to an empty object
    #[serde(default = "empty_object")]
    pub config: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Plugin as returned by the registry endpoints
///
/// Endpoints and config are accepted on registration but not echoed back.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PluginResponseDto {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub enabled: bool,
    pub status: String,
}

impl From<&Plugin> for PluginResponseDto {
    fn from(plugin: &Plugin) -> Self {
        Self {
            id: plugin.get_id(),
            name: plugin.get_name(),
            description: plugin.get_description(),
            version: plugin.get_version(),
            enabled: plugin.get_enabled(),
            status: "registered".to_string(),
        }
    }
}

/// Data transfer object for publishing an event
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PublishEventDto {
    pub event_type: String,
    pub source: String,
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// Data transfer object for creating an RPA task
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateTaskDto {
    pub name: String,

    pub description: String,

    /// Page to open before the first step
    #[serde(default)]
    pub target_url: Option<String>,

    /// Step objects, each with a `type` field
    pub steps: Vec<serde_json::Value>,

    /// Stored and returned, not acted upon
    #[serde(default)]
    pub schedule: Option<serde_json::Value>,
}

/// Response for a newly created task
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TaskCreatedDto {
    pub task_id: String,
    pub status: String,
}

/// A stored task with its id first, as listed by `/rpa/tasks`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TaskDto {
    pub id: String,
    pub name: String,
    pub description: String,
    pub target_url: Option<String>,
    pub steps: Vec<serde_json::Value>,
    pub schedule: Option<serde_json::Value>,
    pub status: TaskState,
    pub progress: f32,
}

impl From<&RpaTask> for TaskDto {
    fn from(task: &RpaTask) -> Self {
        Self {
            id: task.get_id(),
            name: task.get_name(),
            description: task.get_description(),
            target_url: task.get_target_url(),
            steps: task.get_steps(),
            schedule: task.get_schedule().map(|s| s.0.clone()),
            status: task.get_state(),
            progress: task.get_progress(),
        }
    }
}

/// Wrapper for the task listing
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TaskListDto {
    pub tasks: Vec<TaskDto>,
}

/// Execution status of a task
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TaskStatusDto {
    pub task_id: String,
    pub status: TaskState,
    pub progress: Option<f32>,
    pub message: Option<String>,
}

/// Outcome of a finished task run
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TaskResultDto {
    pub task_id: String,
    pub status: TaskState,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl From<&TaskResult> for TaskResultDto {
    fn from(result: &TaskResult) -> Self {
        Self {
            task_id: result.get_task_id(),
            status: result.state(),
            result: result.get_result().map(|r| r.0.clone()),
            error: result.get_error(),
        }
    }
}

/// Data transfer object for registering an API with the gateway
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterApiDto {
    pub name: String,
    pub base_path: String,
    pub routes: Vec<Route>,
    #[serde(default)]
    pub rate_limit: Option<serde_json::Value>,
    #[serde(default)]
    pub auth_config: Option<serde_json::Value>,
}

/// Acknowledgement for gateway registration changes
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApiAckDto {
    pub api_id: String,
    pub status: String,
    pub message: String,
}

/// A registered API with its id first
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApiDto {
    pub id: String,
    pub name: String,
    pub base_path: String,
    pub routes: Vec<Route>,
    pub rate_limit: Option<serde_json::Value>,
    pub auth_config: Option<serde_json::Value>,
}

impl TryFrom<&GatewayApi> for ApiDto {
    type Error = serde_json::Error;

    fn try_from(api: &GatewayApi) -> Result<Self, Self::Error> {
        Ok(Self {
            id: api.get_id(),
            name: api.get_name(),
            base_path: api.get_base_path(),
            routes: api.get_routes()?,
            rate_limit: api.get_rate_limit().map(|v| v.0.clone()),
            auth_config: api.get_auth_config().map(|v| v.0.clone()),
        })
    }
}

/// Wrapper for the gateway API listing
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ApiListDto {
    pub apis: Vec<ApiDto>,
}

/// Documentation entry for one registered API
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApiDocDto {
    pub name: String,
    pub base_path: String,
    pub routes: Vec<Route>,
}

#[cfg(test)]
mod tests;
