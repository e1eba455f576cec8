use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::JsonValue;

/// Lifecycle of an RPA task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Stored but never executed
    Created,
    Running,
    Completed,
    Failed,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Created => "created",
            TaskState::Running => "running",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(TaskState::Created),
            "running" => Ok(TaskState::Running),
            "completed" => Ok(TaskState::Completed),
            "failed" => Ok(TaskState::Failed),
            other => Err(format!("Unknown task state: {}", other)),
        }
    }
}

/// A stored browser automation task
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::rpa_tasks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RpaTask {
    /// `task_<n>`
    id: String,

    name: String,
    description: String,

    /// Page opened before the first step, if any
    target_url: Option<String>,

    /// The step objects, executed in order
    steps: JsonValue,

    /// Stored as given, never interpreted
    schedule: Option<JsonValue>,

    /// One of the [`TaskState`] names
    status: String,

    /// Fraction of steps finished in the current or last run
    progress: f32,

    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl RpaTask {
    /// Creates a new task in the `created` state
    pub fn new(
        id: String,
        name: String,
        description: String,
        target_url: Option<String>,
        steps: Vec<serde_json::Value>,
        schedule: Option<serde_json::Value>,
    ) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id,
            name,
            description,
            target_url,
            steps: JsonValue(serde_json::Value::Array(steps)),
            schedule: schedule.map(JsonValue),
            status: TaskState::Created.to_string(),
            progress: 0.0,
            created_at: now,
            updated_at: now,
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

    pub fn get_target_url(&self) -> Option<String> {
        self.target_url.clone()
    }

    /// Gets the steps as a list of JSON objects
    pub fn get_steps(&self) -> Vec<serde_json::Value> {
        match &self.steps.0 {
            serde_json::Value::Array(steps) => steps.clone(),
            _ => Vec::new(),
        }
    }

    pub fn get_schedule(&self) -> Option<&JsonValue> {
        self.schedule.as_ref()
    }

    /// Gets the lifecycle state
    ///
    /// An unrecognised stored value reads as `Created`.
    pub fn get_state(&self) -> TaskState {
        self.status.parse().unwrap_or(TaskState::Created)
    }

    pub fn get_progress(&self) -> f32 {
        self.progress
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.created_at, Utc)
    }

    pub fn get_updated_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.updated_at, Utc)
    }
}
