use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::{JsonValue, TaskState};

/// Outcome of the last run of an RPA task
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::rpa_results)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TaskResult {
    task_id: String,

    /// `{"steps": [...]}` on success
    result: Option<JsonValue>,

    /// Error message on failure
    error: Option<String>,

    completed_at: NaiveDateTime,
}

impl TaskResult {
    /// A successful run
    pub fn success(task_id: &str, result: serde_json::Value) -> Self {
        Self {
            task_id: task_id.to_string(),
            result: Some(JsonValue(result)),
            error: None,
            completed_at: Utc::now().naive_utc(),
        }
    }

    /// A failed run
    pub fn failure(task_id: &str, error: String) -> Self {
        Self {
            task_id: task_id.to_string(),
            result: None,
            error: Some(error),
            completed_at: Utc::now().naive_utc(),
        }
    }

    pub fn get_task_id(&self) -> String {
        self.task_id.clone()
    }

    pub fn get_result(&self) -> Option<&JsonValue> {
        self.result.as_ref()
    }

    pub fn get_error(&self) -> Option<String> {
        self.error.clone()
    }

    /// `Completed` when no error was recorded, `Failed` otherwise
    pub fn state(&self) -> TaskState {
        if self.error.is_none() {
            TaskState::Completed
        } else {
            TaskState::Failed
        }
    }

    pub fn get_completed_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.completed_at, Utc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_state() {
        let ok = TaskResult::success("task_1", json!({"steps": []}));
        assert_eq!(ok.state(), TaskState::Completed);
        assert!(ok.get_error().is_none());

        let failed = TaskResult::failure("task_1", "timeout".to_string());
        assert_eq!(failed.state(), TaskState::Failed);
        assert!(failed.get_result().is_none());
    }
}
