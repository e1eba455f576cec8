use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::extract::WithRejection;
use std::sync::Arc;
use tracing::{instrument, debug, info};

use crate::db::DbPool;
use crate::dto::{CreateTaskDto, TaskCreatedDto, TaskDto, TaskListDto, TaskResultDto, TaskStatusDto};
use crate::errors::ApiError;
use crate::models::{RpaTask, TaskState};
use crate::repo;
use crate::rpa::TaskRunner;

use super::JsonBody;

fn task_not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("Task with id {} not found", id))
}

fn find_task(pool: &DbPool, id: &str) -> Result<RpaTask, ApiError> {
    repo::get_task(pool, id)
        .map_err(ApiError::Database)?
        .ok_or_else(|| task_not_found(id))
}

/// Handler for creating an RPA task
///
/// This function handles POST requests to `/rpa/tasks`. The task is stored
/// in the `created` state and runs only when executed.
#[instrument(skip(pool, payload), fields(name = %payload.name))]
pub async fn create_task_handler(
    State(pool): State<Arc<DbPool>>,
    WithRejection(Json(payload), _): JsonBody<CreateTaskDto>,
) -> Result<Json<TaskCreatedDto>, ApiError> {
    let task = repo::create_task(
        &pool,
        payload.name,
        payload.description,
        payload.target_url,
        payload.steps,
        payload.schedule,
    )
    .map_err(ApiError::Database)?;

    Ok(Json(TaskCreatedDto {
        task_id: task.get_id(),
        status: TaskState::Created.to_string(),
    }))
}

/// Handler for listing all RPA tasks
///
/// This function handles GET requests to `/rpa/tasks`.
#[instrument(skip(pool))]
pub async fn list_tasks_handler(
    State(pool): State<Arc<DbPool>>,
) -> Result<Json<TaskListDto>, ApiError> {
    let tasks = repo::list_tasks(&pool)
        .map_err(ApiError::Database)?;

    debug!("Retrieved {} tasks", tasks.len());

    Ok(Json(TaskListDto {
        tasks: tasks.iter().map(TaskDto::from).collect(),
    }))
}

/// Handler for retrieving a specific RPA task
///
/// This function handles GET requests to `/rpa/tasks/{id}`.
#[instrument(skip(pool), fields(task_id = %id))]
pub async fn get_task_handler(
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<String>,
) -> Result<Json<TaskDto>, ApiError> {
    let task = find_task(&pool, &id)?;
    Ok(Json(TaskDto::from(&task)))
}

/// Handler for starting a task run
///
/// This function handles POST requests to `/rpa/tasks/{id}/execute`.
/// The run happens in the background; poll the status endpoint to follow it.
///
/// ### Returns
///
/// The `running` status, 404 if the task does not exist, or 409 if a run
/// is already in progress
#[instrument(skip(pool, runner), fields(task_id = %id))]
pub async fn execute_task_handler(
    State(pool): State<Arc<DbPool>>,
    State(runner): State<TaskRunner>,
    Path(id): Path<String>,
) -> Result<Json<TaskStatusDto>, ApiError> {
    let task = find_task(&pool, &id)?;

    let started = repo::mark_task_running(&pool, &id)
        .map_err(ApiError::Database)?;
    if !started {
        return Err(ApiError::Conflict(format!("Task {} is already running", id)));
    }

    runner.spawn(task);
    info!("Started execution of task {}", id);

    Ok(Json(TaskStatusDto {
        task_id: id,
        status: TaskState::Running,
        progress: Some(0.0),
        message: Some("Task execution started".to_string()),
    }))
}

/// Handler for a task's execution status
///
/// This function handles GET requests to `/rpa/tasks/{id}/status`.
#[instrument(skip(pool), fields(task_id = %id))]
pub async fn task_status_handler(
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<String>,
) -> Result<Json<TaskStatusDto>, ApiError> {
    let task = find_task(&pool, &id)?;
    let result = repo::get_task_result(&pool, &id)
        .map_err(ApiError::Database)?;

    let status = match result {
        Some(result) => TaskStatusDto {
            task_id: id,
            status: result.state(),
            progress: Some(1.0),
            message: Some(
                result
                    .get_error()
                    .unwrap_or_else(|| "Task execution completed".to_string()),
            ),
        },
        None => {
            let message = match task.get_state() {
                TaskState::Created => Some("Task has not been executed".to_string()),
                TaskState::Running => Some("Task is still running".to_string()),
                TaskState::Completed | TaskState::Failed => None,
            };
            TaskStatusDto {
                task_id: id,
                status: task.get_state(),
                progress: Some(task.get_progress()),
                message,
            }
        }
    };

    Ok(Json(status))
}

/// Handler for the outcome of a task's last run
///
/// This function handles GET requests to `/rpa/tasks/{id}/result`.
#[instrument(skip(pool), fields(task_id = %id))]
pub async fn task_result_handler(
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<String>,
) -> Result<Json<TaskResultDto>, ApiError> {
    find_task(&pool, &id)?;

    let result = repo::get_task_result(&pool, &id)
        .map_err(ApiError::Database)?
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "Results for task {} not found. Task may still be running.",
                id
            ))
        })?;

    Ok(Json(TaskResultDto::from(&result)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::json_body;
    use crate::events::EventBus;
    use crate::repo::tests::{setup_file_test_db, setup_test_db};
    use crate::rpa::scripted::ScriptedLauncher;
    use serde_json::json;
    use std::time::Duration;

    fn create_dto(steps: serde_json::Value) -> CreateTaskDto {
        serde_json::from_value(json!({
            "name": "Price check",
            "description": "Reads the price of a product",
            "target_url": "https://shop.example.com/item/1",
            "steps": steps
        }))
        .unwrap()
    }

    fn runner(pool: &Arc<DbPool>, launcher: ScriptedLauncher) -> TaskRunner {
        TaskRunner::new(pool.clone(), Arc::new(launcher), EventBus::default(), Duration::from_secs(5))
    }

    async fn wait_until_settled(pool: &DbPool, id: &str) -> RpaTask {
        for _ in 0..500 {
            let task = repo::get_task(pool, id).unwrap().unwrap();
            if task.get_state() != TaskState::Running {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {} did not finish", id);
    }

    #[tokio::test]
    async fn test_create_and_get_task_handlers() {
        let pool = setup_test_db();

        let created = create_task_handler(State(pool.clone()), json_body(create_dto(json!([{"type": "screenshot"}]))))
            .await
            .unwrap();
        assert_eq!(created.0.task_id, "task_1");
        assert_eq!(created.0.status, "created");

        let task = get_task_handler(State(pool.clone()), Path("task_1".to_string()))
            .await
            .unwrap();
        assert_eq!(task.0.name, "Price check");
        assert_eq!(task.0.status, TaskState::Created);

        let tasks = list_tasks_handler(State(pool.clone())).await.unwrap();
        assert_eq!(tasks.0.tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_task_is_not_found_everywhere() {
        let pool = setup_test_db();

        let err = get_task_handler(State(pool.clone()), Path("task_9".to_string()))
            .await
            .unwrap_err();
        match err {
            ApiError::NotFound(msg) => assert_eq!(msg, "Task with id task_9 not found"),
            other => panic!("Expected NotFound error, got {:?}", other),
        }

        assert!(matches!(
            task_status_handler(State(pool.clone()), Path("task_9".to_string())).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            task_result_handler(State(pool.clone()), Path("task_9".to_string())).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            execute_task_handler(
                State(pool.clone()),
                State(runner(&pool, ScriptedLauncher::new())),
                Path("task_9".to_string())
            )
            .await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_status_and_result_before_execution() {
        let pool = setup_test_db();
        create_task_handler(State(pool.clone()), json_body(create_dto(json!([]))))
            .await
            .unwrap();

        let status = task_status_handler(State(pool.clone()), Path("task_1".to_string()))
            .await
            .unwrap();
        assert_eq!(status.0.status, TaskState::Created);
        assert_eq!(status.0.progress, Some(0.0));
        assert_eq!(status.0.message.as_deref(), Some("Task has not been executed"));

        let err = task_result_handler(State(pool.clone()), Path("task_1".to_string()))
            .await
            .unwrap_err();
        match err {
            ApiError::NotFound(msg) => {
                assert_eq!(msg, "Results for task task_1 not found. Task may still be running.")
            }
            other => panic!("Expected NotFound error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_execute_task_handler_runs_in_background() {
        let (pool, _dir) = setup_file_test_db();
        let launcher = ScriptedLauncher::new().with_text("#price", "19.99");
        create_task_handler(
            State(pool.clone()),
            json_body(create_dto(json!([{"type": "extract", "selector": "#price"}]))),
        )
        .await
        .unwrap();

        let started = execute_task_handler(
            State(pool.clone()),
            State(runner(&pool, launcher)),
            Path("task_1".to_string()),
        )
        .await
        .unwrap();
        assert_eq!(started.0.status, TaskState::Running);
        assert_eq!(started.0.message.as_deref(), Some("Task execution started"));

        let task = wait_until_settled(&pool, "task_1").await;
        assert_eq!(task.get_state(), TaskState::Completed);

        let status = task_status_handler(State(pool.clone()), Path("task_1".to_string()))
            .await
            .unwrap();
        assert_eq!(status.0.progress, Some(1.0));
        assert_eq!(status.0.message.as_deref(), Some("Task execution completed"));

        let result = task_result_handler(State(pool.clone()), Path("task_1".to_string()))
            .await
            .unwrap();
        assert_eq!(result.0.result.unwrap()["steps"][0]["result"]["text"], "19.99");
    }

    #[tokio::test]
    async fn test_execute_task_handler_rejects_concurrent_runs() {
        let (pool, _dir) = setup_file_test_db();
        let (launcher, gate) = ScriptedLauncher::new().gated();
        let runner = runner(&pool, launcher);
        create_task_handler(State(pool.clone()), json_body(create_dto(json!([]))))
            .await
            .unwrap();

        execute_task_handler(State(pool.clone()), State(runner.clone()), Path("task_1".to_string()))
            .await
            .unwrap();

        let status = task_status_handler(State(pool.clone()), Path("task_1".to_string()))
            .await
            .unwrap();
        assert_eq!(status.0.status, TaskState::Running);
        assert_eq!(status.0.message.as_deref(), Some("Task is still running"));

        let err = execute_task_handler(State(pool.clone()), State(runner.clone()), Path("task_1".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)), "Expected Conflict error, got {:?}", err);

        gate.notify_one();
        assert_eq!(wait_until_settled(&pool, "task_1").await.get_state(), TaskState::Completed);
    }

    #[tokio::test]
    async fn test_failed_run_reports_error_as_message() {
        let (pool, _dir) = setup_file_test_db();
        let launcher = ScriptedLauncher::new().with_missing("#buy");
        create_task_handler(
            State(pool.clone()),
            json_body(create_dto(json!([{"type": "click", "selector": "#buy"}]))),
        )
        .await
        .unwrap();

        execute_task_handler(State(pool.clone()), State(runner(&pool, launcher)), Path("task_1".to_string()))
            .await
            .unwrap();
        wait_until_settled(&pool, "task_1").await;

        let status = task_status_handler(State(pool.clone()), Path("task_1".to_string()))
            .await
            .unwrap();
        assert_eq!(status.0.status, TaskState::Failed);
        assert_eq!(status.0.progress, Some(1.0));
        assert!(status.0.message.unwrap().contains("#buy"));

        let result = task_result_handler(State(pool.clone()), Path("task_1".to_string()))
            .await
            .unwrap();
        assert!(result.0.result.is_none());
        assert!(result.0.error.is_some());
    }
}
