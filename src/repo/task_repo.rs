use crate::db::DbPool;
use crate::models::{RpaTask, TaskResult, TaskState};
use crate::schema::{rpa_results, rpa_tasks};
use chrono::Utc;
use diesel::prelude::*;
use anyhow::Result;
use tracing::{instrument, debug, info, warn};

/// Error recorded for runs cut short by a server restart
pub const INTERRUPTED_MESSAGE: &str = "Task execution was interrupted by a server restart";

/// Stores a new task under the next `task_<n>` id
///
/// The id is the number of stored tasks plus one, assigned inside an
/// immediate transaction so concurrent creates cannot collide.
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `name`, `description`, `target_url`, `steps`, `schedule` - The task definition
///
/// ### Errors
///
/// Returns an error if:
/// - Unable to get a connection from the pool
/// - The database insert operation fails
#[instrument(skip(pool, steps, schedule), fields(name = %name))]
pub fn create_task(
    pool: &DbPool,
    name: String,
    description: String,
    target_url: Option<String>,
    steps: Vec<serde_json::Value>,
    schedule: Option<serde_json::Value>,
) -> Result<RpaTask> {
    let conn = &mut pool.get()?;

    let task = conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
        let count: i64 = rpa_tasks::table.count().get_result(conn)?;
        let task = RpaTask::new(
            format!("task_{}", count + 1),
            name,
            description,
            target_url,
            steps,
            schedule,
        );
        diesel::insert_into(rpa_tasks::table)
            .values(&task)
            .execute(conn)?;
        Ok(task)
    })?;

    info!("Created RPA task {}", task.get_id());

    Ok(task)
}

/// Retrieves a task by id
#[instrument(skip(pool), fields(task_id = %id))]
pub fn get_task(pool: &DbPool, id: &str) -> Result<Option<RpaTask>> {
    let conn = &mut pool.get()?;

    let result = rpa_tasks::table
        .find(id)
        .select(RpaTask::as_select())
        .first::<RpaTask>(conn)
        .optional()?;

    Ok(result)
}

/// Lists all tasks in creation order
#[instrument(skip(pool))]
pub fn list_tasks(pool: &DbPool) -> Result<Vec<RpaTask>> {
    let conn = &mut pool.get()?;

    let result = rpa_tasks::table
        .order((rpa_tasks::created_at.asc(), rpa_tasks::id.asc()))
        .select(RpaTask::as_select())
        .load::<RpaTask>(conn)?;

    debug!("Retrieved {} tasks", result.len());

    Ok(result)
}

/// Moves a task into the running state and clears its previous result
///
/// ### Returns
///
/// false if the task was already running, true otherwise
///
/// ### Errors
///
/// Returns an error if the task does not exist or the update fails
#[instrument(skip(pool), fields(task_id = %id))]
pub fn mark_task_running(pool: &DbPool, id: &str) -> Result<bool> {
    let conn = &mut pool.get()?;

    conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
        let status: String = rpa_tasks::table
            .find(id)
            .select(rpa_tasks::status)
            .first(conn)?;
        if status == TaskState::Running.as_str() {
            return Ok(false);
        }

        diesel::delete(rpa_results::table.find(id)).execute(conn)?;
        diesel::update(rpa_tasks::table.find(id))
            .set((
                rpa_tasks::status.eq(TaskState::Running.as_str()),
                rpa_tasks::progress.eq(0.0f32),
                rpa_tasks::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)?;
        Ok(true)
    })
}

/// Records how far a running task has got
#[instrument(skip(pool), fields(task_id = %id))]
pub fn update_task_progress(pool: &DbPool, id: &str, progress: f32) -> Result<()> {
    let conn = &mut pool.get()?;

    diesel::update(rpa_tasks::table.find(id))
        .set((
            rpa_tasks::progress.eq(progress.clamp(0.0, 1.0)),
            rpa_tasks::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)?;

    Ok(())
}

/// Stores the outcome of a run and settles the task's state
///
/// A successful run leaves progress at 1.0; a failed run keeps the
/// progress it reached.
#[instrument(skip(pool, result), fields(task_id = %result.get_task_id()))]
pub fn finish_task(pool: &DbPool, result: TaskResult) -> Result<TaskResult> {
    let conn = &mut pool.get()?;
    let task_id = result.get_task_id();
    let state = result.state();

    conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
        diesel::replace_into(rpa_results::table)
            .values(&result)
            .execute(conn)?;

        let now = Utc::now().naive_utc();
        if state == TaskState::Completed {
            diesel::update(rpa_tasks::table.find(task_id.as_str()))
                .set((
                    rpa_tasks::status.eq(state.as_str()),
                    rpa_tasks::progress.eq(1.0f32),
                    rpa_tasks::updated_at.eq(now),
                ))
                .execute(conn)?;
        } else {
            diesel::update(rpa_tasks::table.find(task_id.as_str()))
                .set((
                    rpa_tasks::status.eq(state.as_str()),
                    rpa_tasks::updated_at.eq(now),
                ))
                .execute(conn)?;
        }
        Ok(())
    })?;

    info!("Task {} finished as {}", task_id, state);

    Ok(result)
}

/// Retrieves the result of a task's last run
#[instrument(skip(pool), fields(task_id = %task_id))]
pub fn get_task_result(pool: &DbPool, task_id: &str) -> Result<Option<TaskResult>> {
    let conn = &mut pool.get()?;

    let result = rpa_results::table
        .find(task_id)
        .select(TaskResult::as_select())
        .first::<TaskResult>(conn)
        .optional()?;

    Ok(result)
}

/// Fails every task still marked running
///
/// Called at startup: no runner survives a restart, so these tasks would
/// otherwise report `running` forever.
///
/// ### Returns
///
/// The number of tasks that were failed
#[instrument(skip(pool))]
pub fn fail_interrupted_tasks(pool: &DbPool) -> Result<usize> {
    let stale: Vec<String> = {
        let conn = &mut pool.get()?;
        rpa_tasks::table
            .filter(rpa_tasks::status.eq(TaskState::Running.as_str()))
            .select(rpa_tasks::id)
            .load(conn)?
    };

    for task_id in &stale {
        warn!("Failing task {} left running by a previous server", task_id);
        finish_task(pool, TaskResult::failure(task_id, INTERRUPTED_MESSAGE.to_string()))?;
    }

    Ok(stale.len())
}
