use super::{Action, BrowserLauncher, BrowserSession, ClickTarget, WaitFor};
use crate::db::DbPool;
use crate::events::EventBus;
use crate::models::{Event, RpaTask, TaskResult, TaskState};
use crate::repo;
use anyhow::{anyhow, Context, Result};
use base64::prelude::*;
use futures::FutureExt;
use serde_json::{json, Value};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

/// Source name on events published by task runs
pub const RPA_EVENT_SOURCE: &str = "rpa";

/// Executes RPA tasks against browsers from a [`BrowserLauncher`]
///
/// Every run gets its own browser, which is closed when the run ends
/// whether it succeeded or not. The outcome is stored through the task
/// repository and announced on the event bus.
#[derive(Clone)]
pub struct TaskRunner {
    pool: Arc<DbPool>,
    launcher: Arc<dyn BrowserLauncher>,
    events: EventBus,
    step_timeout: Duration,
}

impl TaskRunner {
    pub fn new(
        pool: Arc<DbPool>,
        launcher: Arc<dyn BrowserLauncher>,
        events: EventBus,
        step_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            launcher,
            events,
            step_timeout,
        }
    }

    /// Runs a task in the background
    ///
    /// The task must already be marked running. A run that panics or
    /// cannot store its result is still recorded as failed, so the task
    /// does not stay running.
    pub fn spawn(&self, task: RpaTask) -> JoinHandle<()> {
        let runner = self.clone();
        tokio::spawn(async move {
            let task_id = task.get_id();
            let error = match AssertUnwindSafe(runner.run(task)).catch_unwind().await {
                Ok(Ok(_)) => return,
                Ok(Err(e)) => {
                    error!("Failed to record outcome of task {}: {:#}", task_id, e);
                    format!("failed to record outcome: {e:#}")
                }
                Err(panic) => {
                    let msg = panic_message(&*panic);
                    error!("Task {} panicked: {}", task_id, msg);
                    format!("runner panicked: {msg}")
                }
            };
            runner.record_failure(&task_id, error);
        })
    }

    /// Stores a failed result for a run that ended without storing one
    fn record_failure(&self, task_id: &str, error: String) {
        let result = match repo::finish_task(&self.pool, TaskResult::failure(task_id, error)) {
            Ok(result) => result,
            Err(e) => {
                error!("Task {} is left running: {:#}", task_id, e);
                return;
            }
        };
        self.events.publish(Event::new(
            "rpa.task.failed",
            RPA_EVENT_SOURCE,
            json!({"task_id": task_id, "error": result.get_error()}),
        ));
    }

    /// Runs a task to completion and stores its result
    ///
    /// Step failures become a failed [`TaskResult`]; only storage errors
    /// are returned as `Err`.
    #[instrument(skip(self, task), fields(task_id = %task.get_id()))]
    pub async fn run(&self, task: RpaTask) -> Result<TaskResult> {
        let task_id = task.get_id();
        info!("Executing task {}", task_id);

        let outcome = match self.launcher.launch().await {
            Ok(mut session) => {
                let outcome = self.execute(session.as_mut(), &task).await;
                if let Err(e) = session.close().await {
                    warn!("Failed to close browser for task {}: {:#}", task_id, e);
                }
                outcome
            }
            Err(e) => Err(e.context("failed to start browser")),
        };

        let result = match outcome {
            Ok(value) => TaskResult::success(&task_id, value),
            Err(e) => {
                warn!("Task {} failed: {:#}", task_id, e);
                TaskResult::failure(&task_id, format!("{e:#}"))
            }
        };

        let result = repo::finish_task(&self.pool, result)?;

        let event = match result.state() {
            TaskState::Failed => Event::new(
                "rpa.task.failed",
                RPA_EVENT_SOURCE,
                json!({"task_id": task_id, "error": result.get_error()}),
            ),
            _ => Event::new(
                "rpa.task.completed",
                RPA_EVENT_SOURCE,
                json!({"task_id": task_id}),
            ),
        };
        self.events.publish(event);

        Ok(result)
    }

    async fn execute(&self, session: &mut dyn BrowserSession, task: &RpaTask) -> Result<Value> {
        let task_id = task.get_id();

        if let Some(url) = task.get_target_url() {
            self.bounded(session.goto(&url))
                .await
                .with_context(|| format!("failed to open {url}"))?;
        }

        let mut steps = task.get_steps();
        let total = steps.len();
        for (index, step) in steps.iter_mut().enumerate() {
            let number = index + 1;

            let action = Action::from_step(step).with_context(|| format!("step {number}"))?;
            if let Some(action) = action {
                let output = self
                    .perform(session, action)
                    .await
                    .with_context(|| format!("step {number}"))?;
                if let (Some(output), Some(object)) = (output, step.as_object_mut()) {
                    object.insert("result".to_string(), output);
                }
            }

            let progress = number as f32 / total as f32;
            if let Err(e) = repo::update_task_progress(&self.pool, &task_id, progress) {
                warn!("Failed to record progress of task {}: {:#}", task_id, e);
            }
        }

        Ok(json!({ "steps": steps }))
    }

    /// Performs one action, returning the output to attach to its step
    ///
    /// Extraction yields no output when nothing matched.
    async fn perform(&self, session: &mut dyn BrowserSession, action: Action) -> Result<Option<Value>> {
        match action {
            Action::Navigate { url } => self.bounded(session.goto(&url)).await?,
            Action::Click(ClickTarget::Selector(selector)) => {
                self.bounded(session.click(&selector)).await?
            }
            Action::Click(ClickTarget::Point { x, y }) => self.bounded(session.click_at(x, y)).await?,
            Action::Type { selector, text } => self.bounded(session.fill(&selector, &text)).await?,
            Action::Select { selector, value } => {
                self.bounded(session.select_option(&selector, value.as_deref()))
                    .await?
            }
            Action::Wait(WaitFor::Duration(duration)) => tokio::time::sleep(duration).await,
            Action::Wait(WaitFor::Selector(selector)) => {
                session.wait_for_selector(&selector, self.step_timeout).await?
            }
            Action::Screenshot => {
                let png = self.bounded(session.screenshot()).await?;
                return Ok(Some(json!({ "screenshot": BASE64_STANDARD.encode(png) })));
            }
            Action::ExtractText { selector } => {
                let text = self.bounded(session.text_content(&selector)).await?;
                return Ok(text.map(|text| json!({ "text": text })));
            }
            Action::ExtractXPath { xpath } => {
                let texts = self.bounded(session.xpath_texts(&xpath)).await?;
                if texts.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(json!({ "texts": texts })));
            }
        }
        Ok(None)
    }

    async fn bounded<T>(&self, action: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.step_timeout, action)
            .await
            .map_err(|_| anyhow!("timed out after {:?}", self.step_timeout))?
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
