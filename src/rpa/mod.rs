//! Browser automation for the RPA plugin.
//!
//! Tasks are lists of JSON step objects. [`Action::from_step`] turns one
//! step into a typed action, a [`BrowserSession`] performs it, and the
//! [`runner`] drives a whole task and records the outcome.

pub mod chromium;
pub mod runner;
#[cfg(any(test, feature = "test"))]
pub mod scripted;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub use runner::TaskRunner;

/// Why a step object could not be turned into an [`Action`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    #[error("step is not a JSON object")]
    NotAnObject,
    #[error("{step_type} step is missing field `{field}`")]
    MissingField { step_type: String, field: &'static str },
    #[error("{step_type} step has invalid field `{field}` (expected {expected})")]
    InvalidField {
        step_type: String,
        field: &'static str,
        expected: &'static str,
    },
}

/// What a click step targets
#[derive(Debug, Clone, PartialEq)]
pub enum ClickTarget {
    Selector(String),
    Point { x: f64, y: f64 },
}

/// What a wait step waits for
#[derive(Debug, Clone, PartialEq)]
pub enum WaitFor {
    Duration(Duration),
    Selector(String),
}

/// One executable browser step
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Navigate { url: String },
    Click(ClickTarget),
    Type { selector: String, text: String },
    Select { selector: String, value: Option<String> },
    Wait(WaitFor),
    Screenshot,
    ExtractText { selector: String },
    ExtractXPath { xpath: String },
}

impl Action {
    /// Reads a step object
    ///
    /// Returns `Ok(None)` for steps that do nothing: unknown `type`s, and
    /// click, wait or extract steps that name no target.
    pub fn from_step(step: &Value) -> Result<Option<Action>, StepError> {
        let object = step.as_object().ok_or(StepError::NotAnObject)?;
        let step_type = object.get("type").and_then(Value::as_str).unwrap_or("");

        let string = |field: &'static str| -> Result<Option<String>, StepError> {
            match object.get(field) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.clone())),
                Some(_) => Err(StepError::InvalidField {
                    step_type: step_type.to_string(),
                    field,
                    expected: "a string",
                }),
            }
        };
        let required = |field: &'static str| -> Result<String, StepError> {
            string(field)?.ok_or_else(|| StepError::MissingField {
                step_type: step_type.to_string(),
                field,
            })
        };

        let action = match step_type {
            "navigate" => Action::Navigate { url: required("url")? },
            "click" => {
                if let Some(selector) = string("selector")? {
                    Action::Click(ClickTarget::Selector(selector))
                } else if let Some(coordinates) = object.get("coordinates") {
                    let (x, y) = parse_point(coordinates).ok_or_else(|| StepError::InvalidField {
                        step_type: step_type.to_string(),
                        field: "coordinates",
                        expected: "a pair of numbers",
                    })?;
                    Action::Click(ClickTarget::Point { x, y })
                } else {
                    return Ok(None);
                }
            }
            "type" => Action::Type {
                selector: required("selector")?,
                text: required("text")?,
            },
            "select" => Action::Select {
                selector: required("selector")?,
                value: string("value")?,
            },
            "wait" => {
                if let Some(time) = object.get("time") {
                    let duration = time
                        .as_f64()
                        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                        .ok_or_else(|| StepError::InvalidField {
                            step_type: step_type.to_string(),
                            field: "time",
                            expected: "a non-negative number of seconds",
                        })?;
                    Action::Wait(WaitFor::Duration(duration))
                } else if let Some(selector) = string("selector")? {
                    Action::Wait(WaitFor::Selector(selector))
                } else {
                    return Ok(None);
                }
            }
            "screenshot" => Action::Screenshot,
            "extract" => {
                if let Some(selector) = string("selector")? {
                    Action::ExtractText { selector }
                } else if let Some(xpath) = string("xpath")? {
                    Action::ExtractXPath { xpath }
                } else {
                    return Ok(None);
                }
            }
            _ => return Ok(None),
        };

        Ok(Some(action))
    }
}

fn parse_point(value: &Value) -> Option<(f64, f64)> {
    match value.as_array()?.as_slice() {
        [x, y] => Some((x.as_f64()?, y.as_f64()?)),
        _ => None,
    }
}

/// Starts browser sessions for task runs
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Opens a fresh browser with one blank page
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

/// A single page in a launched browser
#[async_trait]
pub trait BrowserSession: Send {
    async fn goto(&mut self, url: &str) -> Result<()>;
    async fn click(&mut self, selector: &str) -> Result<()>;
    async fn click_at(&mut self, x: f64, y: f64) -> Result<()>;
    /// Replaces the value of an input and fires input/change events
    async fn fill(&mut self, selector: &str, text: &str) -> Result<()>;
    async fn select_option(&mut self, selector: &str, value: Option<&str>) -> Result<()>;
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()>;
    /// PNG bytes of the visible viewport
    async fn screenshot(&mut self) -> Result<Vec<u8>>;
    /// `textContent` of the first match, None when nothing matches
    async fn text_content(&mut self, selector: &str) -> Result<Option<String>>;
    /// `textContent` of every node the expression selects
    async fn xpath_texts(&mut self, xpath: &str) -> Result<Vec<String>>;
    /// Shuts the browser down
    async fn close(self: Box<Self>) -> Result<()>;
}
