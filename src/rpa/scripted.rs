//! An in-memory browser for exercising task runs without Chromium.
//!
//! Every selector exists unless marked missing; extraction reads from the
//! texts configured on the launcher. Actions are recorded in order.

use super::{BrowserLauncher, BrowserSession};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Bytes returned by `screenshot`
pub const SCRIPTED_SCREENSHOT: &[u8] = b"\x89PNG scripted";

#[derive(Debug, Default)]
struct Script {
    texts: HashMap<String, String>,
    xpaths: HashMap<String, Vec<String>>,
    missing: HashSet<String>,
    panicking: HashSet<String>,
    launch_error: Option<String>,
}

/// Launches [`ScriptedSession`]s sharing one script and action log
#[derive(Debug, Clone, Default)]
pub struct ScriptedLauncher {
    script: Arc<Script>,
    actions: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicUsize>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    fn script_mut(&mut self) -> &mut Script {
        Arc::get_mut(&mut self.script).expect("configure the launcher before cloning it")
    }

    /// Text returned for `selector` by text extraction
    pub fn with_text(mut self, selector: &str, text: &str) -> Self {
        self.script_mut().texts.insert(selector.to_string(), text.to_string());
        self
    }

    /// Texts returned for an XPath expression
    pub fn with_xpath(mut self, xpath: &str, texts: &[&str]) -> Self {
        self.script_mut()
            .xpaths
            .insert(xpath.to_string(), texts.iter().map(|t| t.to_string()).collect());
        self
    }

    /// Makes every interaction with `selector` fail
    pub fn with_missing(mut self, selector: &str) -> Self {
        self.script_mut().missing.insert(selector.to_string());
        self
    }

    /// Makes every interaction with `selector` panic
    pub fn with_panic(mut self, selector: &str) -> Self {
        self.script_mut().panicking.insert(selector.to_string());
        self
    }

    /// Makes `launch` fail with `message`
    pub fn failing_launch(mut self, message: &str) -> Self {
        self.script_mut().launch_error = Some(message.to_string());
        self
    }

    /// Holds every navigation until the returned handle is notified
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    /// Actions performed so far, across all sessions
    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// How many sessions have been closed
    pub fn sessions_closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for ScriptedLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        if let Some(message) = &self.script.launch_error {
            bail!("{message}");
        }
        Ok(Box::new(ScriptedSession {
            launcher: self.clone(),
        }))
    }
}

pub struct ScriptedSession {
    launcher: ScriptedLauncher,
}

impl ScriptedSession {
    fn record(&self, action: String) {
        if let Ok(mut actions) = self.launcher.actions.lock() {
            actions.push(action);
        }
    }

    fn require(&self, selector: &str) -> Result<()> {
        if self.launcher.script.panicking.contains(selector) {
            panic!("scripted panic on {selector}");
        }
        if self.launcher.script.missing.contains(selector) {
            bail!("no element matches {selector}");
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        if let Some(gate) = &self.launcher.gate {
            gate.notified().await;
        }
        self.record(format!("goto {url}"));
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        self.require(selector)?;
        self.record(format!("click {selector}"));
        Ok(())
    }

    async fn click_at(&mut self, x: f64, y: f64) -> Result<()> {
        self.record(format!("click_at {x},{y}"));
        Ok(())
    }

    async fn fill(&mut self, selector: &str, text: &str) -> Result<()> {
        self.require(selector)?;
        self.record(format!("fill {selector} {text}"));
        Ok(())
    }

    async fn select_option(&mut self, selector: &str, value: Option<&str>) -> Result<()> {
        self.require(selector)?;
        self.record(format!("select {selector} {}", value.unwrap_or("-")));
        Ok(())
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        if self.launcher.script.missing.contains(selector) {
            bail!("timed out after {:?} waiting for {selector}", timeout);
        }
        self.record(format!("wait {selector}"));
        Ok(())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        self.record("screenshot".to_string());
        Ok(SCRIPTED_SCREENSHOT.to_vec())
    }

    async fn text_content(&mut self, selector: &str) -> Result<Option<String>> {
        self.record(format!("text {selector}"));
        Ok(self.launcher.script.texts.get(selector).cloned())
    }

    async fn xpath_texts(&mut self, xpath: &str) -> Result<Vec<String>> {
        self.record(format!("xpath {xpath}"));
        Ok(self.launcher.script.xpaths.get(xpath).cloned().unwrap_or_default())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.launcher.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
