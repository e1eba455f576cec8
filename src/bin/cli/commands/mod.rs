//! Subcommand definitions and their executors

pub mod event;
pub mod gateway;
pub mod health;
pub mod manifest;
pub mod plugin;
pub mod task;

use serde::de::DeserializeOwned;
use std::path::Path;

/// Parses a JSON command line argument, naming the flag on failure
fn parse_json_arg<T: DeserializeOwned>(flag: &str, text: &str) -> Result<T, Box<dyn std::error::Error>> {
    serde_json::from_str(text).map_err(|e| format!("--{} is not valid JSON: {}", flag, e).into())
}

/// Reads and parses a JSON document from a file
fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("{} is not valid JSON: {}", path.display(), e).into())
}
