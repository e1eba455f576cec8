/// Data models module
///
/// This module defines the core data structures used throughout the application.
/// Registry records map to database tables; events are transient.

// Re-export all model types
mod json_value;
pub use json_value::JsonValue;

mod slug;
pub use slug::{is_usable_slug, slug_id};

mod plugin;
pub use plugin::Plugin;

mod gateway_api;
pub use gateway_api::{GatewayApi, Route};

mod rpa_task;
pub use rpa_task::{RpaTask, TaskState};

mod task_result;
pub use task_result::TaskResult;

mod event;
pub use event::Event;
