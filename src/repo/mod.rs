/// Repository module
///
/// This module provides the data access layer for the application.
/// It contains functions for storing and querying plugins, gateway APIs,
/// RPA tasks and their results.
///
/// The repository pattern abstracts away the details of database access
/// and provides a clean API for the rest of the application to use.

mod plugin_repo;
mod gateway_repo;
mod task_repo;

// Re-export all repository functions
pub use plugin_repo::*;
pub use gateway_repo::*;
pub use task_repo::*;
