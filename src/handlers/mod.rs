/// Web API Handlers
///
/// This module contains the handlers for the RESTful API endpoints.
/// Each handler is responsible for processing a specific type of HTTP request,
/// extracting the necessary data, calling the appropriate repository functions,
/// and returning a properly formatted response.

mod system_handlers;
mod plugin_handlers;
mod event_handlers;
mod rpa_handlers;
mod gateway_handlers;

// Re-export all handlers
pub use system_handlers::*;
pub use plugin_handlers::*;
pub use event_handlers::*;
pub use rpa_handlers::*;
pub use gateway_handlers::*;

use axum::Json;
use axum_extra::extract::WithRejection;

use crate::errors::ApiError;

/// JSON request body whose rejections answer with the `{"error": ...}` body
pub type JsonBody<T> = WithRejection<Json<T>, ApiError>;

#[cfg(test)]
pub(crate) fn json_body<T>(value: T) -> JsonBody<T> {
    WithRejection(Json(value), std::marker::PhantomData)
}

/// True when an insert failed because the primary key is taken
///
/// Registration checks for an existing id first; this catches the
/// concurrent insert that slips between the check and the write.
fn is_unique_violation(err: &anyhow::Error) -> bool {
    use diesel::result::{DatabaseErrorKind, Error};

    matches!(
        err.downcast_ref::<Error>(),
        Some(Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _))
    )
}
