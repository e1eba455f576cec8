use axum::{
    extract::State,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    Json,
};
use axum_extra::extract::WithRejection;
use futures::Stream;
use serde_json::{json, Value};
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;
use tracing::{instrument, debug};

use crate::dto::PublishEventDto;
use crate::errors::ApiError;
use crate::events::EventBus;
use crate::models::Event;

use super::JsonBody;

/// Handler for publishing an event
///
/// This function handles POST requests to `/events`. The event goes to
/// every live `/events/stream` subscriber and is not stored.
///
/// ### Returns
///
/// The published event, or 400 if the event type holds a line break. The
/// type names the SSE message, and SSE field values end at a line break.
#[instrument(skip(events, payload), fields(event_type = %payload.event_type, source = %payload.source))]
pub async fn publish_event_handler(
    State(events): State<EventBus>,
    WithRejection(Json(payload), _): JsonBody<PublishEventDto>,
) -> Result<Json<Value>, ApiError> {
    if payload.event_type.contains(['\n', '\r']) {
        return Err(ApiError::BadRequest(
            "Event type must not contain line breaks".to_string(),
        ));
    }

    let event = Event {
        event_type: payload.event_type,
        source: payload.source,
        data: payload.data,
    };

    let delivered = events.publish(event.clone());
    debug!("Event delivered to {} subscribers", delivered);

    Ok(Json(json!({
        "status": "published",
        "event": event
    })))
}

/// Server-Sent Events stream of everything published on the bus
///
/// This function handles GET requests to `/events/stream`. Each SSE
/// message is named after the event type and carries the event as JSON.
pub async fn event_stream_handler(
    State(events): State<EventBus>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let mut rx = events.subscribe();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Ok(json) = serde_json::to_string(&event) {
                        yield Ok(SseEvent::default().event(event.event_type.as_str()).data(json));
                    }
                }
                // A slow subscriber loses what it missed and carries on
                Err(RecvError::Lagged(skipped)) => {
                    debug!("SSE subscriber lagged, skipped {} events", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
