//! Event routes.
//!
//! - `GET /` plain-text summary
//! - `POST /event` store an event and queue it for delivery
//! - `GET /event` the most recent event
//! - `GET /events?n=` the last `n` events, oldest first

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    routing::get,
};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::RecentEventsQuery;
use crate::api::server::AppState;
use crate::error::Error;
use crate::events::{Event, EventDraft};

/// Create the events router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/event", get(latest_event).post(create_event))
        .route("/events", get(recent_events))
}

async fn index(State(state): State<AppState>) -> String {
    format!("Hello World!\nWe have {} events.\n", state.store.len())
}

/// Validate and store an event, then hand it to the dispatch queue.
///
/// A queue slot is reserved before the event is stored, so a request that is
/// cancelled while waiting on a full queue leaves nothing behind. When the
/// queue has already been closed the event is still stored and the request
/// answers `503`.
async fn create_event(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Event>)> {
    let draft = EventDraft::from_json(&body)?;

    let permit = match state.dispatcher.reserve().await {
        Ok(permit) => Some(permit),
        Err(Error::QueueClosed) => None,
        Err(e) => return Err(e.into()),
    };

    let event = state.store.add(draft);
    info!(
        event_id = %event.id(),
        severity = %event.severity(),
        title = %event.title(),
        "Event received"
    );

    match permit {
        Some(permit) => {
            permit.send(event.clone());
            Ok((StatusCode::CREATED, Json(event)))
        }
        None => {
            warn!(event_id = %event.id(), "Event stored but dispatch queue is closed");
            Err(ApiError::from(Error::QueueClosed)
                .with_details(serde_json::json!({ "id": event.id() })))
        }
    }
}

async fn latest_event(State(state): State<AppState>) -> ApiResult<Json<Event>> {
    state
        .store
        .latest()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("No events have been received"))
}

async fn recent_events(
    State(state): State<AppState>,
    query: Result<Query<RecentEventsQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Event>>> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let n = match query.n {
        Some(n) if n <= 0 => return Ok(Json(Vec::new())),
        Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
        None => state.recent_default,
    };

    Ok(Json(state.store.recent(n)))
}
