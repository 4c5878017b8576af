//! Health check routes.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};

use crate::api::models::{DispatchHealth, EventHistoryHealth, HealthResponse};
use crate::api::server::AppState;

/// Create the health router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness_check))
}

/// Health check endpoint.
///
/// Reports `degraded` once the dispatch queue has been closed.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let dispatcher = &state.dispatcher;
    let closed = dispatcher.is_closed();

    Json(HealthResponse {
        status: if closed { "degraded" } else { "healthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        events: EventHistoryHealth {
            stored: state.store.len(),
            capacity: state.store.capacity(),
            total: state.store.total_added(),
        },
        dispatch: DispatchHealth {
            notifiers: state.notifier_types.to_vec(),
            queue_capacity: dispatcher.capacity(),
            pending: dispatcher.pending(),
            closed,
            stats: dispatcher.stats(),
        },
    })
}

/// Liveness check - is the service alive?
async fn liveness_check(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "alive",
            "uptime_secs": uptime
        })),
    )
}
