//! API route modules.

pub mod events;
pub mod health;
pub mod logging;

use axum::Router;

use crate::api::server::AppState;

/// Create the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(events::router())
        .nest("/health", health::router())
        .nest("/logging", logging::router())
        .with_state(state)
}
