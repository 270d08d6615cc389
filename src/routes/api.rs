use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers::{create_session, diagnostics, get_session, health_check, ready_check};
use crate::state::AppState;

/// Create API routes
pub fn create_api_routes(state: Arc<AppState>) -> Router {
    Router::<Arc<AppState>>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/v1/sessions", post(create_session))
        .route("/v1/sessions/:id", get(get_session))
        .route("/v1/diagnostics", get(diagnostics))
        .with_state(state)
}
