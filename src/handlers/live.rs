use axum::{
    extract::{ws::WebSocketUpgrade, Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use futures_util::StreamExt;
use std::sync::Arc;
use tracing::{error, info};

use super::store_error_reply;
use crate::live::serve_connection;
use crate::models::ErrorResponse;
use crate::state::AppState;

/// WebSocket endpoint for live editing of one session.
///
/// The session's store is resolved before the upgrade, so an unknown or
/// unreachable session is reported as a plain HTTP error.
pub async fn live_session(
    Path(session_id): Path<String>,
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    info!("New WebSocket connection attempt for session {}", session_id);

    let store = state.provider.open(&session_id).await.map_err(|e| {
        error!("Cannot open session '{}': {}", session_id, e);
        store_error_reply(&e)
    })?;

    Ok(ws.on_upgrade(move |socket| async move {
        let (sink, stream) = socket.split();
        if let Err(e) = serve_connection(
            &state.registry,
            &session_id,
            store,
            sink,
            stream,
            state.persist_failure_policy,
        )
        .await
        {
            error!("Connection to session '{}' ended with error: {}", session_id, e);
        }
    }))
}
