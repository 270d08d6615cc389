use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use super::store_error_reply;
use crate::models::{CreateSessionResponse, ErrorResponse, SessionInfoResponse};
use crate::state::AppState;

/// Create a new session with an unguessable identifier
pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), (StatusCode, Json<ErrorResponse>)> {
    let session_id = Uuid::new_v4().simple().to_string();

    let record = state.provider.create_session(&session_id).await.map_err(|e| {
        error!("Failed to create session '{}': {}", session_id, e);
        store_error_reply(&e)
    })?;
    info!("Session '{}' created", record.session_id);

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: record.session_id,
            created_at: record.created_at,
        }),
    ))
}

/// Look up a session before joining it
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<(StatusCode, Json<SessionInfoResponse>), (StatusCode, Json<ErrorResponse>)> {
    let record = state
        .provider
        .describe(&session_id)
        .await
        .map_err(|e| store_error_reply(&e))?;

    let store = state
        .provider
        .open(&session_id)
        .await
        .map_err(|e| store_error_reply(&e))?;
    let code = store
        .load(&session_id)
        .await
        .map_err(|e| {
            error!("Failed to load code for session '{}': {}", session_id, e);
            store_error_reply(&e)
        })?
        .unwrap_or_default();

    let members = match state.registry.get(&session_id).await {
        Some(session) => session.lock().await.member_count() as u32,
        None => 0,
    };

    Ok((
        StatusCode::OK,
        Json(SessionInfoResponse {
            session_id: record.session_id,
            created_at: record.created_at,
            code,
            members,
        }),
    ))
}
