pub mod diagnostics;
pub mod health;
pub mod live;
pub mod session;

pub use diagnostics::*;
pub use health::*;
pub use live::*;
pub use session::*;

use axum::{http::StatusCode, Json};

use crate::live::StoreError;
use crate::models::ErrorResponse;

/// Map a storage failure to an HTTP error response
pub(crate) fn store_error_reply(err: &StoreError) -> (StatusCode, Json<ErrorResponse>) {
    match err {
        StoreError::NotFound(session_id) => ErrorResponse::reply(
            StatusCode::NOT_FOUND,
            format!("Session '{}' not found", session_id),
        ),
        StoreError::Database(_) | StoreError::Unavailable(_) => ErrorResponse::reply(
            StatusCode::SERVICE_UNAVAILABLE,
            format!("Session storage unavailable: {}", err),
        ),
    }
}
