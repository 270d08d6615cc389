use thiserror::Error;

use super::store::StoreError;

#[derive(Debug, Error)]
pub enum LiveError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to send to member: {0}")]
    Send(String),

    #[error("member was dropped from the session")]
    Dropped,

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}
