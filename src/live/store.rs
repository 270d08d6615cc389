use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by the persistence and provisioning collaborators
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session '{0}' not found")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A provisioned session as known to the storage layer
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

/// Durable storage for the latest text of a session.
///
/// `save` is an upsert: it creates the record if absent and overwrites it
/// otherwise, so it can be called repeatedly for the same session.
#[async_trait]
pub trait TextStore: Send + Sync {
    async fn save(&self, session_id: &str, text: &str) -> Result<(), StoreError>;

    /// Latest persisted text, `None` if nothing was ever saved.
    async fn load(&self, session_id: &str) -> Result<Option<String>, StoreError>;
}

/// Provisions sessions and hands out a ready-to-use store scoped to one.
#[async_trait]
pub trait StoreProvider: Send + Sync {
    async fn create_session(&self, session_id: &str) -> Result<SessionRecord, StoreError>;

    async fn describe(&self, session_id: &str) -> Result<SessionRecord, StoreError>;

    /// Resolve the store for an existing session.
    /// Fails with [`StoreError::NotFound`] for unknown identifiers.
    async fn open(&self, session_id: &str) -> Result<Arc<dyn TextStore>, StoreError>;

    /// Readiness probe
    async fn ping(&self) -> Result<(), StoreError>;
}
