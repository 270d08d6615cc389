use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::store::{SessionRecord, StoreError, StoreProvider, TextStore};

#[derive(Default)]
struct MemoryInner {
    sessions: HashMap<String, SessionRecord>,
    texts: HashMap<String, String>,
}

/// Process-local store used when no database is configured.
///
/// Clones share the same records. Saves can be made to fail with
/// [`MemoryStore::set_failing`] to simulate an unavailable backend.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
    failing: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn guard(&self) -> Result<MutexGuard<'_, MemoryInner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))
    }
}

#[async_trait]
impl TextStore for MemoryStore {
    async fn save(&self, session_id: &str, text: &str) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated save failure".to_string()));
        }
        self.guard()?
            .texts
            .insert(session_id.to_string(), text.to_string());
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self.guard()?.texts.get(session_id).cloned())
    }
}

#[async_trait]
impl StoreProvider for MemoryStore {
    async fn create_session(&self, session_id: &str) -> Result<SessionRecord, StoreError> {
        let mut inner = self.guard()?;
        let record = inner
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionRecord {
                session_id: session_id.to_string(),
                created_at: Utc::now(),
            });
        Ok(record.clone())
    }

    async fn describe(&self, session_id: &str) -> Result<SessionRecord, StoreError> {
        self.guard()?
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(session_id.to_string()))
    }

    async fn open(&self, session_id: &str) -> Result<Arc<dyn TextStore>, StoreError> {
        self.describe(session_id).await?;
        Ok(Arc::new(self.clone()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.guard().map(|_| ())
    }
}
