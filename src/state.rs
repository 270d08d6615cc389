use std::sync::Arc;

use crate::live::{PersistFailurePolicy, SessionRegistry, StoreProvider};

/// Shared state handed to every request handler
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub provider: Arc<dyn StoreProvider>,
    pub persist_failure_policy: PersistFailurePolicy,
}

impl AppState {
    pub fn new(
        registry: Arc<SessionRegistry>,
        provider: Arc<dyn StoreProvider>,
        persist_failure_policy: PersistFailurePolicy,
    ) -> Self {
        Self {
            registry,
            provider,
            persist_failure_policy,
        }
    }
}
