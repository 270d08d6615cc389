use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::session::LiveSession;

/// Counts reported by [`SessionRegistry::stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub sessions: usize,
    pub members: usize,
}

/// Map from session identifier to live session state.
///
/// Constructed once at start-up and shared by reference with whatever serves
/// connections. Insertion is synchronized by the registry's own lock, which
/// is never held while a session is being mutated.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<LiveSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the session for `session_id`, creating it on first use.
    /// Concurrent callers with the same identifier always observe the same
    /// instance.
    pub async fn get_or_create(&self, session_id: &str) -> Arc<LiveSession> {
        if let Some(session) = self.sessions.read().await.get(session_id) {
            return session.clone();
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!(session_id, "Creating live session");
                Arc::new(LiveSession::new(session_id))
            })
            .clone()
    }

    pub async fn get(&self, session_id: &str) -> Option<Arc<LiveSession>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn stats(&self) -> RegistryStats {
        let sessions: Vec<Arc<LiveSession>> = self.sessions.read().await.values().cloned().collect();
        let mut stats = RegistryStats {
            sessions: sessions.len(),
            members: 0,
        };
        for session in sessions {
            stats.members += session.lock().await.member_count();
        }
        stats
    }

    /// Drop every session that currently has no members.
    ///
    /// A session is only considered idle if its lock can be taken without
    /// waiting. Evicted states are flagged so a connection that resolved one
    /// just before eviction re-resolves instead of attaching to it.
    pub async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|session_id, session| match session.try_lock() {
            Some(mut state) if state.member_count() == 0 => {
                state.mark_evicted();
                debug!(session_id = %session_id, "Evicting idle session");
                false
            }
            _ => true,
        });

        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("Evicted {} idle session(s), {} remaining", evicted, sessions.len());
        }
        evicted
    }
}
