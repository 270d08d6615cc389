use std::collections::HashMap;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::error::LiveError;
use super::member::{MemberHandle, MemberId};
use crate::models::SendMessage;

/// Mutable record of one live session.
///
/// Only reachable through [`LiveSession::lock`], so every mutation of `text`
/// and `members`, and every broadcast over `members`, happens under the
/// session lock.
#[derive(Debug, Default)]
pub struct SessionState {
    text: String,
    members: HashMap<MemberId, MemberHandle>,
    hydrated: bool,
    evicted: bool,
}

impl SessionState {
    pub fn add_member(&mut self, handle: MemberHandle) {
        self.members.insert(handle.id(), handle);
    }

    /// Idempotent: removing an absent member is a no-op.
    pub fn remove_member(&mut self, id: MemberId) -> Option<MemberHandle> {
        self.members.remove(&id)
    }

    /// Last writer wins, no version check.
    pub fn set_text(&mut self, text: String) {
        self.text = text;
    }

    pub fn snapshot(&self) -> String {
        self.text.clone()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, id: MemberId) -> bool {
        self.members.contains_key(&id)
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    /// Seed the buffer from storage. Only the first call has an effect.
    pub fn hydrate(&mut self, text: String) {
        if !self.hydrated {
            self.text = text;
            self.hydrated = true;
        }
    }

    pub fn is_evicted(&self) -> bool {
        self.evicted
    }

    pub(crate) fn mark_evicted(&mut self) {
        self.evicted = true;
    }

    /// Send the current text to every member, the originator included.
    ///
    /// Members whose send fails are closed and removed before returning.
    /// Their ids are returned.
    pub async fn broadcast(&mut self) -> Result<Vec<MemberId>, LiveError> {
        let frame = serde_json::to_string(&SendMessage::update(self.text.clone()))?;

        let mut dropped = Vec::new();
        for (id, member) in self.members.iter() {
            if let Err(e) = member.send_text(frame.clone()).await {
                debug!(member_id = %id, "Dropping member after failed send: {}", e);
                dropped.push(*id);
            }
        }

        for id in &dropped {
            if let Some(member) = self.members.remove(id) {
                member.close().await;
            }
        }

        Ok(dropped)
    }
}

/// One live session: identifier plus its lock-guarded state
#[derive(Debug)]
pub struct LiveSession {
    id: String,
    state: Mutex<SessionState>,
}

impl LiveSession {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().await
    }

    pub(crate) fn try_lock(&self) -> Option<MutexGuard<'_, SessionState>> {
        self.state.try_lock().ok()
    }
}
