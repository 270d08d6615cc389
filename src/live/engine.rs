use axum::extract::ws::Message;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::error::LiveError;
use super::member::{FrameSink, MemberHandle};
use super::registry::SessionRegistry;
use super::session::LiveSession;
use super::store::TextStore;
use crate::models::{ReceivedMessage, SendMessage};

/// What a connection does after one of its updates failed to persist.
/// The failure is always reported to the originating connection first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistFailurePolicy {
    /// Keep the connection and wait for the next update
    #[default]
    Continue,
    /// Close the connection
    Disconnect,
}

/// Serve one participant from attach to detach.
///
/// Resolves (or creates) the session, attaches the connection, pushes the
/// snapshot and then runs the receive loop until the inbound stream ends or
/// fails. The member is always removed from the session before returning.
pub async fn serve_connection<K, S>(
    registry: &SessionRegistry,
    session_id: &str,
    store: Arc<dyn TextStore>,
    sink: K,
    inbound: S,
    policy: PersistFailurePolicy,
) -> Result<(), LiveError>
where
    K: FrameSink + 'static,
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let member = MemberHandle::new(sink);

    let session = match attach(registry, session_id, store.as_ref(), &member).await {
        Ok(session) => session,
        Err(e) => {
            error!(session_id, member_id = %member.id(), "Failed to attach connection: {}", e);
            member.close().await;
            return Err(e);
        }
    };
    info!(session_id, member_id = %member.id(), "Connection attached");

    let result = receive_loop(&session, store.as_ref(), &member, inbound, policy).await;

    detach(&session, &member).await;
    info!(session_id, member_id = %member.id(), "Connection detached");
    result
}

/// Register `member` with the session and send it the current snapshot.
///
/// The first attach of a fresh session hydrates its text from `store`. Both
/// steps happen under the session lock, so no broadcast can reach the member
/// before its snapshot.
pub async fn attach(
    registry: &SessionRegistry,
    session_id: &str,
    store: &dyn TextStore,
    member: &MemberHandle,
) -> Result<Arc<LiveSession>, LiveError> {
    loop {
        let session = registry.get_or_create(session_id).await;
        let mut state = session.lock().await;

        // Lost a race with the idle sweeper, resolve again.
        if state.is_evicted() {
            continue;
        }

        if !state.is_hydrated() {
            let persisted = store.load(session_id).await?;
            state.hydrate(persisted.unwrap_or_default());
        }

        state.add_member(member.clone());
        if let Err(e) = member.send(&SendMessage::snapshot(state.snapshot())).await {
            state.remove_member(member.id());
            return Err(e);
        }

        drop(state);
        return Ok(session);
    }
}

/// Remove `member` from the session and release its channel.
pub async fn detach(session: &LiveSession, member: &MemberHandle) {
    session.lock().await.remove_member(member.id());
    member.close().await;
}

async fn receive_loop<S>(
    session: &LiveSession,
    store: &dyn TextStore,
    member: &MemberHandle,
    mut inbound: S,
    policy: PersistFailurePolicy,
) -> Result<(), LiveError>
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let session_id = session.id();

    while let Some(frame) = inbound.next().await {
        let payload = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(_)) => {
                reject(session_id, member, "binary frames are not supported").await?;
                continue;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => break,
            Err(e) => {
                debug!(session_id, member_id = %member.id(), "Receive failed: {}", e);
                break;
            }
        };

        let message = match ReceivedMessage::parse(&payload) {
            Ok(message) => message,
            Err(e) => {
                reject(session_id, member, &e).await?;
                continue;
            }
        };

        match message {
            ReceivedMessage::Replace(replace) => {
                match apply_update(session, store, member, replace.code).await {
                    Ok(()) => {}
                    Err(e @ LiveError::Store(_)) => match policy {
                        PersistFailurePolicy::Continue => continue,
                        PersistFailurePolicy::Disconnect => return Err(e),
                    },
                    Err(e) => return Err(e),
                }
            }
            ReceivedMessage::Ping => {
                member.send(&SendMessage::pong()).await?;
            }
        }
    }

    Ok(())
}

/// One broadcast round: persist, replace the text, send it to every member.
///
/// Nothing is changed or sent if the save fails; the originator is told
/// instead. Updates from a member that is no longer in the session end its
/// connection. The session lock is held for the whole round.
async fn apply_update(
    session: &LiveSession,
    store: &dyn TextStore,
    member: &MemberHandle,
    text: String,
) -> Result<(), LiveError> {
    let session_id = session.id();
    let mut state = session.lock().await;

    // A failed send in an earlier round already detached this member.
    if !state.contains(member.id()) {
        debug!(session_id, member_id = %member.id(), "Ignoring update from dropped member");
        return Err(LiveError::Dropped);
    }

    if let Err(e) = store.save(session_id, &text).await {
        error!(session_id, member_id = %member.id(), "Failed to persist update: {}", e);
        if let Err(send_err) = member
            .send(&SendMessage::error(format!("Failed to save update: {}", e)))
            .await
        {
            debug!(session_id, member_id = %member.id(), "Could not report persist failure: {}", send_err);
        }
        return Err(LiveError::Store(e));
    }

    state.set_text(text);
    let dropped = state.broadcast().await?;
    if !dropped.is_empty() {
        info!(
            session_id,
            "Dropped {} member(s) during broadcast, {} remaining",
            dropped.len(),
            state.member_count()
        );
    }
    Ok(())
}

/// Tell the sender its message was rejected. Shared state is untouched.
async fn reject(session_id: &str, member: &MemberHandle, reason: &str) -> Result<(), LiveError> {
    warn!(session_id, member_id = %member.id(), "Rejected message: {}", reason);
    member
        .send(&SendMessage::error(format!("Malformed message: {}", reason)))
        .await
}
