use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::error::LiveError;
use crate::models::SendMessage;

pub type MemberId = Uuid;

/// Sends that do not complete within this window count as a disconnect.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Outbound half of one participant's duplex channel
#[async_trait]
pub trait FrameSink: Send {
    async fn send_text(&mut self, text: String) -> Result<(), LiveError>;

    async fn close(&mut self);
}

#[async_trait]
impl FrameSink for SplitSink<WebSocket, Message> {
    async fn send_text(&mut self, text: String) -> Result<(), LiveError> {
        self.send(Message::Text(text))
            .await
            .map_err(|e| LiveError::Send(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = SinkExt::close(self).await;
    }
}

/// Connection handle shared between the loop serving a connection and the
/// `members` set of the session it is attached to.
#[derive(Clone)]
pub struct MemberHandle {
    id: MemberId,
    sink: Arc<Mutex<Box<dyn FrameSink>>>,
}

impl MemberHandle {
    pub fn new(sink: impl FrameSink + 'static) -> Self {
        Self {
            id: Uuid::new_v4(),
            sink: Arc::new(Mutex::new(Box::new(sink))),
        }
    }

    pub fn id(&self) -> MemberId {
        self.id
    }

    pub async fn send(&self, message: &SendMessage) -> Result<(), LiveError> {
        let text = serde_json::to_string(message)?;
        self.send_text(text).await
    }

    pub async fn send_text(&self, text: String) -> Result<(), LiveError> {
        let send = async {
            let mut sink = self.sink.lock().await;
            sink.send_text(text).await
        };
        match tokio::time::timeout(SEND_TIMEOUT, send).await {
            Ok(result) => result,
            Err(_) => Err(LiveError::Send("timed out".to_string())),
        }
    }

    /// Close the channel, giving up after the send timeout.
    pub async fn close(&self) {
        let close = async {
            self.sink.lock().await.close().await;
        };
        if tokio::time::timeout(SEND_TIMEOUT, close).await.is_err() {
            debug!(member_id = %self.id, "Gave up closing unresponsive member");
        }
    }
}

impl std::fmt::Debug for MemberHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemberHandle").field("id", &self.id).finish()
    }
}
