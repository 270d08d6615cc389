//! Channel-backed connections for driving the engine in tests.

use async_trait::async_trait;
use axum::extract::ws::Message;
use futures_util::stream::{self, Stream};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::engine::{serve_connection, PersistFailurePolicy};
use super::error::LiveError;
use super::member::FrameSink;
use super::registry::SessionRegistry;
use super::store::TextStore;
use crate::models::SendMessage;

pub struct ChannelSink(mpsc::UnboundedSender<String>);

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send_text(&mut self, text: String) -> Result<(), LiveError> {
        self.0
            .send(text)
            .map_err(|_| LiveError::Send("receiver dropped".to_string()))
    }

    async fn close(&mut self) {}
}

/// Never completes a send or a close, like a peer that stopped reading.
pub struct StalledSink;

#[async_trait]
impl FrameSink for StalledSink {
    async fn send_text(&mut self, _text: String) -> Result<(), LiveError> {
        std::future::pending().await
    }

    async fn close(&mut self) {
        std::future::pending::<()>().await
    }
}

/// Fails every send.
pub struct FailingSink;

#[async_trait]
impl FrameSink for FailingSink {
    async fn send_text(&mut self, _text: String) -> Result<(), LiveError> {
        Err(LiveError::Send("connection reset".to_string()))
    }

    async fn close(&mut self) {}
}

type Inbound = Result<Message, axum::Error>;

fn inbound_stream(rx: mpsc::UnboundedReceiver<Inbound>) -> impl Stream<Item = Inbound> + Unpin {
    Box::pin(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    }))
}

/// A fake participant connected through [`serve_connection`]
pub struct TestClient {
    tx: mpsc::UnboundedSender<Inbound>,
    rx: mpsc::UnboundedReceiver<String>,
    task: JoinHandle<Result<(), LiveError>>,
}

impl TestClient {
    pub fn connect(
        registry: Arc<SessionRegistry>,
        store: Arc<dyn TextStore>,
        session_id: &str,
        policy: PersistFailurePolicy,
    ) -> Self {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (sink, out_rx) = ChannelSink::new();
        let session_id = session_id.to_string();
        let task = tokio::spawn(async move {
            serve_connection(&registry, &session_id, store, sink, inbound_stream(in_rx), policy).await
        });
        Self { tx: in_tx, rx: out_rx, task }
    }

    pub fn send_raw(&self, message: Message) {
        self.tx.send(Ok(message)).expect("connection task gone");
    }

    pub fn send_code(&self, code: &str) {
        let frame = serde_json::json!({"type": "replace", "code": code}).to_string();
        self.send_raw(Message::Text(frame));
    }

    /// Next outbound message, failing the test after a second of silence.
    pub async fn next(&mut self) -> SendMessage {
        let frame = tokio::time::timeout(Duration::from_secs(1), self.rx.recv())
            .await
            .expect("timed out waiting for a message")
            .expect("connection closed");
        serde_json::from_str(&frame).expect("invalid outbound frame")
    }

    /// True if nothing arrives within a short window.
    pub async fn is_quiet(&mut self) -> bool {
        tokio::time::timeout(Duration::from_millis(100), self.rx.recv())
            .await
            .is_err()
    }

    /// Close the inbound side and wait for the connection to detach.
    pub async fn disconnect(self) -> Result<(), LiveError> {
        drop(self.tx);
        self.task.await.expect("connection task panicked")
    }

    /// Wait for the connection to finish on its own.
    pub async fn finished(self) -> Result<(), LiveError> {
        tokio::time::timeout(Duration::from_secs(1), self.task)
            .await
            .expect("connection did not finish")
            .expect("connection task panicked")
    }

    /// Drop the outbound receiver to simulate a dead socket while the
    /// connection task keeps running.
    pub fn kill_outbound(&mut self) {
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }
}
