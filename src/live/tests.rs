use axum::extract::ws::Message;
use futures_util::stream;
use std::sync::Arc;

use super::engine::{serve_connection, PersistFailurePolicy};
use super::error::LiveError;
use super::memstore::MemoryStore;
use super::registry::SessionRegistry;
use super::store::{StoreError, TextStore};
use super::testing::{FailingSink, TestClient};
use crate::models::SendMessage;

struct Fixture {
    registry: Arc<SessionRegistry>,
    store: MemoryStore,
}

impl Fixture {
    fn new() -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            store: MemoryStore::new(),
        }
    }

    fn join(&self, session_id: &str) -> TestClient {
        self.join_with(session_id, PersistFailurePolicy::Continue)
    }

    fn join_with(&self, session_id: &str, policy: PersistFailurePolicy) -> TestClient {
        TestClient::connect(
            self.registry.clone(),
            Arc::new(self.store.clone()),
            session_id,
            policy,
        )
    }

    async fn members(&self, session_id: &str) -> usize {
        match self.registry.get(session_id).await {
            Some(session) => session.lock().await.member_count(),
            None => 0,
        }
    }
}

fn snapshot(code: &str) -> SendMessage {
    SendMessage::snapshot(code.to_string())
}

fn update(code: &str) -> SendMessage {
    SendMessage::update(code.to_string())
}

#[tokio::test]
async fn creator_gets_empty_snapshot_then_own_update() {
    let fx = Fixture::new();
    let mut x = fx.join("abc123");

    assert_eq!(x.next().await, snapshot(""));
    x.send_code("hello");
    assert_eq!(x.next().await, update("hello"));
    assert_eq!(fx.store.load("abc123").await.unwrap().as_deref(), Some("hello"));
}

#[tokio::test]
async fn updates_reach_every_member_in_order() {
    let fx = Fixture::new();
    let mut x = fx.join("abc123");
    assert_eq!(x.next().await, snapshot(""));
    let mut y = fx.join("abc123");
    assert_eq!(y.next().await, snapshot(""));

    x.send_code("foo");
    assert_eq!(x.next().await, update("foo"));
    assert_eq!(y.next().await, update("foo"));

    y.send_code("bar");
    assert_eq!(x.next().await, update("bar"));
    assert_eq!(y.next().await, update("bar"));
}

#[tokio::test]
async fn failed_persist_is_reported_and_not_broadcast() {
    let fx = Fixture::new();
    let mut x = fx.join("abc123");
    let mut y = fx.join("abc123");
    assert_eq!(x.next().await, snapshot(""));
    assert_eq!(y.next().await, snapshot(""));

    x.send_code("saved");
    assert_eq!(x.next().await, update("saved"));
    assert_eq!(y.next().await, update("saved"));

    fx.store.set_failing(true);
    x.send_code("lost");
    assert!(matches!(x.next().await, SendMessage::Error(_)));
    assert!(y.is_quiet().await);

    let session = fx.registry.get("abc123").await.unwrap();
    assert_eq!(session.lock().await.snapshot(), "saved");

    // Continue policy: the connection keeps serving once storage recovers.
    fx.store.set_failing(false);
    x.send_code("recovered");
    assert_eq!(x.next().await, update("recovered"));
    assert_eq!(y.next().await, update("recovered"));
}

#[tokio::test]
async fn disconnect_policy_closes_the_writer_only() {
    let fx = Fixture::new();
    let mut x = fx.join_with("abc123", PersistFailurePolicy::Disconnect);
    let mut y = fx.join("abc123");
    assert_eq!(x.next().await, snapshot(""));
    assert_eq!(y.next().await, snapshot(""));

    fx.store.set_failing(true);
    x.send_code("lost");
    assert!(matches!(x.next().await, SendMessage::Error(_)));
    assert!(matches!(
        x.finished().await,
        Err(LiveError::Store(StoreError::Unavailable(_)))
    ));
    assert_eq!(fx.members("abc123").await, 1);
    assert!(y.is_quiet().await);
}

#[tokio::test]
async fn disconnected_member_is_skipped_silently() {
    let fx = Fixture::new();
    let mut x = fx.join("abc123");
    let mut y = fx.join("abc123");
    assert_eq!(x.next().await, snapshot(""));
    assert_eq!(y.next().await, snapshot(""));

    assert!(x.disconnect().await.is_ok());
    assert_eq!(fx.members("abc123").await, 1);

    y.send_code("bar");
    assert_eq!(y.next().await, update("bar"));
}

#[tokio::test]
async fn dead_socket_is_dropped_during_broadcast() {
    let fx = Fixture::new();
    let mut x = fx.join("abc123");
    let mut y = fx.join("abc123");
    assert_eq!(x.next().await, snapshot(""));
    assert_eq!(y.next().await, snapshot(""));
    assert_eq!(fx.members("abc123").await, 2);

    x.kill_outbound();
    y.send_code("bar");
    assert_eq!(y.next().await, update("bar"));

    // The round that hit the dead socket has released the lock by now.
    assert_eq!(fx.members("abc123").await, 1);

    y.send_code("baz");
    assert_eq!(y.next().await, update("baz"));
}

#[tokio::test]
async fn dropped_member_cannot_keep_writing() {
    let fx = Fixture::new();
    let mut x = fx.join("abc123");
    let mut y = fx.join("abc123");
    assert_eq!(x.next().await, snapshot(""));
    assert_eq!(y.next().await, snapshot(""));

    x.kill_outbound();
    y.send_code("bar");
    assert_eq!(y.next().await, update("bar"));
    assert_eq!(fx.members("abc123").await, 1);

    x.send_code("zombie");
    assert!(matches!(x.finished().await, Err(LiveError::Dropped)));
    assert!(y.is_quiet().await);
    assert_eq!(fx.store.load("abc123").await.unwrap().as_deref(), Some("bar"));

    let session = fx.registry.get("abc123").await.unwrap();
    assert_eq!(session.lock().await.snapshot(), "bar");
}

#[tokio::test]
async fn failed_snapshot_send_aborts_attach() {
    let fx = Fixture::new();
    fx.store.save("abc123", "text").await.unwrap();

    let result = serve_connection(
        &fx.registry,
        "abc123",
        Arc::new(fx.store.clone()),
        FailingSink,
        stream::pending::<Result<Message, axum::Error>>(),
        PersistFailurePolicy::Continue,
    )
    .await;

    assert!(matches!(result, Err(LiveError::Send(_))));
    assert_eq!(fx.members("abc123").await, 0);
}

#[tokio::test]
async fn late_joiner_sees_latest_persisted_text() {
    let fx = Fixture::new();
    let mut x = fx.join("abc123");
    assert_eq!(x.next().await, snapshot(""));

    x.send_code("first");
    assert_eq!(x.next().await, update("first"));

    fx.store.set_failing(true);
    x.send_code("never saved");
    assert!(matches!(x.next().await, SendMessage::Error(_)));
    fx.store.set_failing(false);

    let mut y = fx.join("abc123");
    assert_eq!(y.next().await, snapshot("first"));
}

#[tokio::test]
async fn fresh_session_is_hydrated_from_storage() {
    let fx = Fixture::new();
    fx.store.save("abc123", "from storage").await.unwrap();

    let mut x = fx.join("abc123");
    assert_eq!(x.next().await, snapshot("from storage"));
    x.disconnect().await.unwrap();

    assert_eq!(fx.registry.evict_idle().await, 1);
    let mut y = fx.join("abc123");
    assert_eq!(y.next().await, snapshot("from storage"));
}

#[tokio::test]
async fn malformed_frames_are_rejected_without_side_effects() {
    let fx = Fixture::new();
    let mut x = fx.join("abc123");
    let mut y = fx.join("abc123");
    assert_eq!(x.next().await, snapshot(""));
    assert_eq!(y.next().await, snapshot(""));

    x.send_raw(Message::Text("{not json".to_string()));
    assert!(matches!(x.next().await, SendMessage::Error(_)));
    x.send_raw(Message::Binary(vec![1, 2, 3]));
    assert!(matches!(x.next().await, SendMessage::Error(_)));
    assert!(y.is_quiet().await);
    assert_eq!(fx.store.load("abc123").await.unwrap(), None);

    // Loop is still alive.
    x.send_code("ok");
    assert_eq!(x.next().await, update("ok"));
    assert_eq!(y.next().await, update("ok"));
}

#[tokio::test]
async fn ping_gets_pong_and_leaves_text_alone() {
    let fx = Fixture::new();
    let mut x = fx.join("abc123");
    assert_eq!(x.next().await, snapshot(""));

    x.send_raw(Message::Text(r#"{"type":"ping"}"#.to_string()));
    assert!(matches!(x.next().await, SendMessage::Pong(_)));
    assert_eq!(fx.store.load("abc123").await.unwrap(), None);
}

#[tokio::test]
async fn legacy_code_frames_are_applied() {
    let fx = Fixture::new();
    let mut x = fx.join("abc123");
    assert_eq!(x.next().await, snapshot(""));

    x.send_raw(Message::Text(r#"{"code":"SELECT 1;"}"#.to_string()));
    assert_eq!(x.next().await, update("SELECT 1;"));
}

#[tokio::test]
async fn close_frame_detaches() {
    let fx = Fixture::new();
    let mut x = fx.join("abc123");
    assert_eq!(x.next().await, snapshot(""));

    x.send_raw(Message::Close(None));
    assert!(x.finished().await.is_ok());
    assert_eq!(fx.members("abc123").await, 0);
}

#[tokio::test]
async fn sessions_are_isolated() {
    let fx = Fixture::new();
    let mut a = fx.join("abc123");
    let mut b = fx.join("xyz789");
    assert_eq!(a.next().await, snapshot(""));
    assert_eq!(b.next().await, snapshot(""));

    a.send_code("only a");
    assert_eq!(a.next().await, update("only a"));
    assert!(b.is_quiet().await);
    assert_eq!(fx.store.load("xyz789").await.unwrap(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_converge() {
    let fx = Fixture::new();
    let mut clients = Vec::new();
    for _ in 0..4 {
        let mut client = fx.join("abc123");
        assert_eq!(client.next().await, snapshot(""));
        clients.push(client);
    }

    const ROUNDS: usize = 10;
    for (i, client) in clients.iter().enumerate() {
        for round in 0..ROUNDS {
            client.send_code(&format!("{}-{}", i, round));
        }
    }

    let total = clients.len() * ROUNDS;
    let mut histories = Vec::new();
    for client in clients.iter_mut() {
        let mut seen = Vec::with_capacity(total);
        for _ in 0..total {
            match client.next().await {
                SendMessage::Update(msg) => seen.push(msg.code),
                other => panic!("unexpected message {:?}", other),
            }
        }
        histories.push(seen);
    }

    // Every member saw the same rounds in the same order.
    assert!(histories.iter().all(|h| h == &histories[0]));

    let last = histories[0].last().cloned().unwrap();
    let session = fx.registry.get("abc123").await.unwrap();
    assert_eq!(session.lock().await.snapshot(), last);
    assert_eq!(fx.store.load("abc123").await.unwrap(), Some(last));
}

#[tokio::test]
async fn attach_fails_when_storage_cannot_load() {
    struct BrokenStore;

    #[async_trait::async_trait]
    impl TextStore for BrokenStore {
        async fn save(&self, _: &str, _: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".to_string()))
        }

        async fn load(&self, _: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("down".to_string()))
        }
    }

    let registry = Arc::new(SessionRegistry::new());
    let client = TestClient::connect(
        registry.clone(),
        Arc::new(BrokenStore),
        "abc123",
        PersistFailurePolicy::Continue,
    );
    assert!(matches!(client.finished().await, Err(LiveError::Store(_))));

    let session = registry.get("abc123").await.unwrap();
    let state = session.lock().await;
    assert_eq!(state.member_count(), 0);
    assert!(!state.is_hydrated());
}
