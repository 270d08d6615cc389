use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

use super::registry::SessionRegistry;

/// Periodically evict sessions that have no members left.
pub fn spawn_idle_sweeper(registry: Arc<SessionRegistry>, every: Duration) -> JoinHandle<()> {
    info!("Idle session sweeper running every {}s", every.as_secs());
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            registry.evict_idle().await;
        }
    })
}
