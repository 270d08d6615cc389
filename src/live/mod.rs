//! Session-scoped real-time broadcast engine.

pub mod engine;
pub mod error;
pub mod member;
pub mod memstore;
pub mod registry;
pub mod session;
pub mod store;
pub mod sweeper;

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod tests;

pub use engine::{serve_connection, PersistFailurePolicy};
pub use error::LiveError;
pub use member::{FrameSink, MemberHandle, MemberId};
pub use memstore::MemoryStore;
pub use registry::{RegistryStats, SessionRegistry};
pub use session::{LiveSession, SessionState};
pub use store::{SessionRecord, StoreError, StoreProvider, TextStore};
