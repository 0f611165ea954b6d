//! Snapshot persistence for edit sessions
//!
//! This crate provides:
//! - The `SnapshotStore` collaborator trait (load / save)
//! - Revision records (ULID-based IDs, BLAKE3 fingerprints)
//! - Append-only revision journal per session (sled embedded DB)
//! - In-memory store for tests and ephemeral sessions
//! - Retention policy

pub mod journal;
pub mod memory;
pub mod retention;
pub mod revision;

use async_trait::async_trait;
use formkeep_core::Snapshot;

// Re-exports
pub use journal::SledStore;
pub use memory::MemoryStore;
pub use retention::RetentionPolicy;
pub use revision::{Revision, SaveReason};

/// Result type for store operations
pub type Result<T> = anyhow::Result<T>;

/// Errors raised by store implementations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Session keys must be non-empty and free of NUL bytes
    #[error("invalid session key: {0:?}")]
    InvalidSession(String),

    /// A stored revision could not be decoded
    #[error("corrupt revision in session '{session}': {reason}")]
    Corrupt { session: String, reason: String },

    /// Save refused (injected by `MemoryStore::fail_next_saves`)
    #[error("save rejected for session '{0}'")]
    SaveRejected(String),
}

/// Persistence collaborator used by edit sessions
///
/// `load` yields the initial snapshot of a session (`None` when the session
/// has never been saved). `save` stores a snapshot and returns the value
/// the store confirmed.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the latest stored snapshot of a session
    async fn load(&self, session: &str) -> Result<Option<Snapshot>>;

    /// Store a snapshot, returning the confirmed stored value
    async fn save(&self, session: &str, snapshot: &Snapshot, reason: SaveReason) -> Result<Snapshot>;
}

pub(crate) fn validate_session(session: &str) -> std::result::Result<(), StoreError> {
    if session.is_empty() || session.contains('\0') {
        return Err(StoreError::InvalidSession(session.to_string()));
    }
    Ok(())
}
