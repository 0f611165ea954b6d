//! Formkeep Core - snapshot primitives for unsaved-changes tracking
//!
//! This crate provides:
//! - Snapshot model (JSON object of form fields)
//! - Structural equality with an explicit null policy
//! - Changed-field listing for status display
//! - BLAKE3 fingerprints over a canonical encoding

pub mod equality;
pub mod fingerprint;
pub mod snapshot;

// Re-export main types for convenience
pub use equality::{changed_paths, evaluate, structurally_equal, values_equal, NullPolicy};
pub use fingerprint::Fingerprint;
pub use snapshot::{Snapshot, SnapshotError};

/// Common result type used throughout formkeep-core
pub type Result<T> = anyhow::Result<T>;
