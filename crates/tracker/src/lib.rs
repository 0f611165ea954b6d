//! Unsaved-changes tracking for edit forms
//!
//! This crate provides:
//! - `ChangeTracker`: dirty flag derived from baseline vs current snapshot
//! - `Autosaver`: debounced save timer owned by one editing session
//! - `EditSession`: both of the above wired to a `SnapshotStore`

pub mod debounce;
pub mod session;
pub mod tracker;

pub use debounce::{AutosaveEvent, Autosaver, SaveHandler, SaveOutcome};
pub use session::{EditSession, SessionError, SessionOptions};
pub use tracker::ChangeTracker;
