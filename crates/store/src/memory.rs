//! In-memory snapshot store
//!
//! Used for ephemeral sessions and tests. Supports injected save failures
//! and per-save latency to exercise autosave error and ordering paths.

use crate::{validate_session, Revision, RetentionPolicy, SaveReason, SnapshotStore, StoreError};
use anyhow::Result;
use async_trait::async_trait;
use formkeep_core::Snapshot;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Snapshot store kept entirely in process memory
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, Vec<Revision>>>,
    policy: RetentionPolicy,
    fail_next: AtomicUsize,
    save_calls: AtomicUsize,
    delays: Mutex<VecDeque<Duration>>,
}

impl MemoryStore {
    /// Create an empty store with the default retention policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific retention policy
    pub fn with_policy(mut self, policy: RetentionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Delay one upcoming save by `latency` (tokio time)
    ///
    /// Calls queue up: the first call delays the next save, the second call
    /// the save after it, and so on.
    pub fn delay_next_save(&self, latency: Duration) {
        self.delays.lock().push_back(latency);
    }

    /// Seed a session with an initial snapshot
    pub fn insert(&self, session: &str, snapshot: Snapshot) {
        let revision = Revision::new(session, snapshot, SaveReason::Manual);
        self.sessions
            .write()
            .entry(session.to_string())
            .or_default()
            .push(revision);
    }

    /// Make the next `count` saves fail
    pub fn fail_next_saves(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Number of save calls received, including failed ones
    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    /// Revisions of a session, oldest first
    pub fn revisions(&self, session: &str) -> Vec<Revision> {
        self.sessions
            .read()
            .get(session)
            .cloned()
            .unwrap_or_default()
    }

    fn take_failure(&self) -> bool {
        self.fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn load(&self, session: &str) -> Result<Option<Snapshot>> {
        validate_session(session)?;
        Ok(self
            .sessions
            .read()
            .get(session)
            .and_then(|revs| revs.last())
            .map(|rev| rev.snapshot.clone()))
    }

    async fn save(&self, session: &str, snapshot: &Snapshot, reason: SaveReason) -> Result<Snapshot> {
        validate_session(session)?;
        self.save_calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.delays.lock().pop_front();
        if let Some(latency) = delay {
            tokio::time::sleep(latency).await;
        }
        if self.take_failure() {
            return Err(StoreError::SaveRejected(session.to_string()).into());
        }

        let mut sessions = self.sessions.write();
        let revisions = sessions.entry(session.to_string()).or_default();
        let fingerprint = snapshot.fingerprint();
        if revisions.last().map(|rev| rev.fingerprint) != Some(fingerprint) {
            revisions.push(Revision::new(session, snapshot.clone(), reason));
            let expired = self.policy.expired_count(revisions.len());
            revisions.drain(..expired);
        }
        Ok(snapshot.clone())
    }
}
