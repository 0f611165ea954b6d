//! Editing session: tracker + autosaver wired to a snapshot store

use crate::debounce::{AutosaveEvent, Autosaver, SaveHandler, SaveOutcome};
use crate::tracker::ChangeTracker;
use anyhow::{Context, Result};
use async_trait::async_trait;
use formkeep_core::{NullPolicy, Snapshot, SnapshotError};
use formkeep_store::{SaveReason, SnapshotStore};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Session behaviour knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Save automatically after `autosave_delay` without edits
    pub autosave: bool,
    /// Debounce quiet period (default: 30s)
    pub autosave_delay: Duration,
    /// How absent keys compare against explicit nulls
    pub null_policy: NullPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            autosave: true,
            autosave_delay: Duration::from_secs(30),
            null_policy: NullPolicy::Distinct,
        }
    }
}

/// Errors surfaced by session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Leaving the session would discard edits
    #[error("session '{}' has {} unsaved field(s)", .key, .fields.len())]
    UnsavedChanges { key: String, fields: Vec<String> },

    /// An edit could not be applied to the snapshot
    #[error(transparent)]
    Edit(#[from] SnapshotError),
}

/// Serializes store writes of one session
///
/// Holds the generation of the newest snapshot written so far. A save
/// scheduled under an older generation is dropped instead of overwriting a
/// newer one.
#[derive(Default)]
struct WriteGate {
    written: tokio::sync::Mutex<u64>,
}

/// Autosave handler: store the snapshot, then advance the tracker baseline
struct StoreSaver {
    key: String,
    store: Arc<dyn SnapshotStore>,
    tracker: Arc<Mutex<ChangeTracker>>,
    gate: Arc<WriteGate>,
}

#[async_trait]
impl SaveHandler for StoreSaver {
    async fn save(&self, snapshot: Snapshot, generation: u64) -> Result<SaveOutcome> {
        let mut written = self.gate.written.lock().await;
        if *written > generation {
            debug!(
                "Session '{}': autosave of generation {} superseded by {}",
                self.key, generation, *written
            );
            return Ok(SaveOutcome::Superseded);
        }

        let confirmed = self
            .store
            .save(&self.key, &snapshot, SaveReason::Autosave)
            .await
            .with_context(|| format!("Failed to autosave session '{}'", self.key))?;
        *written = generation;

        let dirty = self.tracker.lock().mark_saved(confirmed);
        debug!("Session '{}' autosaved (still dirty: {})", self.key, dirty);
        Ok(SaveOutcome::Saved)
    }
}

/// One editing session over a stored snapshot
///
/// Dropping the session cancels any pending autosave timer.
pub struct EditSession {
    key: String,
    store: Arc<dyn SnapshotStore>,
    tracker: Arc<Mutex<ChangeTracker>>,
    gate: Arc<WriteGate>,
    autosaver: Autosaver,
    options: SessionOptions,
}

impl EditSession {
    /// Load `key` from the store and start tracking edits against it
    ///
    /// A session that was never saved starts from an empty snapshot.
    pub async fn open(store: Arc<dyn SnapshotStore>, key: &str, options: SessionOptions) -> Result<Self> {
        let initial = store
            .load(key)
            .await
            .with_context(|| format!("Failed to load session '{}'", key))?
            .unwrap_or_default();

        let mut tracker = ChangeTracker::new(options.null_policy);
        tracker.load(initial.clone());
        tracker.evaluate(initial.clone());
        let tracker = Arc::new(Mutex::new(tracker));
        let gate = Arc::new(WriteGate::default());

        let handler = Arc::new(StoreSaver {
            key: key.to_string(),
            store: Arc::clone(&store),
            tracker: Arc::clone(&tracker),
            gate: Arc::clone(&gate),
        });
        let autosaver = Autosaver::new(options.autosave_delay, options.null_policy, handler);
        autosaver.mark_saved(initial);

        info!("Opened session '{}' (autosave: {})", key, options.autosave);
        Ok(Self {
            key: key.to_string(),
            store,
            tracker,
            gate,
            autosaver,
            options,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    /// Feed the latest form state; returns the dirty flag
    pub fn update(&self, current: Snapshot) -> bool {
        let changed = self.tracker.lock().evaluate(current.clone());
        self.autosaver.schedule(self.options.autosave, changed, current);
        changed
    }

    /// Apply `edit` to a copy of the current snapshot and feed the result
    ///
    /// Nothing changes when `edit` fails.
    pub fn edit<F>(&self, edit: F) -> Result<bool, SessionError>
    where
        F: FnOnce(&mut Snapshot) -> Result<(), SnapshotError>,
    {
        let mut next = self.current();
        edit(&mut next)?;
        Ok(self.update(next))
    }

    /// Save the current snapshot explicitly
    ///
    /// Waits for an autosave already writing to the store, so the manual
    /// save always lands after it. On failure the session stays dirty, the
    /// autosave timer is restarted and the error is returned.
    pub async fn save(&self) -> Result<Snapshot> {
        let snapshot = self.current();
        self.autosaver.cancel();
        let generation = self.autosaver.generation();

        let mut written = self.gate.written.lock().await;
        if *written > generation {
            // An edit made after this call was already stored
            debug!("Session '{}': manual save superseded by generation {}", self.key, *written);
            return Ok(self.baseline());
        }

        let result = self
            .store
            .save(&self.key, &snapshot, SaveReason::Manual)
            .await
            .with_context(|| format!("Failed to save session '{}'", self.key));

        let confirmed = match result {
            Ok(confirmed) => confirmed,
            Err(e) => {
                drop(written);
                let restarted = self
                    .autosaver
                    .schedule(self.options.autosave, self.has_changes(), self.current());
                warn!("Save of session '{}' failed (autosave restarted: {})", self.key, restarted);
                return Err(e);
            }
        };
        *written = generation;
        drop(written);

        {
            // Edits made while the save was in flight stay unsaved
            let mut tracker = self.tracker.lock();
            let unchanged = tracker
                .current()
                .is_some_and(|current| current.same_as(&snapshot, tracker.policy()));
            if unchanged {
                tracker.reset(confirmed.clone());
            } else {
                tracker.mark_saved(confirmed.clone());
            }
        }
        self.autosaver.mark_saved(confirmed.clone());
        info!("Saved session '{}' ({})", self.key, confirmed.fingerprint().short());
        Ok(confirmed)
    }

    /// Save the pending autosave right away, if any
    pub async fn flush(&self) -> Result<bool> {
        self.autosaver.flush().await
    }

    pub fn has_changes(&self) -> bool {
        self.tracker.lock().has_changes()
    }

    /// Latest form state fed to the session
    pub fn current(&self) -> Snapshot {
        self.tracker.lock().current().cloned().unwrap_or_default()
    }

    /// Last saved snapshot
    pub fn baseline(&self) -> Snapshot {
        self.tracker.lock().baseline().cloned().unwrap_or_default()
    }

    /// Dotted paths of unsaved fields
    pub fn changed_paths(&self) -> Vec<String> {
        self.tracker.lock().changed_paths()
    }

    /// Whether an autosave timer is waiting to fire
    pub fn autosave_pending(&self) -> bool {
        self.autosaver.is_pending()
    }

    /// Receive autosave notifications
    pub fn subscribe(&self) -> broadcast::Receiver<AutosaveEvent> {
        self.autosaver.subscribe()
    }

    /// Leave the session
    ///
    /// Refuses when there are unsaved changes unless `force` is set. On
    /// success the pending autosave timer is cancelled.
    pub fn close(&self, force: bool) -> Result<(), SessionError> {
        if !force && self.has_changes() {
            return Err(SessionError::UnsavedChanges {
                key: self.key.clone(),
                fields: self.changed_paths(),
            });
        }
        self.autosaver.cancel();
        debug!("Closed session '{}'", self.key);
        Ok(())
    }
}
