//! Debounced autosave
//!
//! One `Autosaver` owns at most one pending timer. Every `schedule` call
//! cancels the pending timer before deciding whether to start a new one, so
//! only the last edit inside the quiet window is saved. A timer that fires
//! detaches itself before calling the save handler; later edits start their
//! own timer instead of aborting the in-flight save.
//!
//! Each save carries the generation it was scheduled under. Generations only
//! grow, so a handler that orders writes can tell a stale save from a newer
//! one and report it as superseded.

use async_trait::async_trait;
use formkeep_core::{Fingerprint, NullPolicy, Snapshot};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Capacity of the autosave event channel
const EVENT_CAPACITY: usize = 64;

/// Side-effecting save invoked when the debounce timer fires
#[async_trait]
pub trait SaveHandler: Send + Sync + 'static {
    /// Store `snapshot`, scheduled under `generation`
    async fn save(&self, snapshot: Snapshot, generation: u64) -> anyhow::Result<SaveOutcome>;
}

/// Result of a save that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The snapshot was stored
    Saved,
    /// A newer save already landed; nothing was written
    Superseded,
}

/// Autosave lifecycle notifications
#[derive(Debug, Clone)]
pub enum AutosaveEvent {
    /// A timer was (re)started
    Scheduled { delay: Duration },
    /// A pending timer was cancelled without saving
    Cancelled,
    /// The save handler was invoked
    Saving { fingerprint: Fingerprint },
    /// The save handler succeeded; `snapshot` is the new autosave baseline
    Saved { snapshot: Snapshot },
    /// The save handler failed; the baseline was not advanced
    Failed { error: String },
    /// A newer save landed first; the baseline was not advanced
    Superseded { fingerprint: Fingerprint },
}

struct Pending {
    handle: JoinHandle<()>,
    generation: u64,
    snapshot: Snapshot,
}

struct Shared {
    pending: Option<Pending>,
    generation: u64,
    last_saved: Option<Snapshot>,
}

/// Debounced save timer for one editing session
pub struct Autosaver {
    delay: Duration,
    policy: NullPolicy,
    handler: Arc<dyn SaveHandler>,
    shared: Arc<Mutex<Shared>>,
    events: broadcast::Sender<AutosaveEvent>,
}

impl Autosaver {
    /// Create an autosaver with the given quiet period
    pub fn new(delay: Duration, policy: NullPolicy, handler: Arc<dyn SaveHandler>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            delay,
            policy,
            handler,
            shared: Arc::new(Mutex::new(Shared {
                pending: None,
                generation: 0,
                last_saved: None,
            })),
            events,
        }
    }

    /// Quiet period before a scheduled save fires
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Receive autosave notifications
    pub fn subscribe(&self) -> broadcast::Receiver<AutosaveEvent> {
        self.events.subscribe()
    }

    /// Snapshot passed to the last successful save
    pub fn last_saved(&self) -> Option<Snapshot> {
        self.shared.lock().last_saved.clone()
    }

    /// Whether a timer is waiting to fire
    pub fn is_pending(&self) -> bool {
        self.shared.lock().pending.is_some()
    }

    /// Current generation
    ///
    /// Every `schedule`, `cancel` and `flush` moves it forward, so a value
    /// read after `cancel` is newer than any save scheduled before it.
    pub fn generation(&self) -> u64 {
        self.shared.lock().generation
    }

    /// Record a save done outside the timer (manual save)
    pub fn mark_saved(&self, snapshot: Snapshot) {
        self.shared.lock().last_saved = Some(snapshot);
    }

    /// Restart the debounce timer for `snapshot`
    ///
    /// Any pending timer is cancelled first. A new timer starts only when
    /// `enabled && changed` and `snapshot` differs from the last
    /// successfully saved one. Returns whether a timer was started.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, enabled: bool, changed: bool, snapshot: Snapshot) -> bool {
        let mut shared = self.shared.lock();
        let cancelled = cancel_locked(&mut shared);

        let already_saved = shared
            .last_saved
            .as_ref()
            .is_some_and(|saved| saved.same_as(&snapshot, self.policy));

        if !enabled || !changed || already_saved {
            if already_saved {
                debug!("Snapshot {} already autosaved, not scheduling", snapshot.fingerprint().short());
            }
            if cancelled {
                let _ = self.events.send(AutosaveEvent::Cancelled);
            }
            return false;
        }

        shared.generation += 1;
        let generation = shared.generation;
        let handle = tokio::spawn(run_timer(
            self.delay,
            generation,
            snapshot.clone(),
            Arc::clone(&self.shared),
            Arc::clone(&self.handler),
            self.events.clone(),
        ));
        shared.pending = Some(Pending {
            handle,
            generation,
            snapshot,
        });
        drop(shared);

        debug!("Autosave scheduled in {:?} (generation {})", self.delay, generation);
        let _ = self.events.send(AutosaveEvent::Scheduled { delay: self.delay });
        true
    }

    /// Cancel the pending timer without saving
    pub fn cancel(&self) -> bool {
        let cancelled = cancel_locked(&mut self.shared.lock());
        if cancelled {
            debug!("Autosave timer cancelled");
            let _ = self.events.send(AutosaveEvent::Cancelled);
        }
        cancelled
    }

    /// Save the pending snapshot now instead of waiting for the timer
    ///
    /// Returns `Ok(false)` when nothing was pending.
    pub async fn flush(&self) -> anyhow::Result<bool> {
        let pending = {
            let mut shared = self.shared.lock();
            shared.generation += 1;
            shared.pending.take()
        };
        let Some(pending) = pending else {
            return Ok(false);
        };
        pending.handle.abort();

        perform_save(
            pending.snapshot,
            pending.generation,
            &self.shared,
            self.handler.as_ref(),
            &self.events,
        )
        .await?;
        Ok(true)
    }
}

impl Drop for Autosaver {
    fn drop(&mut self) {
        if cancel_locked(&mut self.shared.lock()) {
            debug!("Autosaver dropped with a pending timer; cancelled");
        }
    }
}

/// Abort the pending timer, if any. The handle is taken so it is aborted once.
fn cancel_locked(shared: &mut Shared) -> bool {
    shared.generation += 1;
    match shared.pending.take() {
        Some(pending) => {
            pending.handle.abort();
            true
        }
        None => false,
    }
}

async fn run_timer(
    delay: Duration,
    generation: u64,
    snapshot: Snapshot,
    shared: Arc<Mutex<Shared>>,
    handler: Arc<dyn SaveHandler>,
    events: broadcast::Sender<AutosaveEvent>,
) {
    tokio::time::sleep(delay).await;

    {
        let mut state = shared.lock();
        let current = state.pending.as_ref().map(|p| p.generation);
        if current != Some(generation) {
            // Superseded between wake-up and lock
            return;
        }
        // Detach: from here on, new edits schedule a fresh timer
        state.pending = None;
    }

    // Failures are already logged and broadcast
    let _ = perform_save(snapshot, generation, &shared, handler.as_ref(), &events).await;
}

async fn perform_save(
    snapshot: Snapshot,
    generation: u64,
    shared: &Mutex<Shared>,
    handler: &dyn SaveHandler,
    events: &broadcast::Sender<AutosaveEvent>,
) -> anyhow::Result<()> {
    let fingerprint = snapshot.fingerprint();
    let _ = events.send(AutosaveEvent::Saving { fingerprint });

    match handler.save(snapshot.clone(), generation).await {
        Ok(SaveOutcome::Superseded) => {
            debug!("Autosave of {} superseded by a newer save", fingerprint.short());
            let _ = events.send(AutosaveEvent::Superseded { fingerprint });
            Ok(())
        }
        Ok(SaveOutcome::Saved) => {
            info!("Autosaved snapshot {}", fingerprint.short());
            shared.lock().last_saved = Some(snapshot.clone());
            let _ = events.send(AutosaveEvent::Saved { snapshot });
            Ok(())
        }
        Err(e) => {
            warn!("Autosave of {} failed: {:#}", fingerprint.short(), e);
            let _ = events.send(AutosaveEvent::Failed {
                error: format!("{:#}", e),
            });
            Err(e)
        }
    }
}
