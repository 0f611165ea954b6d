//! Append-only revision journal using sled
//!
//! Each session gets its own sled tree (`session:<key>`). Keys are
//! big-endian sequence numbers so tree order is append order and the last
//! entry is the current value of the session.

use crate::{validate_session, Revision, RetentionPolicy, SaveReason, SnapshotStore, StoreError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use formkeep_core::Snapshot;
use parking_lot::Mutex;
use sled::{Db, Tree};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

const TREE_PREFIX: &str = "session:";

/// Sled-backed snapshot store
pub struct SledStore {
    /// Sled database
    db: Db,
    /// Next sequence number per session, filled lazily from the tree tail
    next_seq: Mutex<HashMap<String, u64>>,
    /// How many revisions to keep per session
    policy: RetentionPolicy,
}

impl SledStore {
    /// Open or create a store in the given directory
    pub fn open(dir: &Path, policy: RetentionPolicy) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create store directory {}", dir.display()))?;
        let db = sled::open(dir.join("snapshots.db"))
            .with_context(|| format!("Failed to open snapshot database in {}", dir.display()))?;

        Ok(Self {
            db,
            next_seq: Mutex::new(HashMap::new()),
            policy,
        })
    }

    /// Append a revision unless it matches the latest one
    ///
    /// Returns the latest revision after the call (the existing one when
    /// the snapshot was unchanged).
    pub fn append(&self, session: &str, snapshot: &Snapshot, reason: SaveReason) -> Result<Revision> {
        let tree = self.tree(session)?;
        let fingerprint = snapshot.fingerprint();

        if let Some(latest) = self.latest_in(session, &tree)? {
            if latest.fingerprint == fingerprint {
                debug!("Session '{}' unchanged ({}), skipping append", session, fingerprint.short());
                return Ok(latest);
            }
        }

        let revision = Revision::new(session, snapshot.clone(), reason);
        let seq = self.allocate_seq(session, &tree)?;
        let value = revision
            .serialize()
            .context("Failed to encode revision")?;

        tree.insert(seq.to_be_bytes(), value)?;
        self.prune(session, &tree)?;

        // Flush to ensure durability
        tree.flush()?;

        info!(
            "Stored {} revision {} of '{}' ({})",
            reason,
            seq,
            session,
            revision.fingerprint.short()
        );
        Ok(revision)
    }

    /// Get the latest revision of a session
    pub fn latest(&self, session: &str) -> Result<Option<Revision>> {
        match self.existing_tree(session)? {
            Some(tree) => self.latest_in(session, &tree),
            None => Ok(None),
        }
    }

    /// Get up to `limit` revisions of a session, newest first
    pub fn history(&self, session: &str, limit: usize) -> Result<Vec<Revision>> {
        let Some(tree) = self.existing_tree(session)? else {
            return Ok(Vec::new());
        };
        let mut revisions = Vec::new();
        for item in tree.iter().rev().take(limit) {
            let (_, value) = item?;
            revisions.push(decode(session, &value)?);
        }
        Ok(revisions)
    }

    /// List all sessions that have at least one revision
    pub fn sessions(&self) -> Result<Vec<String>> {
        let mut sessions = Vec::new();
        for name in self.db.tree_names() {
            let Some(key) = name.strip_prefix(TREE_PREFIX.as_bytes()) else {
                continue;
            };
            let tree = self.db.open_tree(&name)?;
            if tree.is_empty() {
                continue;
            }
            sessions.push(String::from_utf8_lossy(key).into_owned());
        }
        sessions.sort();
        Ok(sessions)
    }

    /// Number of revisions stored for a session
    pub fn count(&self, session: &str) -> Result<usize> {
        Ok(self.existing_tree(session)?.map_or(0, |tree| tree.len()))
    }

    fn tree(&self, session: &str) -> Result<Tree> {
        validate_session(session)?;
        let tree = self.db.open_tree(format!("{}{}", TREE_PREFIX, session))?;
        Ok(tree)
    }

    /// Like `tree`, but never creates one; reads of unknown sessions leave
    /// the database untouched
    fn existing_tree(&self, session: &str) -> Result<Option<Tree>> {
        validate_session(session)?;
        let name = format!("{}{}", TREE_PREFIX, session);
        if !self.db.tree_names().iter().any(|n| &n[..] == name.as_bytes()) {
            return Ok(None);
        }
        Ok(Some(self.db.open_tree(name)?))
    }

    fn latest_in(&self, session: &str, tree: &Tree) -> Result<Option<Revision>> {
        match tree.last()? {
            Some((_, value)) => Ok(Some(decode(session, &value)?)),
            None => Ok(None),
        }
    }

    fn allocate_seq(&self, session: &str, tree: &Tree) -> Result<u64> {
        let mut counters = self.next_seq.lock();
        let next = match counters.get(session) {
            Some(&next) => next,
            None => match tree.last()? {
                Some((key, _)) => seq_from_key(session, &key)? + 1,
                None => 0,
            },
        };
        counters.insert(session.to_string(), next + 1);
        Ok(next)
    }

    fn prune(&self, session: &str, tree: &Tree) -> Result<()> {
        let expired = self.policy.expired_count(tree.len());
        if expired == 0 {
            return Ok(());
        }

        let keys: Vec<_> = tree
            .iter()
            .keys()
            .take(expired)
            .collect::<std::result::Result<_, _>>()?;
        for key in keys {
            tree.remove(key)?;
        }

        debug!("Pruned {} old revision(s) of '{}'", expired, session);
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for SledStore {
    async fn load(&self, session: &str) -> Result<Option<Snapshot>> {
        Ok(self.latest(session)?.map(|rev| rev.snapshot))
    }

    async fn save(&self, session: &str, snapshot: &Snapshot, reason: SaveReason) -> Result<Snapshot> {
        Ok(self.append(session, snapshot, reason)?.snapshot)
    }
}

fn decode(session: &str, bytes: &[u8]) -> Result<Revision> {
    Revision::deserialize(bytes).map_err(|e| {
        StoreError::Corrupt {
            session: session.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn seq_from_key(session: &str, key: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = key.try_into().map_err(|_| StoreError::Corrupt {
        session: session.to_string(),
        reason: format!("sequence key has {} bytes", key.len()),
    })?;
    Ok(u64::from_be_bytes(bytes))
}
