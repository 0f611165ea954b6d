//! Revision records

use formkeep_core::{Fingerprint, Snapshot};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// One stored version of a session's snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
    /// Unique ID (ULID for timestamp + uniqueness)
    pub id: Ulid,
    /// Session key this revision belongs to
    pub session: String,
    /// Timestamp (Unix milliseconds)
    pub ts_unix_ms: u64,
    /// Fingerprint of `snapshot`
    pub fingerprint: Fingerprint,
    /// What triggered the save
    pub reason: SaveReason,
    /// Stored form state
    pub snapshot: Snapshot,
}

/// Reason for storing a revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveReason {
    /// Explicit save by the editor
    Manual,
    /// Debounced autosave
    Autosave,
}

impl std::fmt::Display for SaveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveReason::Manual => write!(f, "manual"),
            SaveReason::Autosave => write!(f, "autosave"),
        }
    }
}

impl Revision {
    /// Create a new revision stamped with a fresh ULID
    pub fn new(session: &str, snapshot: Snapshot, reason: SaveReason) -> Self {
        let id = Ulid::new();
        Self {
            id,
            session: session.to_string(),
            ts_unix_ms: id.timestamp_ms(),
            fingerprint: snapshot.fingerprint(),
            reason,
            snapshot,
        }
    }

    /// Encode for storage
    pub fn serialize(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Decode from storage
    pub fn deserialize(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_revision_stamps_fingerprint_and_time() {
        let snapshot = Snapshot::from_value(json!({"title": "Spring menu"})).unwrap();
        let rev = Revision::new("menus/spring", snapshot.clone(), SaveReason::Autosave);

        assert_eq!(rev.session, "menus/spring");
        assert_eq!(rev.fingerprint, snapshot.fingerprint());
        assert_eq!(rev.ts_unix_ms, rev.id.timestamp_ms());

        let decoded = Revision::deserialize(&rev.serialize().unwrap()).unwrap();
        assert_eq!(decoded.id, rev.id);
        assert_eq!(decoded.reason, SaveReason::Autosave);
        assert_eq!(decoded.snapshot, snapshot);
    }

    #[test]
    fn test_reason_encoding() {
        assert_eq!(serde_json::to_string(&SaveReason::Manual).unwrap(), "\"manual\"");
        assert_eq!(SaveReason::Autosave.to_string(), "autosave");
    }
}
