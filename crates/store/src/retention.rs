//! Retention policy for stored revisions

use serde::{Deserialize, Serialize};

/// Retention policy configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Number of revisions to keep per session (default: 50)
    pub retain_count: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { retain_count: 50 }
    }
}

impl RetentionPolicy {
    /// Keep the newest `retain_count` revisions (at least one)
    pub fn keep_last(retain_count: usize) -> Self {
        Self {
            retain_count: retain_count.max(1),
        }
    }

    /// How many of the oldest revisions to drop from a session holding `len`
    pub fn expired_count(&self, len: usize) -> usize {
        len.saturating_sub(self.retain_count.max(1))
    }
}
