//! Dirty-state tracker

use formkeep_core::{changed_paths, evaluate, NullPolicy, Snapshot};

/// Derives a "has unsaved changes" flag from two snapshots
///
/// The baseline is the last saved snapshot. It moves only on `reset`
/// (manual save) or `mark_saved` (autosave). After a baseline is loaded,
/// `has_changes()` always equals `!structurally_equal(current, baseline)`.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    baseline: Option<Snapshot>,
    current: Option<Snapshot>,
    has_changes: bool,
    policy: NullPolicy,
}

impl ChangeTracker {
    /// Create a tracker with no baseline yet (data still loading)
    pub fn new(policy: NullPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Install the initial baseline once loading completes
    pub fn load(&mut self, initial: Snapshot) {
        self.baseline = Some(initial);
        self.refresh();
    }

    /// Re-evaluate against a new current snapshot
    pub fn evaluate(&mut self, current: Snapshot) -> bool {
        self.current = Some(current);
        self.refresh()
    }

    /// Explicit save completed: baseline and current both become `current`
    pub fn reset(&mut self, current: Snapshot) {
        self.baseline = Some(current.clone());
        self.current = Some(current);
        self.has_changes = false;
    }

    /// Autosave completed with `saved`
    ///
    /// Edits made while the save was in flight keep the tracker dirty.
    pub fn mark_saved(&mut self, saved: Snapshot) -> bool {
        self.baseline = Some(saved);
        self.refresh()
    }

    /// Whether the current snapshot differs from the baseline
    pub fn has_changes(&self) -> bool {
        self.has_changes
    }

    /// True once a baseline exists
    pub fn is_loaded(&self) -> bool {
        self.baseline.is_some()
    }

    pub fn baseline(&self) -> Option<&Snapshot> {
        self.baseline.as_ref()
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.current.as_ref()
    }

    pub fn policy(&self) -> NullPolicy {
        self.policy
    }

    /// Dotted paths of unsaved fields
    pub fn changed_paths(&self) -> Vec<String> {
        match (&self.baseline, &self.current) {
            (Some(baseline), Some(current)) => changed_paths(baseline, current, self.policy),
            _ => Vec::new(),
        }
    }

    fn refresh(&mut self) -> bool {
        self.has_changes = match &self.current {
            Some(current) => evaluate(self.baseline.as_ref(), current, self.policy),
            None => false,
        };
        self.has_changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snap(value: serde_json::Value) -> Snapshot {
        Snapshot::from_value(value).unwrap()
    }

    #[test]
    fn test_not_dirty_while_loading() {
        let mut tracker = ChangeTracker::new(NullPolicy::Distinct);
        assert!(!tracker.evaluate(snap(json!({"name": "typed before load"}))));
        assert!(!tracker.has_changes());
        assert!(tracker.changed_paths().is_empty());
    }

    #[test]
    fn test_load_then_edit() {
        let mut tracker = ChangeTracker::new(NullPolicy::Distinct);
        tracker.load(snap(json!({"name": "Rowan"})));
        assert!(!tracker.evaluate(snap(json!({"name": "Rowan"}))));
        assert!(tracker.evaluate(snap(json!({"name": "Rowan House"}))));
        assert_eq!(tracker.changed_paths(), vec!["name"]);

        // Reverting the edit clears the flag
        assert!(!tracker.evaluate(snap(json!({"name": "Rowan"}))));
    }

    #[test]
    fn test_load_after_early_edits_reevaluates() {
        let mut tracker = ChangeTracker::new(NullPolicy::Distinct);
        tracker.evaluate(snap(json!({"name": "B"})));
        tracker.load(snap(json!({"name": "A"})));
        assert!(tracker.has_changes());
    }

    #[test]
    fn test_reset_clears_dirty_state() {
        let mut tracker = ChangeTracker::new(NullPolicy::Distinct);
        tracker.load(snap(json!({"title": "Old"})));
        tracker.evaluate(snap(json!({"title": "New"})));
        assert!(tracker.has_changes());

        let x = snap(json!({"title": "New"}));
        tracker.reset(x.clone());
        assert!(!tracker.has_changes());
        assert!(!evaluate(Some(&x), &x, tracker.policy()));
        assert_eq!(tracker.baseline(), Some(&x));
    }

    #[test]
    fn test_mark_saved_keeps_in_flight_edits_dirty() {
        let mut tracker = ChangeTracker::new(NullPolicy::Distinct);
        tracker.load(snap(json!({"v": 0})));
        tracker.evaluate(snap(json!({"v": 1})));
        tracker.evaluate(snap(json!({"v": 2})));

        // Autosave of v=1 lands after v=2 was typed
        assert!(tracker.mark_saved(snap(json!({"v": 1}))));
        assert!(!tracker.mark_saved(snap(json!({"v": 2}))));
    }

    #[test]
    fn test_policy_is_applied() {
        let mut tracker = ChangeTracker::new(NullPolicy::MissingEqualsNull);
        tracker.load(snap(json!({"a": "x"})));
        assert!(!tracker.evaluate(snap(json!({"a": "x", "b": null}))));
    }
}
