//! Structural equality over snapshots
//!
//! Values are compared recursively: mappings by key set and per-key value
//! (key order never matters), sequences element-wise in order, numbers by
//! numeric value. Any type mismatch is a difference.

use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeSet;

/// How an absent key compares against an explicit `null`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NullPolicy {
    /// `{}` and `{"a": null}` differ
    #[default]
    Distinct,
    /// A missing key equals an explicit `null`
    MissingEqualsNull,
}

impl std::str::FromStr for NullPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "distinct" => Ok(Self::Distinct),
            "missing-equals-null" => Ok(Self::MissingEqualsNull),
            other => Err(format!(
                "unknown null policy '{}' (expected 'distinct' or 'missing-equals-null')",
                other
            )),
        }
    }
}

impl std::fmt::Display for NullPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Distinct => write!(f, "distinct"),
            Self::MissingEqualsNull => write!(f, "missing-equals-null"),
        }
    }
}

/// Report whether `current` differs from the `initial` baseline
///
/// Without a baseline (still loading) this is always `false`.
pub fn evaluate(initial: Option<&Snapshot>, current: &Snapshot, policy: NullPolicy) -> bool {
    match initial {
        Some(initial) => !structurally_equal(initial, current, policy),
        None => false,
    }
}

/// Deep structural equality of two snapshots
pub fn structurally_equal(a: &Snapshot, b: &Snapshot, policy: NullPolicy) -> bool {
    maps_equal(a.fields(), b.fields(), policy)
}

/// Deep structural equality of two JSON values
pub fn values_equal(a: &Value, b: &Value, policy: NullPolicy) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r, policy))
        }
        (Value::Object(x), Value::Object(y)) => maps_equal(x, y, policy),
        _ => false,
    }
}

fn maps_equal(a: &Map<String, Value>, b: &Map<String, Value>, policy: NullPolicy) -> bool {
    match policy {
        NullPolicy::Distinct => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(key, left)| b.get(key).is_some_and(|right| values_equal(left, right, policy)))
        }
        NullPolicy::MissingEqualsNull => {
            a.iter().all(|(key, left)| match b.get(key) {
                Some(right) => values_equal(left, right, policy),
                None => left.is_null(),
            }) && b
                .iter()
                .filter(|(key, _)| !a.contains_key(key.as_str()))
                .all(|(_, right)| right.is_null())
        }
    }
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    match (integral_value(x), integral_value(y)) {
        (Some(a), Some(b)) => a == b,
        (None, None) => match (x.as_f64(), y.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        _ => false,
    }
}

/// Exact integer value of `n`, whether written as `7`, `7.0` or `7e0`
///
/// Floats count when they have no fraction and fit in `i128`.
pub(crate) fn integral_value(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
        .or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i128::MAX as f64)
                .map(|f| f as i128)
        })
}

/// Dotted paths of fields that differ between `before` and `after`
///
/// Nested mappings are descended; sequences and scalars are reported at
/// their own path. Output is sorted.
pub fn changed_paths(before: &Snapshot, after: &Snapshot, policy: NullPolicy) -> Vec<String> {
    let mut out = Vec::new();
    collect_changes(before.fields(), after.fields(), policy, "", &mut out);
    out
}

fn collect_changes(
    before: &Map<String, Value>,
    after: &Map<String, Value>,
    policy: NullPolicy,
    prefix: &str,
    out: &mut Vec<String>,
) {
    let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();

    for key in keys {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match (before.get(key.as_str()), after.get(key.as_str())) {
            (Some(Value::Object(l)), Some(Value::Object(r))) => {
                collect_changes(l, r, policy, &path, out);
            }
            (Some(l), Some(r)) => {
                if !values_equal(l, r, policy) {
                    out.push(path);
                }
            }
            (Some(only), None) | (None, Some(only)) => {
                if policy == NullPolicy::Distinct || !only.is_null() {
                    out.push(path);
                }
            }
            (None, None) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snap(value: Value) -> Snapshot {
        Snapshot::from_value(value).unwrap()
    }

    #[test]
    fn test_no_baseline_is_never_dirty() {
        let current = snap(json!({"anything": [1, 2, 3]}));
        assert!(!evaluate(None, &current, NullPolicy::Distinct));
        assert!(!evaluate(None, &Snapshot::new(), NullPolicy::MissingEqualsNull));
    }

    #[test]
    fn test_equal_values_with_separate_identity() {
        let a = snap(json!({"name": "Maple", "amenities": ["garden", "chapel"], "address": {"city": "Oslo"}}));
        let b = snap(json!({"name": "Maple", "amenities": ["garden", "chapel"], "address": {"city": "Oslo"}}));
        assert!(!evaluate(Some(&a), &b, NullPolicy::Distinct));
    }

    #[test]
    fn test_sequence_length_difference() {
        let a = snap(json!({"a": 1, "b": [1, 2]}));
        let b = snap(json!({"a": 1, "b": [1, 2, 3]}));
        assert!(evaluate(Some(&a), &b, NullPolicy::Distinct));
    }

    #[test]
    fn test_sequence_order_matters() {
        let a = snap(json!({"tags": ["x", "y"]}));
        let b = snap(json!({"tags": ["y", "x"]}));
        assert!(evaluate(Some(&a), &b, NullPolicy::Distinct));
    }

    #[test]
    fn test_extra_nested_key() {
        let a = snap(json!({"a": {"x": 1}}));
        let b = snap(json!({"a": {"x": 1, "y": 2}}));
        assert!(evaluate(Some(&a), &b, NullPolicy::Distinct));
    }

    #[test]
    fn test_key_order_is_irrelevant() {
        let a = Snapshot::from_json(r#"{"a": 1, "b": 2}"#).unwrap();
        let b = Snapshot::from_json(r#"{"b": 2, "a": 1}"#).unwrap();
        assert!(!evaluate(Some(&a), &b, NullPolicy::Distinct));
    }

    #[test]
    fn test_type_mismatch_is_difference() {
        assert!(!values_equal(&json!("1"), &json!(1), NullPolicy::Distinct));
        assert!(!values_equal(&json!(false), &json!(null), NullPolicy::Distinct));
        assert!(!values_equal(&json!([]), &json!({}), NullPolicy::Distinct));
    }

    #[test]
    fn test_numbers_compare_by_value() {
        assert!(values_equal(&json!(1), &json!(1.0), NullPolicy::Distinct));
        assert!(values_equal(&json!(-3), &json!(-3), NullPolicy::Distinct));
        assert!(!values_equal(&json!(0.1), &json!(0.2), NullPolicy::Distinct));
        assert!(values_equal(&json!(u64::MAX), &json!(u64::MAX), NullPolicy::Distinct));
        assert!(values_equal(&json!(1e18), &json!(1_000_000_000_000_000_000u64), NullPolicy::Distinct));
        // 2^53 + 1 has no exact f64 form
        assert!(!values_equal(&json!(9_007_199_254_740_993u64), &json!(9_007_199_254_740_992.0), NullPolicy::Distinct));
    }

    #[test]
    fn test_null_policy_distinct() {
        let cleared = snap(json!({"title": "Menu", "subtitle": null}));
        let absent = snap(json!({"title": "Menu"}));
        assert!(evaluate(Some(&absent), &cleared, NullPolicy::Distinct));
        assert!(evaluate(Some(&cleared), &absent, NullPolicy::Distinct));
    }

    #[test]
    fn test_null_policy_missing_equals_null() {
        let cleared = snap(json!({"title": "Menu", "meta": {"subtitle": null}}));
        let absent = snap(json!({"title": "Menu", "meta": {}}));
        assert!(!evaluate(Some(&absent), &cleared, NullPolicy::MissingEqualsNull));
        assert!(!evaluate(Some(&cleared), &absent, NullPolicy::MissingEqualsNull));

        // A missing key still differs from a non-null value
        let filled = snap(json!({"title": "Menu", "meta": {"subtitle": "Lunch"}}));
        assert!(evaluate(Some(&absent), &filled, NullPolicy::MissingEqualsNull));
    }

    #[test]
    fn test_changed_paths() {
        let before = snap(json!({
            "name": "Birch",
            "contact": {"phone": "555", "email": "a@b.c"},
            "tags": ["x"],
            "note": null
        }));
        let after = snap(json!({
            "name": "Birch",
            "contact": {"phone": "556", "email": "a@b.c", "fax": "1"},
            "tags": ["x", "y"]
        }));

        assert_eq!(
            changed_paths(&before, &after, NullPolicy::Distinct),
            vec!["contact.fax", "contact.phone", "note", "tags"]
        );
        assert_eq!(
            changed_paths(&before, &after, NullPolicy::MissingEqualsNull),
            vec!["contact.fax", "contact.phone", "tags"]
        );
        assert!(changed_paths(&before, &before, NullPolicy::Distinct).is_empty());
    }

    #[test]
    fn test_null_policy_parse_and_display() {
        assert_eq!("distinct".parse::<NullPolicy>().unwrap(), NullPolicy::Distinct);
        assert_eq!(
            "missing-equals-null".parse::<NullPolicy>().unwrap(),
            NullPolicy::MissingEqualsNull
        );
        assert!("loose".parse::<NullPolicy>().is_err());
        assert_eq!(NullPolicy::MissingEqualsNull.to_string(), "missing-equals-null");
    }
}
