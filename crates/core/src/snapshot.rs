//! Snapshot of edit-form state
//!
//! A snapshot is always a JSON object at the root. Field values may be
//! strings, booleans, numbers, null, sequences or nested objects.

use crate::equality::{structurally_equal, NullPolicy};
use crate::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors produced while building or editing a snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Root value was not a JSON object
    #[error("snapshot root must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// Input was not valid JSON
    #[error("invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Field path was empty or had an empty segment
    #[error("invalid field path: '{0}'")]
    InvalidPath(String),

    /// A path segment tried to descend into a scalar
    #[error("field path '{path}' cannot descend into scalar at '{segment}'")]
    NotTraversable { path: String, segment: String },

    /// Sequence index was not a number or past the end
    #[error("field path '{path}' has bad sequence index '{segment}'")]
    BadIndex { path: String, segment: String },
}

/// Immutable-by-convention view of form state, keyed by field name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Map<String, Value>);

impl Snapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build a snapshot from a JSON value (must be an object)
    pub fn from_value(value: Value) -> Result<Self, SnapshotError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(SnapshotError::NotAnObject(type_name(&other))),
        }
    }

    /// Parse a snapshot from JSON text
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Borrow the underlying field map
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Convert into a plain JSON value
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Number of top-level fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no fields are present
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get a top-level field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Get a value by dotted path (`team.0.name`)
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut node = self.0.get(segments.next()?)?;
        for segment in segments {
            node = match node {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Set a value by dotted path, creating intermediate objects
    ///
    /// Returns the previous value at that path, if any. A sequence index
    /// equal to the sequence length appends.
    pub fn set_path(&mut self, path: &str, value: Value) -> Result<Option<Value>, SnapshotError> {
        let segments = split_path(path)?;
        let Some((last, parents)) = segments.split_last() else {
            return Err(SnapshotError::InvalidPath(path.to_string()));
        };

        let mut root = Value::Object(std::mem::take(&mut self.0));
        let result = set_in(&mut root, parents, last, value, path);
        if let Value::Object(map) = root {
            self.0 = map;
        }
        result
    }

    /// Remove a value by dotted path
    ///
    /// Missing paths are not an error and return `None`.
    pub fn remove_path(&mut self, path: &str) -> Result<Option<Value>, SnapshotError> {
        let segments = split_path(path)?;
        let Some((last, parents)) = segments.split_last() else {
            return Err(SnapshotError::InvalidPath(path.to_string()));
        };

        let mut root = Value::Object(std::mem::take(&mut self.0));
        let result = remove_in(&mut root, parents, last, path);
        if let Value::Object(map) = root {
            self.0 = map;
        }
        result
    }

    /// Compare with another snapshot under the given null policy
    pub fn same_as(&self, other: &Snapshot, policy: NullPolicy) -> bool {
        structurally_equal(self, other, policy)
    }

    /// Content fingerprint over the canonical encoding
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of_snapshot(self)
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        structurally_equal(self, other, NullPolicy::Distinct)
    }
}

impl From<Map<String, Value>> for Snapshot {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Snapshot {
    type Error = SnapshotError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

fn split_path(path: &str) -> Result<Vec<&str>, SnapshotError> {
    if path.is_empty() || path.split('.').any(str::is_empty) {
        return Err(SnapshotError::InvalidPath(path.to_string()));
    }
    Ok(path.split('.').collect())
}

fn parse_index(items: &[Value], segment: &str, path: &str, allow_end: bool) -> Result<usize, SnapshotError> {
    let bad = || SnapshotError::BadIndex {
        path: path.to_string(),
        segment: segment.to_string(),
    };
    let idx: usize = segment.parse().map_err(|_| bad())?;
    let limit = if allow_end { items.len() + 1 } else { items.len() };
    if idx < limit {
        Ok(idx)
    } else {
        Err(bad())
    }
}

fn set_in(
    root: &mut Value,
    parents: &[&str],
    last: &str,
    value: Value,
    path: &str,
) -> Result<Option<Value>, SnapshotError> {
    let mut node = root;
    for segment in parents {
        node = match node {
            Value::Object(map) => map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            Value::Array(items) => {
                let idx = parse_index(items, segment, path, false)?;
                &mut items[idx]
            }
            _ => {
                return Err(SnapshotError::NotTraversable {
                    path: path.to_string(),
                    segment: segment.to_string(),
                })
            }
        };
    }

    match node {
        Value::Object(map) => Ok(map.insert(last.to_string(), value)),
        Value::Array(items) => {
            let idx = parse_index(items, last, path, true)?;
            if idx == items.len() {
                items.push(value);
                Ok(None)
            } else {
                Ok(Some(std::mem::replace(&mut items[idx], value)))
            }
        }
        _ => Err(SnapshotError::NotTraversable {
            path: path.to_string(),
            segment: last.to_string(),
        }),
    }
}

fn remove_in(
    root: &mut Value,
    parents: &[&str],
    last: &str,
    path: &str,
) -> Result<Option<Value>, SnapshotError> {
    let mut node = root;
    for segment in parents {
        let next = match node {
            Value::Object(map) => map.get_mut(*segment),
            Value::Array(items) => match segment.parse::<usize>() {
                Ok(idx) => items.get_mut(idx),
                Err(_) => None,
            },
            _ => None,
        };
        match next {
            Some(child) => node = child,
            None => return Ok(None),
        }
    }

    match node {
        Value::Object(map) => Ok(map.remove(last)),
        Value::Array(items) => match parse_index(items, last, path, false) {
            Ok(idx) => Ok(Some(items.remove(idx))),
            Err(_) => Ok(None),
        },
        _ => Ok(None),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "object",
    }
}
