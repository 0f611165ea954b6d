//! Shared utilities for CLI commands

use crate::system_config::SystemConfig;
use anyhow::{Context, Result};
use formkeep_store::{RetentionPolicy, Revision, SledStore};
use owo_colors::OwoColorize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Open the snapshot store, honouring a `--store` override
pub fn open_store(config: &SystemConfig, store_override: Option<&Path>) -> Result<Arc<SledStore>> {
    let dir = match store_override {
        Some(dir) => dir.to_path_buf(),
        None => config.store_dir()?,
    };
    let policy = RetentionPolicy::keep_last(config.store.retain_count);
    let store = SledStore::open(&dir, policy)
        .with_context(|| format!("Failed to open snapshot store at {}", dir.display()))?;
    Ok(Arc::new(store))
}

/// Parse a field value typed by the user
///
/// Valid JSON is taken as-is (`12`, `true`, `["a","b"]`, `null`);
/// anything else becomes a string.
pub fn parse_field_value(raw: &str) -> Value {
    let raw = raw.trim();
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Format timestamp as relative time ("2 hours ago")
pub fn format_relative_time(ts_ms: u64) -> String {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    let duration = Duration::from_millis(ts_ms);
    let datetime = UNIX_EPOCH + duration;

    if let Ok(elapsed) = SystemTime::now().duration_since(datetime) {
        let seconds = elapsed.as_secs();

        if seconds < 60 {
            format!("{} seconds ago", seconds)
        } else if seconds < 3600 {
            format!("{} minutes ago", seconds / 60)
        } else if seconds < 86400 {
            format!("{} hours ago", seconds / 3600)
        } else if seconds < 604800 {
            format!("{} days ago", seconds / 86400)
        } else {
            format!("{} weeks ago", seconds / 604800)
        }
    } else {
        "in the future".to_string()
    }
}

/// Display a revision in compact format
pub fn display_revision_compact(rev: &Revision) {
    let id_short = rev.id.to_string()[..10].to_string();
    println!(
        "{} {} {} {}",
        id_short.yellow(),
        format_relative_time(rev.ts_unix_ms).dimmed(),
        rev.reason.to_string().cyan(),
        rev.fingerprint.short().dimmed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_field_value() {
        assert_eq!(parse_field_value("12"), json!(12));
        assert_eq!(parse_field_value(" true "), json!(true));
        assert_eq!(parse_field_value("[\"a\", \"b\"]"), json!(["a", "b"]));
        assert_eq!(parse_field_value("null"), Value::Null);
        assert_eq!(parse_field_value("Oak House"), json!("Oak House"));
        assert_eq!(parse_field_value("\"quoted\""), json!("quoted"));
    }

    #[test]
    fn test_format_relative_time() {
        use std::time::{SystemTime, UNIX_EPOCH};

        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;

        assert!(format_relative_time(now_ms).contains("seconds ago"));
        assert!(format_relative_time(now_ms - 3600 * 1000).contains("hour"));
        assert!(format_relative_time(now_ms - 86400 * 1000).contains("day"));
        assert_eq!(format_relative_time(now_ms + 3_600_000), "in the future");
    }
}
