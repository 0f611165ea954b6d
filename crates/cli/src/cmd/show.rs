//! Print the stored snapshot of a session

use crate::{system_config, util};
use anyhow::{Context, Result};
use std::path::Path;

/// Print the latest saved snapshot as JSON on stdout
pub async fn run(store_override: Option<&Path>, session: &str) -> Result<()> {
    let config = system_config::load()?;
    let store = util::open_store(&config, store_override)?;

    let revision = store
        .latest(session)?
        .with_context(|| format!("Session not found: {}", session))?;

    let text = serde_json::to_string_pretty(&revision.snapshot)
        .context("Failed to serialize snapshot")?;
    println!("{}", text);
    Ok(())
}
