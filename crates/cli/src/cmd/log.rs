//! Revision history and session listing

use crate::{system_config, util};
use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::Path;

const DEFAULT_LIMIT: usize = 20;

/// Show the most recent revisions of a session, newest first
pub async fn run(store_override: Option<&Path>, session: &str, limit: Option<usize>) -> Result<()> {
    let config = system_config::load()?;
    let store = util::open_store(&config, store_override)?;

    let revisions = store.history(session, limit.unwrap_or(DEFAULT_LIMIT))?;
    if revisions.is_empty() {
        println!("{}", format!("No revisions for {}", session).dimmed());
        return Ok(());
    }

    let total = store.count(session)?;
    println!("{} {}", "Session".bold(), session.cyan());
    for revision in &revisions {
        util::display_revision_compact(revision);
    }
    if total > revisions.len() {
        println!("{}", format!("... {} older revision(s)", total - revisions.len()).dimmed());
    }
    Ok(())
}

/// List every session with at least one saved revision
pub async fn run_sessions(store_override: Option<&Path>) -> Result<()> {
    let config = system_config::load()?;
    let store = util::open_store(&config, store_override)?;

    let sessions = store.sessions()?;
    if sessions.is_empty() {
        println!("{}", "No sessions".dimmed());
        return Ok(());
    }

    for session in sessions {
        let count = store.count(&session)?;
        println!("{} {}", session.cyan(), format!("({} revisions)", count).dimmed());
    }
    Ok(())
}
