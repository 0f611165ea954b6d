//! End-to-end workflows through the `fk` binary

mod common;

use anyhow::Result;
use serde_json::json;
use tempfile::TempDir;

#[test]
fn test_edit_save_then_show() -> Result<()> {
    let dir = TempDir::new()?;

    let result = fk!(dir.path(), "edit", "venues/oak")
        .stdin("set name Oak House\nset beds 12\nstatus\nsave\nquit\n")
        .assert_success()?;
    assert!(result.contains_stdout("beds"));
    assert!(result.contains_stdout("saved"));

    let shown = fk!(dir.path(), "show", "venues/oak").assert_success()?;
    assert_eq!(shown.json()?, json!({"name": "Oak House", "beds": 12}));
    Ok(())
}

#[test]
fn test_quit_refused_then_eof_discards() -> Result<()> {
    let dir = TempDir::new()?;

    let result = fk!(dir.path(), "edit", "venues/elm")
        .stdin("set name Elm Lodge\nquit\n")
        .assert_success()?;
    assert!(result.contains_stdout("unsaved changes in: name"));
    assert!(result.contains_stdout("discarding unsaved changes"));

    let shown = fk!(dir.path(), "show", "venues/elm").assert_failure()?;
    assert!(shown.contains_stderr("Session not found"));
    Ok(())
}

#[test]
fn test_reverting_edit_allows_quit() -> Result<()> {
    let dir = TempDir::new()?;
    fk!(dir.path(), "edit", "venues/ash")
        .stdin("set name Ash\nsave\nquit\n")
        .assert_success()?;

    let result = fk!(dir.path(), "edit", "venues/ash")
        .stdin("set name Ash Barn\nset name Ash\nquit\n")
        .assert_success()?;
    assert!(result.contains_stdout("no changes"));
    assert!(!result.contains_stdout("unsaved changes in"));
    Ok(())
}

#[test]
fn test_flush_autosaves_and_log_shows_reason() -> Result<()> {
    let dir = TempDir::new()?;

    fk!(dir.path(), "edit", "menus/spring", "--delay-ms", "60000")
        .stdin("set title Spring menu\nflush\nquit\n")
        .assert_success()?;

    let log = fk!(dir.path(), "log", "menus/spring").assert_success()?;
    assert!(log.contains_stdout("autosave"));

    let sessions = fk!(dir.path(), "sessions").assert_success()?;
    assert!(sessions.contains_stdout("menus/spring"));
    Ok(())
}

#[test]
fn test_no_autosave_leaves_nothing_pending() -> Result<()> {
    let dir = TempDir::new()?;

    let result = fk!(dir.path(), "edit", "menus/summer", "--no-autosave")
        .stdin("set title Summer\nflush\nquit!\n")
        .assert_success()?;
    assert!(result.contains_stdout("nothing pending"));

    fk!(dir.path(), "show", "menus/summer").assert_failure()?;
    Ok(())
}

#[test]
fn test_edit_rejects_out_of_range_delay() -> Result<()> {
    let dir = TempDir::new()?;

    for delay in ["0", "600001"] {
        let rejected = fk!(dir.path(), "edit", "menus/summer", "--delay-ms", delay).assert_failure()?;
        assert!(rejected.contains_stderr("--delay-ms"));
    }

    fk!(dir.path(), "edit", "menus/summer", "--delay-ms", "100")
        .stdin("quit\n")
        .assert_success()?;
    Ok(())
}

#[test]
fn test_config_set_get_and_validation() -> Result<()> {
    let dir = TempDir::new()?;

    fk!(dir.path(), "config", "set", "autosave.delay_ms", "1500").assert_success()?;
    let value = fk!(dir.path(), "config", "get", "autosave.delay_ms").assert_success()?;
    assert_eq!(value.stdout.trim(), "1500");

    let rejected = fk!(dir.path(), "config", "set", "autosave.delay_ms", "5").assert_failure()?;
    assert!(rejected.contains_stderr("delay_ms"));

    let unknown = fk!(dir.path(), "config", "get", "daemon.interval").assert_failure()?;
    assert!(unknown.contains_stderr("Unknown config key"));

    let path = common::cli::config_path(dir.path());
    let text = std::fs::read_to_string(path)?;
    assert!(text.contains("delay_ms = 1500"));
    Ok(())
}
