//! Interactive editing session
//!
//! Reads one command per line from stdin and feeds every edit to an
//! `EditSession`, so the dirty flag and the autosave timer behave exactly as
//! they would behind a form.

use crate::{system_config, util};
use anyhow::{Context, Result};
use formkeep_tracker::{AutosaveEvent, EditSession, SessionError, SessionOptions};
use owo_colors::OwoColorize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};

/// One line typed by the editor
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Set { path: String, value: Value },
    Unset { path: String },
    Status,
    Show,
    Save,
    Flush,
    Help,
    Quit { force: bool },
    Empty,
}

const HELP: &str = "\
commands:
  set <path> <value>   set a field (value is JSON, or plain text)
  unset <path>         remove a field
  status               show unsaved fields
  show                 print the current form state
  save                 save now
  flush                run the pending autosave now
  quit                 leave (refused while there are unsaved changes)
  quit!                leave and discard unsaved changes";

fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb {
        "set" => {
            let (path, raw) = rest
                .split_once(char::is_whitespace)
                .context("usage: set <path> <value>")?;
            Command::Set {
                path: path.to_string(),
                value: util::parse_field_value(raw),
            }
        }
        "unset" if !rest.is_empty() => Command::Unset {
            path: rest.to_string(),
        },
        "unset" => anyhow::bail!("usage: unset <path>"),
        "status" => Command::Status,
        "show" => Command::Show,
        "save" => Command::Save,
        "flush" => Command::Flush,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit { force: false },
        "quit!" | "exit!" => Command::Quit { force: true },
        other => anyhow::bail!("unknown command '{}' (try 'help')", other),
    };
    Ok(command)
}

pub async fn run(
    store_override: Option<&Path>,
    session_key: &str,
    no_autosave: bool,
    delay_ms: Option<u64>,
) -> Result<()> {
    let config = system_config::load()?;
    let store = util::open_store(&config, store_override)?;

    let options = SessionOptions {
        autosave: config.autosave.enabled && !no_autosave,
        autosave_delay: Duration::from_millis(delay_ms.unwrap_or(config.autosave.delay_ms)),
        null_policy: config.equality.null_policy,
    };
    let session = EditSession::open(store, session_key, options).await?;

    println!("{} {}", "Editing".bold(), session_key.cyan());
    if options.autosave {
        println!(
            "{}",
            format!("autosave after {}ms without edits; 'help' for commands", options.autosave_delay.as_millis())
                .dimmed()
        );
    } else {
        println!("{}", "autosave off; 'help' for commands".dimmed());
    }

    let notifier = tokio::spawn(render_events(session.subscribe()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let next = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = next else {
            // End of input or Ctrl-C: leave like `quit!`, but say what is lost
            if session.has_changes() {
                println!(
                    "{} discarding unsaved changes: {}",
                    "!".yellow(),
                    session.changed_paths().join(", ")
                );
            }
            session.close(true)?;
            break;
        };

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{} {}", "error:".red(), e);
                continue;
            }
        };

        match command {
            Command::Empty => {}
            Command::Help => println!("{}", HELP),
            Command::Set { path, value } => {
                let result = session.edit(|s| s.set_path(&path, value).map(|_| ()));
                report_edit(&session, result);
            }
            Command::Unset { path } => {
                let result = session.edit(|s| s.remove_path(&path).map(|_| ()));
                report_edit(&session, result);
            }
            Command::Status => print_status(&session),
            Command::Show => {
                let text = serde_json::to_string_pretty(&session.current())?;
                println!("{}", text);
            }
            Command::Save => match session.save().await {
                Ok(saved) => println!("{} saved ({})", "✓".green(), saved.fingerprint().short()),
                Err(e) => println!("{} save failed: {:#}", "✗".red(), e),
            },
            Command::Flush => match session.flush().await {
                Ok(true) => {}
                Ok(false) => println!("{}", "nothing pending".dimmed()),
                Err(e) => println!("{} autosave failed: {:#}", "✗".red(), e),
            },
            Command::Quit { force } => match session.close(force) {
                Ok(()) => break,
                Err(SessionError::UnsavedChanges { fields, .. }) => {
                    println!(
                        "{} unsaved changes in: {} ('save' first, or 'quit!' to discard)",
                        "!".yellow(),
                        fields.join(", ")
                    );
                }
                Err(e) => return Err(e.into()),
            },
        }
    }

    notifier.abort();
    Ok(())
}

fn report_edit(session: &EditSession, result: Result<bool, SessionError>) {
    match result {
        Ok(true) => {
            let pending = if session.autosave_pending() { " (autosave pending)" } else { "" };
            println!("{}{}", "● unsaved".yellow(), pending.dimmed());
        }
        Ok(false) => println!("{}", "○ no changes".dimmed()),
        Err(e) => println!("{} {}", "error:".red(), e),
    }
}

fn print_status(session: &EditSession) {
    if !session.has_changes() {
        println!("{}", "○ no changes".dimmed());
        return;
    }
    println!("{}", "● unsaved fields:".yellow());
    for path in session.changed_paths() {
        println!("  {}", path.cyan());
    }
    if session.autosave_pending() {
        println!("{}", "autosave pending".dimmed());
    }
}

/// Print autosave outcomes as they happen (the form's transient notices)
async fn render_events(mut events: broadcast::Receiver<AutosaveEvent>) {
    loop {
        match events.recv().await {
            Ok(AutosaveEvent::Saved { snapshot }) => {
                println!("{} autosaved ({})", "✓".green(), snapshot.fingerprint().short());
            }
            Ok(AutosaveEvent::Failed { error }) => {
                println!("{} autosave failed: {}", "✗".red(), error);
            }
            Ok(_) => {}
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_set_with_json_and_text() {
        assert_eq!(
            parse_command("set beds 12").unwrap(),
            Command::Set { path: "beds".into(), value: json!(12) }
        );
        assert_eq!(
            parse_command("  set name   Oak House  ").unwrap(),
            Command::Set { path: "name".into(), value: json!("Oak House") }
        );
        assert_eq!(
            parse_command("set tags [\"garden\", \"chapel\"]").unwrap(),
            Command::Set { path: "tags".into(), value: json!(["garden", "chapel"]) }
        );
    }

    #[test]
    fn test_parse_other_commands() {
        assert_eq!(parse_command("").unwrap(), Command::Empty);
        assert_eq!(parse_command("unset contact.fax").unwrap(), Command::Unset { path: "contact.fax".into() });
        assert_eq!(parse_command("status").unwrap(), Command::Status);
        assert_eq!(parse_command("save").unwrap(), Command::Save);
        assert_eq!(parse_command("quit").unwrap(), Command::Quit { force: false });
        assert_eq!(parse_command("quit!").unwrap(), Command::Quit { force: true });
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("set onlypath").is_err());
        assert!(parse_command("unset").is_err());
        assert!(parse_command("frobnicate").is_err());
    }
}
