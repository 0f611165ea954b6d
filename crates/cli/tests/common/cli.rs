//! CLI command execution helpers with automatic timing
//!
//! Wraps the `fk` binary with an isolated config file and store directory
//! per test.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// CLI command builder with timing
pub struct FkCommand {
    args: Vec<String>,
    env: HashMap<String, String>,
    stdin_data: Option<String>,
}

impl FkCommand {
    /// Create a command whose config and store live under `root`
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let mut cmd = Self {
            args: vec![
                "--store".to_string(),
                root.join("store").display().to_string(),
            ],
            env: HashMap::new(),
            stdin_data: None,
        };
        cmd.env("FORMKEEP_CONFIG", &config_path(root).display().to_string());
        cmd
    }

    /// Add command arguments
    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Set environment variable
    pub fn env(&mut self, key: &str, value: &str) -> &mut Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Provide stdin data; the pipe is closed after writing
    pub fn stdin(&mut self, data: &str) -> &mut Self {
        self.stdin_data = Some(data.to_string());
        self
    }

    /// Execute command and return result with timing
    pub fn execute(&self) -> Result<CommandResult> {
        let start = Instant::now();

        let mut child = Command::new(env!("CARGO_BIN_EXE_fk"))
            .args(&self.args)
            .envs(&self.env)
            .env("NO_COLOR", "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn fk")?;

        if let Some(mut stdin) = child.stdin.take() {
            use std::io::Write;
            if let Some(data) = &self.stdin_data {
                stdin.write_all(data.as_bytes())?;
            }
        }

        let output = child.wait_with_output().context("Failed to wait for fk")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            duration: start.elapsed(),
        })
    }

    /// Execute and assert success
    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }

        Ok(result)
    }

    /// Execute and expect failure
    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if result.success() {
            anyhow::bail!(
                "Command should have failed but succeeded:\nArgs: {:?}\nStdout: {}",
                self.args,
                result.stdout
            );
        }

        Ok(result)
    }
}

/// Command execution result with timing
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }

    /// Parse stdout as one JSON document
    pub fn json(&self) -> Result<serde_json::Value> {
        serde_json::from_str(&self.stdout)
            .with_context(|| format!("stdout is not JSON:\n{}", self.stdout))
    }
}

/// Config file used by commands rooted at `root`
pub fn config_path(root: &Path) -> PathBuf {
    root.join("config").join("config.toml")
}

/// Macro for convenient command construction
///
/// Usage:
/// ```ignore
/// fk!(dir, "show", "team/ada").assert_success()?;
/// fk!(dir, "edit", "team/ada").stdin("set name Ada\nsave\nquit\n").assert_success()?;
/// ```
#[macro_export]
macro_rules! fk {
    ($dir:expr, $($arg:expr),*) => {{
        let mut cmd = $crate::common::cli::FkCommand::new($dir);
        cmd.args(&[$($arg),*]);
        cmd
    }};
}
