//! Formkeep CLI - fk command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod system_config;
mod util;

/// Formkeep - unsaved-changes tracking with debounced autosave
#[derive(Parser)]
#[command(name = "fk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Snapshot store directory (overrides store.path from config)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Edit a session interactively (line commands on stdin)
    Edit {
        /// Session key (e.g. team/ada)
        session: String,
        /// Disable autosave for this session
        #[arg(long)]
        no_autosave: bool,
        /// Autosave quiet period in milliseconds (100-600000)
        #[arg(
            long,
            value_parser = clap::value_parser!(u64)
                .range(system_config::MIN_DELAY_MS..=system_config::MAX_DELAY_MS)
        )]
        delay_ms: Option<u64>,
    },
    /// Print the stored snapshot of a session
    Show {
        /// Session key
        session: String,
    },
    /// Show revision history of a session
    Log {
        /// Session key
        session: String,
        /// Number of revisions to show (default: 20)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List stored sessions
    Sessions,
    /// View and edit configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all configuration values
    List,
    /// Get a single value
    Get {
        /// Key such as autosave.delay_ms
        key: String,
    },
    /// Set a single value
    Set {
        /// Key such as autosave.delay_ms
        key: String,
        /// New value
        value: String,
    },
    /// Show the config file path
    Path {
        /// Create the file with defaults if missing
        #[arg(long)]
        create: bool,
    },
    /// Print an annotated example configuration
    Example,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing (stderr keeps stdout clean for command output)
    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    let store = cli.store.as_deref();

    match cli.command {
        Commands::Edit { session, no_autosave, delay_ms } => {
            cmd::edit::run(store, &session, no_autosave, delay_ms).await
        }
        Commands::Show { session } => cmd::show::run(store, &session).await,
        Commands::Log { session, limit } => cmd::log::run(store, &session, limit).await,
        Commands::Sessions => cmd::log::run_sessions(store).await,
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list().await,
            ConfigCommands::Get { key } => cmd::config::run_get(&key).await,
            ConfigCommands::Set { key, value } => cmd::config::run_set(&key, &value).await,
            ConfigCommands::Path { create } => cmd::config::run_path(create).await,
            ConfigCommands::Example => cmd::config::run_example().await,
        },
    }
}
