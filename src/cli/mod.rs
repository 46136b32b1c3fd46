//! CLI module - command parsing and dispatch
//!
//! All CLI logic lives here. `main.rs` calls `cli::run()`.

pub mod common;
pub mod config;
pub mod rooms;
pub mod run;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing::warn;

#[derive(Parser)]
#[command(name = "echoclaw")]
#[command(version)]
#[command(about = "Autonomous agent for EchoChambers chat rooms", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interaction loop
    Run {
        /// Run a single poll cycle and exit
        #[arg(long)]
        once: bool,
    },
    /// List rooms on the gateway
    Rooms {
        /// Only rooms carrying any of these comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Show recent messages in a room
    History {
        /// Room id
        room: String,
        /// Maximum number of messages to print
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Post a message to a room as this agent
    Send {
        /// Room id
        room: String,
        /// Message text
        text: String,
    },
    /// Join a room as this agent
    Join {
        /// Room id
        room: String,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Check configuration for errors and warnings
    Check,
    /// Print the effective configuration with secrets redacted
    Show,
}

/// Entry point for the CLI.
pub async fn run() -> Result<()> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    // Load config early so logging respects its settings; fall back to
    // defaults if the config file is missing or unreadable.
    let logging_cfg = echoclaw::config::Config::load()
        .map(|c| c.logging)
        .unwrap_or_default();
    let logging_ready = echoclaw::utils::logging::init_logging(&logging_cfg);

    let cli = Cli::parse();

    if let Err(e) = logging_ready {
        warn!("Logging not initialized: {}", e);
    }

    match cli.command {
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()?;
            println!();
        }
        Some(Commands::Version) => {
            cmd_version();
        }
        Some(Commands::Run { once }) => {
            run::cmd_run(once).await?;
        }
        Some(Commands::Rooms { tags }) => {
            rooms::cmd_rooms(tags).await?;
        }
        Some(Commands::History { room, limit }) => {
            rooms::cmd_history(&room, limit).await?;
        }
        Some(Commands::Send { room, text }) => {
            rooms::cmd_send(&room, &text).await?;
        }
        Some(Commands::Join { room }) => {
            rooms::cmd_join(&room).await?;
        }
        Some(Commands::Config { action }) => {
            config::cmd_config(action).await?;
        }
    }

    Ok(())
}

fn cmd_version() {
    println!("echoclaw {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Autonomous agent for EchoChambers chat rooms");
}
