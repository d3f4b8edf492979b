//! SupportBot CLI - command-line client for the banking support backend.
//!
//! Gives agents a terminal dashboard (login, live event monitor, ticket
//! triage) and lets anyone open a widget-style chat session against the
//! same backend. Useful for headless operation, scripting and debugging the
//! realtime channel.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use sb_core::config::ConfigHandle;
use sb_core::error::SbResult;
use sb_core::logging;

/// SupportBot - realtime support client for agents and customers.
#[derive(Parser)]
#[command(
    name = "supportbot",
    version,
    about = "SupportBot support desk CLI",
    long_about = "A command-line client for the SupportBot banking support backend.\n\
                   Monitor tickets in real time, triage them, or chat with the assistant as a customer."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output for scripting.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in as an agent and store the token.
    Login {
        /// Agent email (prompted when omitted).
        #[arg(short, long)]
        email: Option<String>,
        /// Agent password (prompted when omitted).
        #[arg(short, long)]
        password: Option<String>,
        /// Save the token to the config file.
        #[arg(long)]
        save: bool,
    },
    /// Open the agent realtime channel and print events until Ctrl+C.
    Monitor {
        /// Subscribe to updates for a ticket (repeatable).
        #[arg(short, long = "ticket")]
        tickets: Vec<i64>,
        /// Subscribe to dashboard statistics.
        #[arg(long)]
        stats: bool,
    },
    /// Chat with the assistant as a widget visitor.
    Chat {
        /// Visitor id (defaults to the configured or a generated one).
        #[arg(short, long)]
        user_id: Option<String>,
    },
    /// List and triage tickets.
    Tickets {
        #[command(subcommand)]
        action: commands::tickets::TicketsAction,
    },
    /// Show backend health and client configuration.
    Status,
}

#[tokio::main]
async fn main() -> SbResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_handle = ConfigHandle::load(cli.config.as_deref().map(PathBuf::from))?;

    // Initialize logging
    let _guard = {
        let cfg = config_handle.read().await;
        let log_dir = cfg
            .effective_log_dir()
            .unwrap_or_else(|_| PathBuf::from("logs"));
        logging::init_logging(&cfg.logging, &log_dir, cli.verbose)?
    };

    info!("SupportBot CLI v{}", sb_core::constants::APP_VERSION);

    // Dispatch to command handlers
    match cli.command {
        Commands::Login { email, password, save } => {
            commands::login::run(config_handle, email, password, save, cli.format).await
        }
        Commands::Monitor { tickets, stats } => {
            commands::monitor::run(config_handle, tickets, stats, cli.format).await
        }
        Commands::Chat { user_id } => {
            commands::chat::run(config_handle, user_id, cli.format).await
        }
        Commands::Tickets { action } => {
            commands::tickets::run(config_handle, action, cli.format).await
        }
        Commands::Status => commands::status::run(config_handle, cli.format).await,
    }
}
