//! Parley CLI — the main entry point.
//!
//! Commands:
//! - `serve`    — Start the HTTP gateway
//! - `chat`     — Send a single message and print the reply
//! - `history`  — Print a session's stored turns
//! - `reset`    — Drop a session
//! - `doctor`   — Diagnose configuration, store and inference backend

use clap::{Parser, Subcommand, ValueEnum};
use parley_config::AppConfig;
use parley_core::context::ContextSource;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "parley",
    about = "Parley — conversational gateway for local language models",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.parley/config.toml)
    #[arg(short, long, global = true, env = "PARLEY_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send one message and print the reply
    Chat {
        /// Session to continue (a new one is created when omitted)
        #[arg(short, long)]
        session: Option<String>,

        /// URL to scrape or query to search for extra context
        #[arg(short = 'x', long)]
        context: Option<String>,

        /// How to interpret --context (inferred when omitted)
        #[arg(long, value_enum)]
        source: Option<SourceArg>,

        /// The message to send
        message: String,
    },

    /// Print the stored history of a session
    History {
        session: String,

        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Drop a session's history
    Reset { session: String },

    /// Diagnose system health
    Doctor,
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceArg {
    Page,
    Search,
}

impl From<SourceArg> for ContextSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Page => ContextSource::Page,
            SourceArg::Search => ContextSource::Search,
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<AppConfig, String> {
    match path {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    }
    .map_err(|e| format!("Failed to load config: {e}"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve { port } => commands::serve::run(load_config(config_path)?, port).await?,
        Commands::Chat {
            session,
            context,
            source,
            message,
        } => {
            let config = load_config(config_path)?;
            commands::chat::run(config, session, context, source.map(Into::into), message).await?
        }
        Commands::History { session, json } => {
            commands::session::history(load_config(config_path)?, &session, json).await?
        }
        Commands::Reset { session } => {
            commands::session::reset(load_config(config_path)?, &session).await?
        }
        Commands::Doctor => commands::doctor::run(config_path).await?,
    }

    Ok(())
}
