// MAGI GUI - CLI launcher
// Parses flags, loads configuration, and serves the web front-end.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use magi_gui::config::{load_config, load_config_from};
use magi_gui::server::{serve, AppState};

#[derive(Parser)]
#[command(name = "magi-gui", version, about = "Web front-end for the MAGI consensus engine")]
struct Cli {
    /// Bind address for the HTTP server (overrides configuration)
    #[arg(long)]
    bind: Option<String>,

    /// Path to an alternate configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }

    let state = Arc::new(AppState::new(config));
    serve(state).await
}
