//! vidshrink CLI
//!
//! # Usage
//!
//! ```bash
//! vidshrink compress --input holiday.mov --quality low
//! vidshrink compress --input holiday.mov --fps 24 --height 720 --bitrate 1500000
//! vidshrink plan --input holiday.mov --quality medium
//! vidshrink inspect --input holiday.mov --json
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::info;

use vidshrink::cli::{commands, Cli, Commands};
use vidshrink::config_initialization::initialize_settings;
use vidshrink::utils::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = initialize_settings(&cli)?;
    init_logging(&settings.logging.level, settings.logging.json);

    info!("Starting vidshrink {}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Compress(args) => commands::compress(args, &settings).await,
        Commands::Plan(args) => commands::plan(args, &settings).await,
        Commands::Inspect(args) => commands::inspect(args, &settings).await,
    }
}
