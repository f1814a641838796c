//! CLI module for vidshrink
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

pub use args::{CompressArgs, InspectArgs, PlanArgs, TargetArgs};

/// vidshrink video compressor
///
/// Re-encodes videos to a smaller size using quality presets or explicit
/// frame rate, bitrate and scale settings.
#[derive(Parser, Debug)]
#[command(name = "vidshrink")]
#[command(about = "Shrink video files with quality presets or custom encode settings")]
#[command(version)]
pub struct Cli {
    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Configuration file (default: ./vidshrink.toml when present)
    #[arg(long, global = true, env = "VIDSHRINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Replace an existing output file
    #[arg(long, global = true, conflicts_with = "no_overwrite")]
    pub overwrite: bool,

    /// Fail if the output file already exists
    #[arg(long, global = true)]
    pub no_overwrite: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Overwrite policy given on the command line, if any
    pub fn overwrite_override(&self) -> Option<bool> {
        match (self.overwrite, self.no_overwrite) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compress a video file
    Compress(CompressArgs),
    /// Show the encode plan for a video without writing anything
    Plan(PlanArgs),
    /// Inspect video file information
    Inspect(InspectArgs),
}
