//! Command-line surface.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "dabmux", about = "Software DAB/DAB+ multiplexer", version)]
pub struct Cli {
    /// Path to the TOML ensemble configuration.
    pub config: PathBuf,

    /// Exit after this many frames (24 ms each); mainly for testing.
    #[arg(long)]
    pub limit: Option<u64>,

    /// Override the configured log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,
}
