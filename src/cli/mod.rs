//! Command-line Interface

use clap::Parser;
use std::path::PathBuf;

/// Chat-integrated anonymous polling service
#[derive(Debug, Parser)]
#[command(name = "pollbot", version, about)]
pub struct Cli {
    /// Path to a JSON or JSON5 configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log filter override (e.g. "debug" or "pollbot=debug,info")
    #[arg(long)]
    pub log_level: Option<String>,
}
