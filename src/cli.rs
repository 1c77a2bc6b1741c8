use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "nodesync")]
#[command(version)]
#[command(about = "Keep node branches of shared repositories in sync with the main line")]
pub struct Cli {
    /// Configuration file (default: $NODESYNC_CONFIG, then ~/.config/nodesync/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// More log output (-v for info, -vv for debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch, then reconcile main, node and peer branches of every repository
    Update {
        /// Merge the official upstream into the mirrored branches first
        #[arg(long)]
        from_upstream: bool,
    },
    /// Show how the branches of every repository relate to each other
    Status {
        /// Only list commits not on main whose message contains PATTERN
        #[arg(long, value_name = "PATTERN")]
        grep: Option<String>,
    },
}
