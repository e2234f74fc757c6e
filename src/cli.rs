// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use hotpatch::build::UpdateMode;
use hotpatch::output::OutputMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hotpatch")]
#[command(about = "Live-update or rebuild running Docker and Kubernetes workloads from local changes")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputMode::Normal, global = true)]
    pub output: OutputMode,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a hotpatch.yml template in the current directory
    Init {
        /// Overwrite an existing hotpatch.yml
        #[arg(long)]
        force: bool,
    },

    /// Validate hotpatch.yml and every target's live_update
    Check,

    /// Show which update strategies would be tried, in order
    Order {
        /// Override the configured update mode
        #[arg(long)]
        mode: Option<UpdateMode>,
    },

    /// Push one change to a target using the cheapest strategy that works
    Dispatch {
        /// Target name from hotpatch.yml
        target: String,

        /// Changed files, relative to the current directory or absolute
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Override the configured update mode
        #[arg(long)]
        mode: Option<UpdateMode>,
    },
}
