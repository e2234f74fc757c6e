// ABOUTME: Entry point for the hotpatch CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use hotpatch::error::Result;
use hotpatch::output::Output;
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let output = Output::new(cli.output);
    let error_output = Output::new(cli.output);

    if let Err(e) = run(cli.command, output).await {
        error_output.error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(command: Commands, output: Output) -> Result<()> {
    let cwd = env::current_dir()?;
    match command {
        Commands::Init { force } => commands::init(&cwd, force, output),
        Commands::Check => commands::check(&cwd, output),
        Commands::Order { mode } => commands::order(&cwd, mode, output).await,
        Commands::Dispatch {
            target,
            paths,
            mode,
        } => commands::dispatch(&cwd, &target, paths, mode, output).await,
    }
}
