//! Retro Insights CLI
//!
//! Command-line front end for the sprint retrospective analysis pipeline:
//! full reports, raw statistics, the pattern catalogue and configuration.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod context;
mod output;

use cli::{Cli, Commands};
use context::Context;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging on stderr so stdout stays machine-readable
    let default_level = if cli.verbose { "retro_insights=debug" } else { "retro_insights=info" };
    let filter = EnvFilter::from_default_env()
        .add_directive(default_level.parse()?)
        .add_directive("warn".parse()?);

    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    // Create context
    let ctx = Context::new(&cli)?;

    // Execute command
    match cli.command {
        Commands::Report(args) => commands::report::execute(&ctx, args).await,
        Commands::Analyze(args) => commands::analyze::execute(&ctx, args),
        Commands::Catalogue => commands::catalogue::execute(&ctx),
        Commands::Config(cmd) => commands::config::execute(&ctx, cmd),
    }
}
