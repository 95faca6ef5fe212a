//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{analyze::AnalyzeArgs, config::ConfigCommands, report::ReportArgs};
use crate::output::OutputFormat;

/// Retro Insights CLI
///
/// Turns sprint metrics into a retrospective report: trends, correlations,
/// ranked hypotheses and experiments to try next.
#[derive(Parser, Debug)]
#[command(name = "retro-insights")]
#[command(version)]
#[command(about = "Sprint retrospective insights from team metrics", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (table, json, yaml)
    #[arg(short, long, global = true, default_value = "table", env = "RETRO_OUTPUT")]
    pub output: OutputFormat,

    /// Analysis configuration file (JSON or YAML); RETRO_* variables when absent
    #[arg(short, long, global = true, env = "RETRO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline and print the retrospective report
    Report(ReportArgs),

    /// Print trends, correlations, anomalies and moving averages only
    #[command(alias = "stats")]
    Analyze(AnalyzeArgs),

    /// List hypothesis templates and their experiments
    #[command(alias = "patterns")]
    Catalogue,

    /// Show or validate the effective configuration
    #[command(alias = "cfg")]
    Config(ConfigCommands),
}
