//! Config commands

use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use retro_insights::AnalysisConfig;

use crate::config;
use crate::context::Context;
use crate::output::{print_field, print_section};

#[derive(Debug, Args)]
pub struct ConfigCommands {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration
    Show,

    /// Validate a configuration file, or the effective configuration
    Validate {
        /// Configuration file (JSON or YAML)
        file: Option<PathBuf>,
    },
}

pub fn execute(ctx: &Context, cmd: ConfigCommands) -> Result<()> {
    match cmd.command {
        ConfigSubcommand::Show => show(ctx),
        ConfigSubcommand::Validate { file } => validate(ctx, file),
    }
}

fn show(ctx: &Context) -> Result<()> {
    if ctx.output.print_structured(&ctx.config)? {
        return Ok(());
    }

    let config = &ctx.config;
    print_section("Configuration");
    print_field("Source", &ctx.config_source);
    print_field("Telemetry", &config.telemetry_enabled.to_string());
    let focus = match &config.focus_metrics {
        Some(metrics) => metrics.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", "),
        None => "all series metrics".to_string(),
    };
    print_field("Focus metrics", &focus);

    print_section("Statistical");
    let s = &config.statistical;
    print_field("Trend threshold", &s.trend_threshold.to_string());
    print_field("Correlation threshold", &s.correlation_threshold.to_string());
    print_field("Significance level", &s.significance_level.to_string());
    print_field("Z threshold", &s.z_threshold.to_string());
    print_field("Min correlation points", &s.min_correlation_points.to_string());
    print_field("Moving average window", &s.moving_average_window.to_string());

    print_section("Hypothesis");
    let h = &config.hypothesis;
    print_field("Large story share", &h.large_story_share.to_string());
    print_field("Large story points", &h.large_story_points.to_string());
    print_field("Defect env share", &h.defect_environment_share.to_string());
    print_field("Defect focus env", h.defect_focus_environment.label());
    print_field("Min bug count", &h.min_bug_count.to_string());
    print_field("Max hypotheses", &h.max_hypotheses.to_string());

    print_section("Experiment");
    let e = &config.experiment;
    print_field("Max experiments", &e.max_experiments.to_string());
    print_field("Duration step", &e.duration_step.to_string());
    print_field("Max duration sprints", &e.max_duration_sprints.to_string());

    Ok(())
}

fn validate(ctx: &Context, file: Option<PathBuf>) -> Result<()> {
    let source = match file {
        Some(path) => {
            let _: AnalysisConfig = config::from_file(&path)?;
            path.display().to_string()
        }
        None => ctx.config_source.clone(),
    };

    ctx.output.success(&format!("Configuration from {} is valid", source));
    Ok(())
}
