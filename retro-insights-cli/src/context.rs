//! Shared command context

use anyhow::Result;
use retro_insights::AnalysisConfig;

use crate::cli::Cli;
use crate::config;
use crate::output::Output;

pub struct Context {
    /// Validated analysis configuration
    pub config: AnalysisConfig,

    /// Where the configuration came from, for display
    pub config_source: String,

    pub output: Output,
    pub verbose: bool,
}

impl Context {
    pub fn new(cli: &Cli) -> Result<Self> {
        let (config, config_source) = config::load(cli.config.as_deref())?;

        Ok(Self {
            config,
            config_source,
            output: Output::new(cli.output, cli.no_color),
            verbose: cli.verbose,
        })
    }
}
