//! Configuration loading

use anyhow::{Context as _, Result};
use retro_insights::AnalysisConfig;
use std::path::Path;

/// Load the analysis configuration from `path`, or from `RETRO_*`
/// environment variables when no file is given. Always validated.
pub fn load(path: Option<&Path>) -> Result<(AnalysisConfig, String)> {
    match path {
        Some(path) => {
            let config = from_file(path)?;
            Ok((config, path.display().to_string()))
        }
        None => {
            let config = AnalysisConfig::from_env().context("Invalid RETRO_* configuration")?;
            Ok((config, "environment".to_string()))
        }
    }
}

/// Parse and validate a JSON or YAML configuration file.
pub fn from_file(path: &Path) -> Result<AnalysisConfig> {
    let raw = std::fs::read_to_string(path)
        .context(format!("Failed to read config file: {}", path.display()))?;
    let config = parse(&raw, path)?;
    config
        .validate_all()
        .context(format!("Invalid configuration in {}", path.display()))?;
    Ok(config)
}

fn parse(raw: &str, path: &Path) -> Result<AnalysisConfig> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(raw).context("Failed to parse JSON configuration")
    } else {
        serde_yaml::from_str(raw).context("Failed to parse YAML configuration")
    }
}
