//! CLI command implementations

pub mod analyze;
pub mod catalogue;
pub mod config;
pub mod report;

use anyhow::{Context as _, Result};
use retro_insights::SprintMetrics;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

/// Read raw input from a file or stdin.
pub fn read_input(file: Option<PathBuf>, use_stdin: bool) -> Result<String> {
    if use_stdin {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        Ok(buffer)
    } else if let Some(path) = file {
        std::fs::read_to_string(&path).context(format!("Failed to read file: {}", path.display()))
    } else {
        anyhow::bail!("Either --input or --stdin must be provided")
    }
}

/// Parse a JSON array of sprint records, oldest first.
pub fn parse_series(raw: &str) -> Result<Vec<SprintMetrics>> {
    serde_json::from_str(raw).context("Failed to parse sprint metrics (expected a JSON array)")
}

/// Write `value` to `path`. YAML for `.yaml`/`.yml`, JSON otherwise.
pub fn write_output<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let format = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => OutputFormat::Yaml,
        _ => OutputFormat::Json,
    };
    let content = format
        .render(value)?
        .context("Table output cannot be written to a file")?;
    std::fs::write(path, content).context(format!("Failed to write output file: {}", path.display()))
}

/// Trim long text for table cells.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
