//! Terminal output helpers

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

/// How command results are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Serialize `value` for machine-readable formats; `None` for tables.
    pub fn render<T: Serialize>(self, value: &T) -> Result<Option<String>> {
        match self {
            Self::Table => Ok(None),
            Self::Json => Ok(Some(serde_json::to_string_pretty(value)?)),
            Self::Yaml => Ok(Some(serde_yaml::to_string(value)?)),
        }
    }
}

/// Status messages on stderr, so stdout carries only results.
#[derive(Debug, Clone)]
pub struct Output {
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat, no_color: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format }
    }

    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green().bold(), message);
    }

    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "!".yellow().bold(), message);
    }

    pub fn info(&self, message: &str) {
        eprintln!("{}", message.dimmed());
    }

    /// Print `value` as JSON or YAML. Returns false for table output.
    pub fn print_structured<T: Serialize>(&self, value: &T) -> Result<bool> {
        match self.format.render(value)? {
            Some(text) => {
                println!("{}", text);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

pub fn print_section(title: &str) {
    println!("\n{}", title.bold().cyan());
    println!("{}", "=".repeat(title.chars().count().max(20)));
}

pub fn print_field(name: &str, value: &str) {
    println!("  {:<22} {}", format!("{}:", name).bold(), value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_formats() {
        let value = serde_json::json!({ "headline": "h", "count": 2 });
        assert!(OutputFormat::Table.render(&value).unwrap().is_none());
        assert!(OutputFormat::Json.render(&value).unwrap().unwrap().contains("\"count\": 2"));
        assert!(OutputFormat::Yaml.render(&value).unwrap().unwrap().contains("count: 2"));
    }
}
