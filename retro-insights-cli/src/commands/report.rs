//! Report command
//!
//! ```bash
//! retro-insights report --input sprints.json
//! retro-insights report --stdin --enrich --context "Team of five, two new joiners"
//! retro-insights report -i sprints.json --out report.yaml -o json
//! ```

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;
use comfy_table::{Cell, Color, Table};
use std::path::PathBuf;

use retro_insights::{ChatCompletionsEnricher, ConfidenceLevel, ReportAssembler, RetrospectiveReport};

use super::{parse_series, read_input, truncate, write_output};
use crate::context::Context;
use crate::output::{print_field, print_section};

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Sprint metrics file (JSON array, oldest sprint first)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Read sprint metrics from stdin
    #[arg(long, conflicts_with = "input")]
    pub stdin: bool,

    /// Also write the report to this file (.json, .yaml or .yml)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Rewrite the narrative with the chat-completions endpoint (RETRO_LLM_*)
    #[arg(long)]
    pub enrich: bool,

    /// Extra team context passed to the enrichment prompts
    #[arg(long, requires = "enrich")]
    pub context: Option<String>,

    /// Override the number of hypotheses kept
    #[arg(long)]
    pub max_hypotheses: Option<usize>,

    /// Override the number of experiments suggested
    #[arg(long)]
    pub max_experiments: Option<usize>,
}

pub async fn execute(ctx: &Context, args: ReportArgs) -> Result<()> {
    let series = parse_series(&read_input(args.input, args.stdin)?)?;

    let mut config = ctx.config.clone();
    if let Some(limit) = args.max_hypotheses {
        config.hypothesis.max_hypotheses = limit;
    }
    if let Some(limit) = args.max_experiments {
        config.experiment.max_experiments = limit;
    }
    let assembler = ReportAssembler::new(config).context("Invalid analysis configuration")?;

    if ctx.verbose {
        ctx.output.info(&format!("Analyzing {} sprints", series.len()));
    }

    let report = if args.enrich {
        match ChatCompletionsEnricher::from_env() {
            Ok(enricher) => assembler.assemble_enriched(&series, &enricher, args.context).await,
            Err(e) => {
                ctx.output.warn(&format!("Enrichment unavailable ({}), using template narrative", e));
                assembler.assemble(&series)
            }
        }
    } else {
        assembler.assemble(&series)
    };

    if let Some(path) = &args.out {
        write_output(path, &report)?;
        ctx.output.success(&format!("Report written to {}", path.display()));
    }

    if !ctx.output.print_structured(&report)? {
        display_report(&report);
    }

    Ok(())
}

fn confidence_cell(confidence: ConfidenceLevel) -> Cell {
    let color = match confidence {
        ConfidenceLevel::High => Color::Green,
        ConfidenceLevel::Medium => Color::Yellow,
        ConfidenceLevel::Low => Color::DarkGrey,
    };
    Cell::new(confidence).fg(color)
}

fn display_report(report: &RetrospectiveReport) {
    println!("\n{}", report.headline.bold());
    println!("{}", report.summary.dimmed());

    print_section("Overview");
    print_field("Sprint period", &report.sprint_period);
    print_field("Sprints analyzed", &report.sprints_analyzed.to_string());
    print_field("Overall confidence", &report.confidence_overall.to_string());
    print_field("Narrative", &format!("{:?}", report.narrative_source));
    print_field("Inputs hash", &truncate(&report.inputs_hash, 16));

    if !report.trends.is_empty() {
        print_section("Trends");
        println!("{}", super::analyze::trend_table(&report.trends));
    }

    print_section("Hypotheses");
    if report.hypotheses.is_empty() {
        println!("  No patterns matched the evidence.");
    } else {
        let mut table = Table::new();
        table.set_header(vec![
            Cell::new("#").fg(Color::Cyan),
            Cell::new("Hypothesis").fg(Color::Cyan),
            Cell::new("Confidence").fg(Color::Cyan),
            Cell::new("Score").fg(Color::Cyan),
            Cell::new("Metrics").fg(Color::Cyan),
        ]);
        for (i, hypothesis) in report.hypotheses.iter().enumerate() {
            let metrics: Vec<String> = hypothesis.affected_metrics.iter().map(|m| m.title()).collect();
            table.add_row(vec![
                Cell::new(i + 1),
                Cell::new(&hypothesis.title),
                confidence_cell(hypothesis.confidence),
                Cell::new(hypothesis.confidence_score.round_dp(2)),
                Cell::new(metrics.join(", ")),
            ]);
        }
        println!("{}", table);

        for hypothesis in &report.hypotheses {
            println!("\n  {}", hypothesis.title.bold());
            let description = hypothesis
                .enhanced_description
                .as_deref()
                .unwrap_or(&hypothesis.description);
            println!("  {}", description);
            for evidence in &hypothesis.evidence {
                println!("    {} {}: {} ({})", "-".dimmed(), evidence.metric.title(), evidence.trend, evidence.value);
            }
        }
    }

    if !report.suggested_experiments.is_empty() {
        print_section("Experiments");
        let mut table = Table::new();
        table.set_header(vec![
            Cell::new("Experiment").fg(Color::Cyan),
            Cell::new("Sprints").fg(Color::Cyan),
            Cell::new("Success metrics").fg(Color::Cyan),
            Cell::new("Expected outcome").fg(Color::Cyan),
        ]);
        for experiment in &report.suggested_experiments {
            let metrics: Vec<String> = experiment.success_metrics.iter().map(|m| m.title()).collect();
            table.add_row(vec![
                Cell::new(&experiment.title),
                Cell::new(experiment.duration_sprints),
                Cell::new(metrics.join(", ")),
                Cell::new(truncate(&experiment.expected_outcome, 60)),
            ]);
        }
        println!("{}", table);
    }

    print_section("Retrospective");
    for (i, question) in report.facilitation_guide.retro_questions.iter().enumerate() {
        println!("  {}. {}", i + 1, question);
    }
    println!();
    for step in &report.facilitation_guide.agenda_15min {
        println!("  {} {}", "*".cyan(), step);
    }
}
