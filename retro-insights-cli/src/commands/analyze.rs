//! Analyze command
//!
//! Statistics only, no hypotheses or narrative.
//!
//! ```bash
//! retro-insights analyze --input sprints.json --window 3
//! ```

use anyhow::{Context as _, Result};
use clap::Args;
use comfy_table::{Cell, Color, Table};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use retro_insights::contracts::{
    AnomalyFlag, CorrelationResult, Direction, DistributionResult, EvidenceBase, TrendResult,
};
use retro_insights::ReportAssembler;

use super::{parse_series, read_input};
use crate::context::Context;
use crate::output::print_section;

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Sprint metrics file (JSON array, oldest sprint first)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Read sprint metrics from stdin
    #[arg(long, conflicts_with = "input")]
    pub stdin: bool,

    /// Moving-average window in sprints
    #[arg(short, long)]
    pub window: Option<usize>,
}

/// Machine-readable analyze output.
#[derive(Debug, Serialize)]
struct AnalysisOutput {
    sprints_analyzed: usize,
    #[serde(flatten)]
    evidence: EvidenceBase,
    moving_average_window: usize,
    moving_averages: BTreeMap<String, Vec<f64>>,
}

pub fn execute(ctx: &Context, args: AnalyzeArgs) -> Result<()> {
    let series = parse_series(&read_input(args.input, args.stdin)?)?;

    let mut config = ctx.config.clone();
    if let Some(window) = args.window {
        config.statistical.moving_average_window = window;
    }
    let window = config.statistical.moving_average_window;
    let metrics = config.analyzed_metrics();
    let assembler = ReportAssembler::new(config).context("Invalid analysis configuration")?;
    let analyzer = assembler.analyzer();
    let evidence = analyzer.analyze(&series, &metrics);

    let moving_averages: BTreeMap<String, Vec<f64>> = metrics
        .iter()
        .map(|metric| (metric.as_str().to_string(), analyzer.metric_moving_average(&series, *metric)))
        .filter(|(_, averages)| !averages.is_empty())
        .collect();

    let output = AnalysisOutput {
        sprints_analyzed: series.len(),
        evidence,
        moving_average_window: window,
        moving_averages,
    };

    if !ctx.output.print_structured(&output)? {
        display_analysis(&output);
    }

    Ok(())
}

pub fn trend_table(trends: &[TrendResult]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("Metric").fg(Color::Cyan),
        Cell::new("Change").fg(Color::Cyan),
        Cell::new("Previous → Current").fg(Color::Cyan),
        Cell::new("Significance").fg(Color::Cyan),
    ]);

    for trend in trends {
        let change = match trend.direction {
            Direction::Up => Cell::new(trend.descriptor()).fg(Color::Red),
            Direction::Down => Cell::new(trend.descriptor()).fg(Color::Green),
            Direction::Stable => Cell::new(trend.descriptor()),
        };
        table.add_row(vec![
            Cell::new(trend.metric.title()),
            change,
            Cell::new(trend.metric.format_change(trend.previous_value, trend.current_value)),
            Cell::new(trend.significance),
        ]);
    }
    table
}

fn correlation_table(correlations: &[CorrelationResult]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("Metrics").fg(Color::Cyan),
        Cell::new("r").fg(Color::Cyan),
        Cell::new("p").fg(Color::Cyan),
        Cell::new("n").fg(Color::Cyan),
        Cell::new("Interpretation").fg(Color::Cyan),
    ]);

    for correlation in correlations {
        let r = Cell::new(format!("{:+.3}", correlation.coefficient));
        table.add_row(vec![
            Cell::new(format!("{} / {}", correlation.metric_a.title(), correlation.metric_b.title())),
            if correlation.is_strong && correlation.is_significant { r.fg(Color::Yellow) } else { r },
            Cell::new(format!("{:.4}", correlation.p_value)),
            Cell::new(correlation.sample_size),
            Cell::new(correlation.interpretation()),
        ]);
    }
    table
}

fn anomaly_table(anomalies: &[AnomalyFlag]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("Metric").fg(Color::Cyan),
        Cell::new("Sprint").fg(Color::Cyan),
        Cell::new("Value").fg(Color::Cyan),
        Cell::new("z").fg(Color::Cyan),
    ]);

    for anomaly in anomalies {
        table.add_row(vec![
            Cell::new(anomaly.metric.title()),
            Cell::new(&anomaly.sprint_id),
            Cell::new(anomaly.metric.format_value(anomaly.value)),
            Cell::new(format!("{:+.2}", anomaly.z_score)),
        ]);
    }
    table
}

fn distribution_table(distribution: &DistributionResult) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("Bucket").fg(Color::Cyan),
        Cell::new("Count").fg(Color::Cyan),
        Cell::new("Share").fg(Color::Cyan),
    ]);

    for bucket in &distribution.buckets {
        table.add_row(vec![
            Cell::new(&bucket.label),
            Cell::new(bucket.count),
            Cell::new(format!("{:.0}%", bucket.share * 100.0)),
        ]);
    }
    table
}

fn display_analysis(output: &AnalysisOutput) {
    let evidence = &output.evidence;

    print_section(&format!("Trends ({} sprints)", output.sprints_analyzed));
    if evidence.trends.is_empty() {
        println!("  Not enough data for trends.");
    } else {
        println!("{}", trend_table(&evidence.trends));
    }

    if !evidence.correlations.is_empty() {
        print_section("Correlations");
        println!("{}", correlation_table(&evidence.correlations));
    }

    if !evidence.anomalies.is_empty() {
        print_section("Anomalies");
        println!("{}", anomaly_table(&evidence.anomalies));
    }

    for distribution in &evidence.distributions {
        print_section(&format!(
            "{} ({}, {} items)",
            distribution.metric.title(),
            distribution.sprint_id,
            distribution.total
        ));
        println!("{}", distribution_table(distribution));
    }

    if !output.moving_averages.is_empty() {
        print_section(&format!("Moving averages (window {})", output.moving_average_window));
        for (metric, averages) in &output.moving_averages {
            let values: Vec<String> = averages.iter().map(|v| format!("{:.2}", v)).collect();
            println!("  {:<28} {}", metric, values.join("  "));
        }
    }
}
