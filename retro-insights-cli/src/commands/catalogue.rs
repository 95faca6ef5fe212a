//! Catalogue command

use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, Color, Table};
use serde::Serialize;

use retro_insights::analysis::CATALOGUE;
use retro_insights::contracts::HypothesisType;
use retro_insights::ExperimentCatalogue;

use crate::context::Context;
use crate::output::print_section;

#[derive(Debug, Serialize)]
struct CatalogueEntry {
    hypothesis_type: HypothesisType,
    title: &'static str,
    potential_impact: &'static str,
    experiments: Vec<&'static str>,
}

pub fn execute(ctx: &Context) -> Result<()> {
    let experiments = ExperimentCatalogue::standard();

    let entries: Vec<CatalogueEntry> = CATALOGUE
        .iter()
        .map(|template| CatalogueEntry {
            hypothesis_type: template.hypothesis_type,
            title: template.title,
            potential_impact: template.potential_impact,
            experiments: experiments
                .templates_for(template.hypothesis_type)
                .iter()
                .map(|e| e.title)
                .collect(),
        })
        .collect();

    if ctx.output.print_structured(&entries)? {
        return Ok(());
    }

    print_section("Hypothesis Catalogue");
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("#").fg(Color::Cyan),
        Cell::new("Type").fg(Color::Cyan),
        Cell::new("Title").fg(Color::Cyan),
        Cell::new("Experiments").fg(Color::Cyan),
    ]);
    for (i, entry) in entries.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(entry.hypothesis_type.as_str()),
            Cell::new(entry.title),
            Cell::new(entry.experiments.join("\n")),
        ]);
    }
    println!("{}", table);
    println!("\n{}", "Ties in confidence keep catalogue order.".dimmed());

    Ok(())
}
