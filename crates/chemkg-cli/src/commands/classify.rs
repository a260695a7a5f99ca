//! Classify nodes as foundations, hubs and capstones.

use anyhow::Result;
use colored::Colorize;

use crate::commands::{print_json, score, Workspace};

pub fn run(top: Option<usize>, json: bool) -> Result<()> {
    let ws = Workspace::open()?;
    let mut engine = ws.config.engine();
    if let Some(n) = top {
        engine.top_n = n;
    }
    let report = engine.analyze(&ws.graph);

    if json {
        return print_json(&report);
    }

    println!(
        "{} Mean degree {:.2}, recommended method: {}{}",
        "→".blue(),
        report.mean_degree,
        report.method.as_str().cyan(),
        if report.converged { "" } else { " (rank did not converge)" }
    );
    println!();

    let section = |title: &str, ids: &[String]| {
        println!("{}", title.blue().bold());
        if ids.is_empty() {
            println!("  {}", "none".dimmed());
        }
        for (i, id) in ids.iter().enumerate() {
            let detail = report
                .class(id)
                .map(|c| {
                    format!(
                        "{} {}",
                        score(c.position),
                        format!("in {} / out {}", c.in_degree, c.out_degree).dimmed()
                    )
                })
                .unwrap_or_default();
            println!("  {} {} {}", format!("{}.", i + 1).blue(), id.white(), detail);
        }
        println!();
    };

    section("Foundations by rank", &report.top_foundations_by_rank);
    section("Capstones by rank", &report.top_capstones_by_rank);
    section("Foundations by degree", &report.foundations_by_degree);
    section("Capstones by degree", &report.capstones_by_degree);
    section("Hubs", &report.hubs);

    Ok(())
}
