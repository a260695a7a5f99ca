//! Rebuild the graph from extraction records.

use anyhow::{bail, Context, Result};
use chemkg::prelude::*;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

use crate::commands::print_json;
use crate::config::Config;

const STAGES: u64 = 5;

pub fn run(
    records: Option<String>,
    passages: Option<String>,
    noise_threshold: Option<u32>,
    json: bool,
) -> Result<()> {
    let config = Config::load()?;

    let records_path = records.map(PathBuf::from).unwrap_or_else(|| config.records_path());
    if !records_path.exists() {
        bail!("Records file does not exist: {}", records_path.display());
    }

    let mut build_config = config.graph.build_config();
    if let Some(threshold) = noise_threshold {
        build_config = build_config.with_noise_threshold(threshold);
    }

    let pb = if json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(STAGES)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    pb.set_message("reading records");
    let text = std::fs::read_to_string(&records_path)
        .with_context(|| format!("Failed to read: {}", records_path.display()))?;
    let records = ExtractionRecord::parse_batch(&text)
        .with_context(|| format!("Failed to parse records: {}", records_path.display()))?;
    pb.inc(1);

    pb.set_message("building graph");
    let (graph, report) = GraphBuilder::new(build_config).build(&records)?;
    pb.inc(1);

    pb.set_message("ranking");
    let scores = config.engine().scores(&graph);
    pb.inc(1);

    pb.set_message("enhancing");
    let enhanced = graph.enhance(&scores);
    pb.inc(1);

    pb.set_message("saving");
    let graph_path = config.graph_path();
    enhanced.save(&graph_path)?;
    pb.inc(1);

    let installed = match passages {
        Some(p) => Some(install_passages(Path::new(&p), &config.passages_path())?),
        None => None,
    };
    pb.finish_and_clear();

    if json {
        return print_json(&serde_json::json!({
            "graph": graph_path,
            "report": report,
            "passages": installed,
        }));
    }

    println!(
        "{} Built graph from {} records",
        "✓".green().bold(),
        report.records.to_string().cyan()
    );
    println!();
    println!("  Nodes:                 {}", report.nodes.to_string().cyan());
    println!("  Edges:                 {}", report.edges.to_string().cyan());
    println!("  Dropped names:         {}", report.dropped_names);
    println!("  Edges below threshold: {}", report.edges_below_threshold);
    println!("  Dangling edges:        {}", report.dangling_edges);
    println!("  Self loops:            {}", report.self_loops);
    println!("  Capped concepts:       {}", report.capped_concepts);
    if report.records_without_chunk > 0 {
        println!(
            "  {} {} records had no chunk id",
            "•".yellow(),
            report.records_without_chunk
        );
    }
    println!();
    println!("  Saved to {}", graph_path.display().to_string().dimmed());
    if let Some(count) = installed {
        println!("  Installed {} passages", count.to_string().cyan());
    }

    Ok(())
}

/// Copy a passage file into the project's passage store.
fn install_passages(from: &Path, to: &Path) -> Result<usize> {
    if !from.exists() {
        bail!("Passage file does not exist: {}", from.display());
    }
    let store = InMemoryPassageStore::load(from)?;
    store.save(to)?;
    tracing::info!(passages = store.len(), path = %to.display(), "passage store installed");
    Ok(store.len())
}
