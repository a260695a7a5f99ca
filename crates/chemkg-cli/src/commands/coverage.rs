//! Per-source coverage of a topic and cross-source synthesis.

use anyhow::Result;
use colored::Colorize;

use crate::commands::{block_on, print_json, Workspace};

pub fn run(topic: &str, json: bool) -> Result<()> {
    let ws = Workspace::open()?;
    let pipeline = ws.pipeline(ws.config.pipeline()?)?;
    let coverage = block_on(pipeline.coverage(topic))??;

    if json {
        return print_json(&coverage);
    }

    println!(
        "{} {} passages on {} across {} sources",
        "→".blue(),
        coverage.total_chunks.to_string().cyan(),
        coverage.topic.white().bold(),
        coverage.num_sources.to_string().cyan()
    );
    println!();

    let mut sources: Vec<_> = coverage.sources.iter().collect();
    sources.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));
    for (source, entry) in sources {
        println!("  {} {}", format!("{:>4}", entry.count).cyan(), source);
    }

    if let Some(d) = &coverage.degraded {
        println!();
        println!("  {} {}", "•".yellow(), d.message.dimmed());
    }

    Ok(())
}

pub fn synthesize(topic: &str, max_per_source: usize, json: bool) -> Result<()> {
    let ws = Workspace::open()?;
    let pipeline = ws.pipeline(ws.config.pipeline()?)?;

    if !json {
        println!("{} Synthesizing {} across sources...", "→".blue(), topic.cyan());
        println!();
    }

    let summary = block_on(pipeline.synthesize(topic, max_per_source))?;

    if json {
        return print_json(&serde_json::json!({ "topic": topic, "summary": summary }));
    }
    println!("{}", summary);
    Ok(())
}
