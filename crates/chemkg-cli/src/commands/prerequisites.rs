//! Ranked prerequisites of a topic.

use anyhow::Result;
use colored::Colorize;

use crate::commands::{print_json, score, Workspace};

pub fn run(topic: &str, depth: usize, json: bool) -> Result<()> {
    let ws = Workspace::open()?;
    let tracer = ws.tracer();
    let id = tracer.resolve(topic)?;
    let prerequisites = tracer.ranked_prerequisites(id, depth)?;

    if json {
        return print_json(&serde_json::json!({
            "topic": id,
            "depth": depth,
            "prerequisites": prerequisites,
        }));
    }

    println!(
        "{} Prerequisites of {} within {} hops:",
        "→".blue(),
        id.cyan(),
        depth
    );
    println!();

    if prerequisites.is_empty() {
        println!("  {} none found", "•".yellow());
        return Ok(());
    }

    for (i, p) in prerequisites.iter().enumerate() {
        println!(
            "  {} {} {} {}",
            format!("{}.", i + 1).blue(),
            p.id.white().bold(),
            score(p.reverse_rank),
            format!("depth {}", p.depth).dimmed()
        );
    }

    Ok(())
}
