//! Sequence significant topics into a curriculum.

use anyhow::Result;
use chemkg::prelude::*;
use colored::Colorize;
use std::collections::HashSet;

use crate::commands::{print_json, score, Workspace};

/// Rows shown per strategy when comparing.
const COMPARE_ROWS: usize = 10;

pub fn run(strategy: Option<&str>, min_count: Option<u64>, all: bool, json: bool) -> Result<()> {
    let ws = Workspace::open()?;

    let mut config = ws.config.curriculum.sequencer();
    if let Some(min) = min_count {
        config = config.with_min_count(min);
    }
    let sequencer = CurriculumSequencer::new(&ws.graph, &ws.scores, config);

    if all {
        return compare(&sequencer, json);
    }

    let strategy = Strategy::parse(strategy.unwrap_or(ws.config.curriculum.strategy.as_str()))?;
    let curriculum = sequencer.sequence(strategy);
    let checkpoints = find_checkpoints(
        &curriculum.order,
        &ws.scores,
        &ws.config.curriculum.checkpoints(),
    );

    if json {
        return print_json(&serde_json::json!({
            "curriculum": curriculum,
            "checkpoints": checkpoints,
        }));
    }

    println!(
        "{} {} curriculum: {} topics with at least {} mentions",
        "→".blue(),
        curriculum.method.cyan(),
        curriculum.total_topics.to_string().cyan(),
        curriculum.min_count
    );
    println!();

    let flagged: HashSet<&str> = checkpoints.iter().map(|c| c.id.as_str()).collect();
    for entry in &curriculum.topics {
        let marker = if flagged.contains(entry.id.as_str()) {
            "★".yellow().to_string()
        } else {
            " ".to_string()
        };
        println!(
            "  {} {} {} {} {}",
            format!("{:>3}.", entry.rank).blue(),
            marker,
            entry.id.white().bold(),
            score(entry.reverse_rank),
            format!("{} mentions", entry.mention_count).dimmed()
        );
    }
    if curriculum.total_topics > curriculum.topics.len() {
        println!(
            "       {}",
            format!("... {} more", curriculum.total_topics - curriculum.topics.len()).dimmed()
        );
    }

    if !checkpoints.is_empty() {
        println!();
        println!("{}", "Checkpoints".blue().bold());
        for c in &checkpoints {
            println!(
                "  {} {} {} {}",
                format!("@{:>3}", c.position).yellow(),
                c.id.white(),
                format!("in {} / out {}", c.in_degree, c.out_degree).dimmed(),
                format!("mastery {:.0}%", c.mastery_threshold * 100.0).dimmed()
            );
        }
    }

    if curriculum.has_cycle() {
        println!();
        println!(
            "  {} {} topics sit on prerequisite cycles and were placed by fallback",
            "•".yellow(),
            curriculum.cycle.len()
        );
    }

    Ok(())
}

fn compare(sequencer: &CurriculumSequencer<'_>, json: bool) -> Result<()> {
    let all = sequencer.compare_all();
    if json {
        return print_json(&all);
    }

    for curriculum in &all {
        println!(
            "{} {}",
            curriculum.method.blue().bold(),
            format!("({} topics)", curriculum.total_topics).dimmed()
        );
        let head: Vec<&str> = curriculum
            .topics
            .iter()
            .take(COMPARE_ROWS)
            .map(|e| e.id.as_str())
            .collect();
        println!("  {}", head.join(" → "));
        println!();
    }
    Ok(())
}
