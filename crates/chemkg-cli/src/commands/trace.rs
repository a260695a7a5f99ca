//! Prerequisite traces and learning paths.

use anyhow::Result;
use chemkg::prelude::*;
use colored::Colorize;

use crate::commands::{print_json, score, Workspace};

/// Trace a concept by name, or map a free-text question to one.
pub fn trace(target: &str, depth: Option<usize>, json: bool) -> Result<()> {
    let ws = Workspace::open()?;
    let tracer = ws.tracer();
    let depth = depth.unwrap_or(tracer.config().max_depth);

    let trace = match ws.graph.resolve(target) {
        Some(node) => tracer.trace_depth(&node.id, depth)?,
        None => tracer.question_to_trace(target)?,
    };

    if json {
        return print_json(&trace);
    }

    println!(
        "{} {} prerequisites of {} within {} hops",
        "→".blue(),
        (trace.nodes.len().saturating_sub(1)).to_string().cyan(),
        trace.target.white().bold(),
        trace.max_depth
    );
    println!();

    for layer in &trace.funnel {
        println!(
            "  {} {}",
            layer.scale.as_str().blue().bold(),
            format!("({})", layer.count).dimmed()
        );
        for id in &layer.nodes {
            let node = trace.node(id);
            let rank = node.map(|n| score(n.reverse_rank)).unwrap_or_default();
            let marker = if node.is_some_and(|n| n.is_target) { "◎" } else { "•" };
            println!("    {} {} {}", marker.green(), id, rank);
        }
    }

    Ok(())
}

/// Numbered learning path to `target`, skipping known concepts.
pub fn path(target: &str, known: &[String], json: bool) -> Result<()> {
    let ws = Workspace::open()?;
    let path = ws.tracer().learning_path(target, known)?;

    if json {
        return print_json(&path);
    }

    println!(
        "{} Learning path to {}: {} new concepts, {} known skipped",
        "→".blue(),
        path.target.white().bold(),
        path.new_concepts.to_string().cyan(),
        path.skipped_known
    );
    println!();

    for step in &path.steps {
        let concept = match step.status {
            StepStatus::Target => step.concept.green().bold(),
            StepStatus::Known => step.concept.dimmed(),
            StepStatus::ToLearn => step.concept.white(),
        };
        println!(
            "  {} {} {} {}",
            format!("{:>3}.", step.step).blue(),
            concept,
            format!("[{}]", step.scale.as_str()).dimmed(),
            score(step.reverse_rank)
        );
    }

    if !path.cycle.is_empty() {
        println!();
        println!(
            "  {} {} steps sit on prerequisite cycles; their order is a fallback",
            "•".yellow(),
            path.cycle.len()
        );
    }

    Ok(())
}
