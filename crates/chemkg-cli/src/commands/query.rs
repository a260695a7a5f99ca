//! Answer a question through the decomposition pipeline.

use anyhow::Result;
use chemkg::prelude::*;
use colored::Colorize;

use crate::commands::{block_on, print_json, Workspace};

pub fn run(question: &str, sequential: bool, json: bool) -> Result<()> {
    let ws = Workspace::open()?;

    let mut config = ws.config.pipeline()?;
    if sequential {
        config = config.with_mode(PipelineMode::Sequential);
    }
    let pipeline = ws.pipeline(config)?;

    if !json {
        println!(
            "{} Answering with {} ({})...",
            "→".blue(),
            pipeline.llm().config().model.cyan(),
            pipeline.llm().name()
        );
        println!();
    }

    let answer = block_on(pipeline.answer(question))?;

    if json {
        return print_json(&answer);
    }

    println!("{}", "Sub-questions".blue().bold());
    for sq in &answer.sub_questions {
        let deps = if sq.depends_on.is_empty() {
            String::new()
        } else {
            let ids: Vec<String> = sq.depends_on.iter().map(|d| format!("Q{d}")).collect();
            format!(" (after {})", ids.join(", ")).dimmed().to_string()
        };
        println!("  {} {}{}", format!("Q{}.", sq.id).blue(), sq.question.white().bold(), deps);
        if let Some(text) = answer.sub_answers.get(&sq.id) {
            for line in text.lines() {
                println!("     {}", line);
            }
        }
        println!();
    }

    println!("{}", "Answer".green().bold());
    println!("{}", answer.final_answer);

    let diag = &answer.diagnostics;
    if !diag.is_clean() {
        println!();
        if !diag.cycle.is_empty() {
            let ids: Vec<String> = diag.cycle.iter().map(|d| format!("Q{d}")).collect();
            println!(
                "  {} circular dependencies among {}; answered in declared order",
                "•".yellow(),
                ids.join(", ")
            );
        }
        for d in &diag.degraded {
            let at = d.sub_question.map(|id| format!(" Q{id}")).unwrap_or_default();
            println!("  {} {}{}: {}", "•".yellow(), d.stage, at, d.message.dimmed());
        }
    }

    Ok(())
}
