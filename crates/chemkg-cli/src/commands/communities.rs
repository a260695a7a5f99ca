//! Detect topic communities.

use anyhow::Result;
use chemkg::prelude::*;
use colored::Colorize;

use crate::commands::{print_json, Workspace};

const MEMBERS_SHOWN: usize = 8;

pub fn run(top: usize, json: bool) -> Result<()> {
    let ws = Workspace::open()?;
    let config = ws.config.curriculum.sequencer().community;
    let result = detect_communities(&ws.graph, &config);

    if json {
        return print_json(&result);
    }

    println!(
        "{} {} communities among {} topics ({} iterations{})",
        "→".blue(),
        result.num_communities.to_string().cyan(),
        result.total_nodes,
        result.iterations,
        if result.converged { "" } else { ", not converged" }
    );
    println!();

    for (i, c) in result.communities.iter().take(top).enumerate() {
        println!(
            "  {} {} {}",
            format!("{}.", i + 1).blue(),
            c.name.white().bold(),
            format!("({} topics, {} mentions)", c.size, c.total_mentions).dimmed()
        );
        let shown: Vec<&str> = c
            .members
            .iter()
            .filter(|m| **m != c.name)
            .take(MEMBERS_SHOWN)
            .map(String::as_str)
            .collect();
        let more = c.size.saturating_sub(shown.len() + 1);
        let suffix = if more > 0 { format!(", +{more} more") } else { String::new() };
        println!("     {}{}", shown.join(", "), suffix.dimmed());
    }

    Ok(())
}
