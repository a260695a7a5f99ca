//! Initialize a new ChemKG project.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::config::{Config, CONFIG_FILE, DATA_DIR};

pub fn run(path: Option<String>) -> Result<()> {
    let base_path = match path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir()?,
    };

    println!("{} Initializing ChemKG project...", "→".blue());

    let data_dir = base_path.join(DATA_DIR);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;
    println!("  {} Created {}", "✓".green(), data_dir.display());

    let config_path = base_path.join(CONFIG_FILE);
    if !config_path.exists() {
        Config::default().save(&config_path)?;
        println!("  {} Created {}", "✓".green(), config_path.display());
    } else {
        println!("  {} {} already exists", "•".yellow(), config_path.display());
    }

    // Built artifacts stay out of version control; records are kept.
    let gitignore_path = data_dir.join(".gitignore");
    if !gitignore_path.exists() {
        std::fs::write(&gitignore_path, "graph.json\ngraph.json.tmp\n")?;
        println!("  {} Created {}", "✓".green(), gitignore_path.display());
    }

    println!();
    println!("{} ChemKG project initialized!", "✓".green().bold());
    println!();
    println!("Next steps:");
    println!("  {} chemkg build <records.json> --passages <passages.json>", "1.".blue());
    println!("  {} chemkg stats", "2.".blue());
    println!("  {} chemkg curriculum --strategy hybrid", "3.".blue());
    println!("  {} chemkg trace \"Why is [Cu(H2O)6]2+ blue?\"", "4.".blue());

    Ok(())
}
