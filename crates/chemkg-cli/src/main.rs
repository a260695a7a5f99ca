//! ChemKG CLI - Command-line interface for chemistry textbook knowledge graphs.

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;

#[derive(Parser)]
#[command(name = "chemkg")]
#[command(author, version, about = "ChemKG - Curricula and prerequisite traces from textbook knowledge graphs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new ChemKG project
    Init {
        /// Project directory (default: current directory)
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Rebuild the graph from extraction records and persist it
    Build {
        /// Records file, JSON array or JSON Lines (default: [graph].records)
        records: Option<String>,

        /// Passage file (JSON array) to install as the passage store
        #[arg(short, long)]
        passages: Option<String>,

        /// Override the edge noise threshold
        #[arg(short, long)]
        noise_threshold: Option<u32>,
    },

    /// Answer a question through decomposition and retrieval
    Query {
        /// The question
        question: String,

        /// One external call at a time
        #[arg(short, long)]
        sequential: bool,
    },

    /// Ranked prerequisites of a topic
    Prerequisites {
        /// Topic name
        topic: String,

        /// Hops over prerequisite edges
        #[arg(short, long, default_value = "2")]
        depth: usize,
    },

    /// Show graph statistics
    Stats {
        /// Number of top-ranked nodes
        #[arg(short, long, default_value = "10")]
        top: usize,
    },

    /// Detect topic communities
    Communities {
        /// Number of communities to show
        #[arg(short, long, default_value = "10")]
        top: usize,
    },

    /// Per-source passage breakdown of a topic
    Coverage {
        /// Topic name
        topic: String,
    },

    /// Cross-source summary of a topic
    Synthesize {
        /// Topic name
        topic: String,

        /// Excerpts taken from each source
        #[arg(short, long, default_value = "2")]
        max_per_source: usize,
    },

    /// Sequence significant topics into a curriculum
    Curriculum {
        /// topological, rank, hybrid, coverage, dfs, bfs, community or difficulty
        #[arg(short, long)]
        strategy: Option<String>,

        /// Minimum mention count for a topic to be sequenced
        #[arg(short, long)]
        min_count: Option<u64>,

        /// Run every strategy side by side
        #[arg(short, long)]
        all: bool,
    },

    /// Classify nodes as foundations, hubs and capstones
    Classify {
        /// Length of each top list
        #[arg(short, long)]
        top: Option<usize>,
    },

    /// Trace prerequisites of a concept or question
    Trace {
        /// Concept name or free-text question
        target: String,

        /// Hops walked back from the target
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Learning path to a concept, skipping what is known
    Path {
        /// Concept to learn
        target: String,

        /// Concepts already known (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        known: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let json = cli.json;
    match cli.command {
        Commands::Init { path } => commands::init::run(path),
        Commands::Build {
            records,
            passages,
            noise_threshold,
        } => commands::build::run(records, passages, noise_threshold, json),
        Commands::Query { question, sequential } => {
            commands::query::run(&question, sequential, json)
        }
        Commands::Prerequisites { topic, depth } => {
            commands::prerequisites::run(&topic, depth, json)
        }
        Commands::Stats { top } => commands::stats::run(top, json),
        Commands::Communities { top } => commands::communities::run(top, json),
        Commands::Coverage { topic } => commands::coverage::run(&topic, json),
        Commands::Synthesize {
            topic,
            max_per_source,
        } => commands::coverage::synthesize(&topic, max_per_source, json),
        Commands::Curriculum {
            strategy,
            min_count,
            all,
        } => commands::curriculum::run(strategy.as_deref(), min_count, all, json),
        Commands::Classify { top } => commands::classify::run(top, json),
        Commands::Trace { target, depth } => commands::trace::trace(&target, depth, json),
        Commands::Path { target, known } => commands::trace::path(&target, &known, json),
    }
}
