//! ChemKG Query Service - prerequisite traces over HTTP.

use anyhow::Result;
use chemkg::prelude::*;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

use chemkg_web::{create_router, AppState};

#[derive(Parser, Debug)]
#[command(name = "chemkg-web")]
#[command(about = "ChemKG Query Service - prerequisite traces and concepts over HTTP")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Persisted graph file
    #[arg(short, long, default_value = ".chemkg/graph.json")]
    graph: PathBuf,

    /// Per-request timeout in seconds
    #[arg(short, long, default_value = "10")]
    timeout: u64,

    /// Hops walked back from a traced concept
    #[arg(long, default_value = "5")]
    max_depth: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let cli = Cli::parse();
    let addr = format!("{}:{}", cli.host, cli.port);

    let tracer = TracerConfig {
        max_depth: cli.max_depth,
        ..TracerConfig::default()
    };
    let state = AppState::load(&cli.graph, &CentralityEngine::default())?.with_tracer(tracer);
    tracing::info!(graph = %cli.graph.display(), nodes = state.node_count(), "graph ready");

    let app = create_router(state, Duration::from_secs(cli.timeout));

    println!("ChemKG query service listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
