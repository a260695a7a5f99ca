//! CLI command implementations.

pub mod build;
pub mod classify;
pub mod communities;
pub mod coverage;
pub mod curriculum;
pub mod init;
pub mod prerequisites;
pub mod query;
pub mod stats;
pub mod trace;

use anyhow::{bail, Result};
use chemkg::prelude::*;
use colored::Colorize;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

use crate::config::Config;

/// Loaded config, graph and freshly computed scores.
pub struct Workspace {
    pub config: Config,
    pub graph: KnowledgeGraph,
    pub scores: ScoreTable,
}

impl Workspace {
    /// Load the persisted graph. Scores are recomputed, never read back.
    pub fn open() -> Result<Self> {
        let config = Config::load()?;
        let path = config.graph_path();
        if !path.exists() {
            bail!(
                "No graph found at {}. Run {} first.",
                path.display(),
                "chemkg build".cyan()
            );
        }
        let graph = KnowledgeGraph::load(&path)?;
        let scores = config.engine().scores(&graph);
        Ok(Self {
            config,
            graph,
            scores,
        })
    }

    pub fn tracer(&self) -> PathTracer<'_> {
        PathTracer::new(&self.graph, &self.scores, self.config.tracer)
    }

    /// Question pipeline over the passage store and the configured model.
    pub fn pipeline(&self, config: PipelineConfig) -> Result<QuestionPipeline<'_>> {
        let path = self.config.passages_path();
        let store = if path.exists() {
            InMemoryPassageStore::load(&path)?
        } else {
            tracing::warn!(path = %path.display(), "no passage store; retrieval will find nothing");
            InMemoryPassageStore::new()
        };
        let llm: Arc<dyn LlmBackend> = Arc::new(OllamaBackend::new(self.config.llm.llm_config())?);
        Ok(QuestionPipeline::new(
            &self.graph,
            &self.scores,
            Arc::new(store),
            llm,
            config,
        ))
    }
}

/// Run a future to completion on a fresh runtime.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Dimmed `(0.0123)` score suffix.
pub fn score(value: f64) -> String {
    format!("({:.4})", value).dimmed().to_string()
}
