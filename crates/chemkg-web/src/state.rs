//! Application state for the query service.
//!
//! The graph is immutable after loading, so handlers share it through an
//! `Arc` and run traces on the blocking pool.

use anyhow::{Context, Result};
use chemkg::prelude::*;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// A topic row for `/api/concepts`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptSummary {
    pub id: String,
    pub mention_count: u64,
    pub reverse_rank: f64,
    pub scale: Scale,
    pub sources: usize,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    graph: Arc<KnowledgeGraph>,
    scores: Arc<ScoreTable>,
    tracer: TracerConfig,
}

impl AppState {
    /// Load a persisted graph and compute its scores.
    pub fn load(path: &Path, engine: &CentralityEngine) -> Result<Self> {
        let graph = KnowledgeGraph::load(path)
            .with_context(|| format!("Failed to load graph: {}", path.display()))?;
        Ok(Self::from_graph(graph, engine))
    }

    pub fn from_graph(graph: KnowledgeGraph, engine: &CentralityEngine) -> Self {
        let scores = engine.scores(&graph);
        Self {
            graph: Arc::new(graph),
            scores: Arc::new(scores),
            tracer: TracerConfig::default(),
        }
    }

    pub fn with_tracer(mut self, tracer: TracerConfig) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Trace a concept by name, or the concept a question points at.
    pub async fn trace(&self, query: String) -> chemkg::core::error::Result<Trace> {
        self.blocking(move |tracer, graph| match graph.resolve(&query) {
            Some(node) => tracer.trace(&node.id),
            None => tracer.question_to_trace(&query),
        })
        .await
    }

    pub async fn learning_path(
        &self,
        target: String,
        known: Vec<String>,
    ) -> chemkg::core::error::Result<LearningPath> {
        self.blocking(move |tracer, _| tracer.learning_path(&target, &known))
            .await
    }

    /// Topics with at least `min_count` mentions, most mentioned first.
    pub fn concepts(&self, min_count: u64, limit: usize) -> Vec<ConceptSummary> {
        let mut topics: Vec<&Node> = self
            .graph
            .nodes_of_kind(NodeKind::Topic)
            .filter(|n| n.mention_count >= min_count)
            .collect();
        topics.sort_by(|a, b| b.mention_count.cmp(&a.mention_count).then_with(|| a.id.cmp(&b.id)));
        topics
            .into_iter()
            .take(limit)
            .map(|n| ConceptSummary {
                id: n.id.clone(),
                mention_count: n.mention_count,
                reverse_rank: self.scores.reverse_rank(&n.id),
                scale: n.scale,
                sources: n.source_chunk_ids.len(),
            })
            .collect()
    }

    async fn blocking<T, F>(&self, f: F) -> chemkg::core::error::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&PathTracer<'_>, &KnowledgeGraph) -> chemkg::core::error::Result<T> + Send + 'static,
    {
        let graph = Arc::clone(&self.graph);
        let scores = Arc::clone(&self.scores);
        let config = self.tracer;
        tokio::task::spawn_blocking(move || {
            let tracer = PathTracer::new(&graph, &scores, config);
            f(&tracer, &graph)
        })
        .await
        .map_err(|e| ChemkgError::unavailable("tracer", e.to_string()))?
    }
}
