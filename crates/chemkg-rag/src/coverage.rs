//! Cross-source coverage of a topic and multi-textbook synthesis.

use crate::diagnostics::{Degradation, Stage};
use crate::pipeline::QuestionPipeline;
use chemkg_core::error::Result;
use chemkg_llm::prompt::truncate_chars;
use chemkg_llm::PerspectivesPrompt;
use serde::Serialize;
use std::collections::BTreeMap;

/// Most passages fetched for one coverage report.
const COVERAGE_FETCH_LIMIT: usize = 100;
const EXCERPT_CHARS: usize = 800;

/// Passages one source contributes to a topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceCoverage {
    pub count: usize,
    pub chunk_ids: Vec<String>,
}

/// Per-source breakdown of a topic's passages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coverage {
    pub topic: String,
    pub sources: BTreeMap<String, SourceCoverage>,
    pub total_chunks: usize,
    pub num_sources: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<Degradation>,
}

impl Coverage {
    fn empty(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            sources: BTreeMap::new(),
            total_chunks: 0,
            num_sources: 0,
            degraded: None,
        }
    }
}

impl<'g> QuestionPipeline<'g> {
    /// Group the topic's indexed passages by source.
    ///
    /// Unknown topics are an error; a failed fetch yields an empty report
    /// carrying the degradation.
    pub async fn coverage(&self, topic: &str) -> Result<Coverage> {
        let id = self.tracer().resolve(topic)?;
        let chunk_ids: Vec<String> = self
            .graph()
            .mutual_index()
            .chunks_for(id)
            .into_iter()
            .take(COVERAGE_FETCH_LIMIT)
            .map(String::from)
            .collect();

        let mut coverage = Coverage::empty(id);
        if chunk_ids.is_empty() {
            return Ok(coverage);
        }

        let passages = match self.fetch(&chunk_ids).await {
            Ok(p) => p,
            Err(e) => {
                coverage.degraded = Some(Degradation::new(Stage::Fetch, None, e));
                return Ok(coverage);
            }
        };

        for p in &passages {
            let entry = coverage.sources.entry(p.source.clone()).or_default();
            entry.count += 1;
            entry.chunk_ids.push(p.chunk_id.clone());
        }
        coverage.total_chunks = passages.len();
        coverage.num_sources = coverage.sources.len();
        Ok(coverage)
    }

    /// Summarise a topic across textbooks from up to `max_per_source`
    /// excerpts each. Always returns text.
    pub async fn synthesize(&self, topic: &str, max_per_source: usize) -> String {
        let coverage = match self.coverage(topic).await {
            Ok(c) if c.total_chunks > 0 => c,
            _ => return format!("No content found for topic: {}", topic),
        };

        let wanted: Vec<String> = coverage
            .sources
            .values()
            .flat_map(|s| s.chunk_ids.iter().take(max_per_source).cloned())
            .collect();
        let passages = match self.fetch(&wanted).await {
            Ok(p) => p,
            Err(e) => return format!("Error: {}", e),
        };

        let mut excerpts: Vec<(String, String)> = Vec::new();
        for source in coverage.sources.keys() {
            for p in passages.iter().filter(|p| &p.source == source) {
                excerpts.push((source.clone(), truncate_chars(&p.text, EXCERPT_CHARS).to_string()));
            }
        }

        let prompt = PerspectivesPrompt::new(coverage.topic.as_str(), excerpts);
        match self.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(topic = %coverage.topic, error = %e, "cross-source synthesis failed");
                format!("Error: {}", e)
            }
        }
    }
}
