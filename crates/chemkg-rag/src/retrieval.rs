//! Retrieval boundary: source passages and the collaborator that finds them.
//!
//! [`InMemoryPassageStore`] scores passages by TF-IDF term overlap with the
//! query. It needs no embedding service and is what the CLI uses over the
//! passage file written next to the graph.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// A source passage (textbook chunk).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub chunk_id: String,
    /// Book or document the passage came from.
    #[serde(default = "default_source", alias = "book")]
    pub source: String,
    pub text: String,
}

fn default_source() -> String {
    "unknown".to_string()
}

impl Passage {
    pub fn new(chunk_id: impl Into<String>, source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            source: source.into(),
            text: text.into(),
        }
    }
}

/// A scored search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassageHit {
    pub chunk_id: String,
    pub score: f64,
}

/// Retrieval collaborator errors.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Retriever unavailable: {0}")]
    Unavailable(String),

    #[error("Passage store parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RetrievalResult<T> = Result<T, RetrievalError>;

/// Finds and fetches source passages.
#[async_trait]
pub trait PassageRetriever: Send + Sync {
    fn name(&self) -> &str;

    /// Best `limit` passages for `query`, highest score first.
    async fn search(&self, query: &str, limit: usize) -> RetrievalResult<Vec<PassageHit>>;

    /// Passages for the given ids, in the given order; unknown ids skipped.
    async fn fetch(&self, chunk_ids: &[String]) -> RetrievalResult<Vec<Passage>>;
}

/// Passages held in memory with a TF-IDF term index.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPassageStore {
    passages: BTreeMap<String, Passage>,
    terms: HashMap<String, Vec<String>>,
    doc_freq: HashMap<String, usize>,
}

impl InMemoryPassageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_passages(passages: impl IntoIterator<Item = Passage>) -> Self {
        let mut store = Self::new();
        for p in passages {
            store.insert(p);
        }
        store
    }

    /// Insert or replace a passage.
    pub fn insert(&mut self, passage: Passage) {
        if let Some(old) = self.terms.remove(&passage.chunk_id) {
            for term in old.iter().collect::<HashSet<_>>() {
                if let Some(df) = self.doc_freq.get_mut(term) {
                    *df = df.saturating_sub(1);
                }
            }
        }
        let terms = tokenize(&passage.text);
        for term in terms.iter().collect::<HashSet<_>>() {
            *self.doc_freq.entry(term.clone()).or_insert(0) += 1;
        }
        self.terms.insert(passage.chunk_id.clone(), terms);
        self.passages.insert(passage.chunk_id.clone(), passage);
    }

    pub fn get(&self, chunk_id: &str) -> Option<&Passage> {
        self.passages.get(chunk_id)
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Load a JSON array of passages.
    pub fn load(path: &Path) -> RetrievalResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let passages: Vec<Passage> =
            serde_json::from_str(&text).map_err(|e| RetrievalError::Parse(e.to_string()))?;
        tracing::info!(path = %path.display(), passages = passages.len(), "passage store loaded");
        Ok(Self::from_passages(passages))
    }

    /// Write all passages as a JSON array.
    pub fn save(&self, path: &Path) -> RetrievalResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let all: Vec<&Passage> = self.passages.values().collect();
        let json =
            serde_json::to_string_pretty(&all).map_err(|e| RetrievalError::Parse(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// TF-IDF scores for every passage sharing a term with `query`.
    pub fn score(&self, query: &str) -> Vec<PassageHit> {
        let query_terms = tokenize(query);
        if query_terms.is_empty() {
            return Vec::new();
        }
        let total_docs = self.passages.len().max(1) as f64;

        let mut hits: Vec<PassageHit> = self
            .terms
            .iter()
            .filter_map(|(chunk_id, terms)| {
                let mut score = 0.0;
                for qt in &query_terms {
                    let tf = terms.iter().filter(|t| *t == qt).count() as f64;
                    if tf > 0.0 {
                        let df = self.doc_freq.get(qt).copied().unwrap_or(1).max(1) as f64;
                        score += tf * ((total_docs / df).ln() + 1.0);
                    }
                }
                (score > 0.0).then(|| PassageHit {
                    chunk_id: chunk_id.clone(),
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        hits
    }
}

#[async_trait]
impl PassageRetriever for InMemoryPassageStore {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn search(&self, query: &str, limit: usize) -> RetrievalResult<Vec<PassageHit>> {
        let mut hits = self.score(query);
        hits.truncate(limit);
        Ok(hits)
    }

    async fn fetch(&self, chunk_ids: &[String]) -> RetrievalResult<Vec<Passage>> {
        Ok(chunk_ids
            .iter()
            .filter_map(|id| self.passages.get(id).cloned())
            .collect())
    }
}

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "shall", "can",
    "need", "to", "of", "in", "for", "on", "with", "at", "by", "from", "as", "into", "through",
    "during", "before", "after", "above", "below", "between", "out", "off", "over", "under",
    "again", "further", "then", "once", "and", "but", "or", "if", "while", "what", "which",
    "who", "this", "that", "these", "those", "it", "its", "how", "why",
];

/// Lowercased terms of at least three characters, stopwords removed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 3 && !STOPWORDS.contains(w))
        .map(String::from)
        .collect()
}
