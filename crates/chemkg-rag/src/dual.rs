//! Dual-level retrieval: passage hits lifted to topics, then to the
//! concepts those topics contain.

use crate::retrieval::PassageHit;
use chemkg_core::types::{NodeKind, Relation};
use chemkg_graph::store::KnowledgeGraph;
use serde::Serialize;
use std::collections::HashMap;

/// A topic reached through one or more passage hits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicHit {
    pub topic: String,
    /// Best score among contributing passages.
    pub score: f64,
    /// Contributing chunk ids, in hit order.
    pub chunk_ids: Vec<String>,
}

/// A concept contained in one of the top topics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptHit {
    pub concept: String,
    pub topic: String,
    pub weight: u32,
}

/// Both retrieval levels for one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DualRetrieval {
    pub query: String,
    pub topics: Vec<TopicHit>,
    pub concepts: Vec<ConceptHit>,
}

impl DualRetrieval {
    pub fn empty(query: &str) -> Self {
        Self {
            query: query.to_string(),
            ..Default::default()
        }
    }

    pub fn top_topic(&self) -> Option<&str> {
        self.topics.first().map(|t| t.topic.as_str())
    }

    /// Unique chunk ids of the first `topics` topics, first seen first.
    pub fn chunk_ids(&self, topics: usize, limit: usize) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for hit in self.topics.iter().take(topics) {
            for id in &hit.chunk_ids {
                if out.len() == limit {
                    return out;
                }
                if !out.contains(id) {
                    out.push(id.clone());
                }
            }
        }
        out
    }
}

/// Lift `hits` through the mutual index. Keeps `top_k` topics and at most
/// `3 * top_k` concepts.
pub fn dual_level(graph: &KnowledgeGraph, query: &str, hits: &[PassageHit], top_k: usize) -> DualRetrieval {
    let index = graph.mutual_index();
    let mut by_topic: HashMap<&str, TopicHit> = HashMap::new();

    for hit in hits {
        for node in index.nodes_for(&hit.chunk_id) {
            let is_topic = graph.node(node).map(|n| n.kind == NodeKind::Topic).unwrap_or(false);
            if !is_topic {
                continue;
            }
            let entry = by_topic.entry(node).or_insert_with(|| TopicHit {
                topic: node.to_string(),
                score: 0.0,
                chunk_ids: Vec::new(),
            });
            entry.score = entry.score.max(hit.score);
            if !entry.chunk_ids.contains(&hit.chunk_id) {
                entry.chunk_ids.push(hit.chunk_id.clone());
            }
        }
    }

    let mut topics: Vec<TopicHit> = by_topic.into_values().collect();
    topics.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.topic.cmp(&b.topic)));
    topics.truncate(top_k);

    let mut concepts = Vec::new();
    for t in &topics {
        for concept in graph.successors(&t.topic, Relation::Contains) {
            let weight = graph
                .edge(&t.topic, concept, Relation::Contains)
                .map(|e| e.weight)
                .unwrap_or(1);
            concepts.push(ConceptHit {
                concept: concept.to_string(),
                topic: t.topic.clone(),
                weight,
            });
        }
    }
    concepts.truncate(top_k * 3);

    DualRetrieval {
        query: query.to_string(),
        topics,
        concepts,
    }
}
