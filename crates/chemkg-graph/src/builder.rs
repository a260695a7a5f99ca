//! Graph construction from extraction records.
//!
//! A rebuild is all-or-nothing: records are normalized, observations are
//! counted, weak edges are filtered, and the result is validated before a
//! new [`KnowledgeGraph`] is handed back.

use crate::store::{GraphMetadata, KnowledgeGraph};
use chemkg_core::error::Result;
use chemkg_core::normalize::{NormalizedRecord, Normalizer, NormalizerConfig};
use chemkg_core::record::ExtractionRecord;
use chemkg_core::types::{Edge, Node, NodeKind, Relation};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Construction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Edges observed fewer times than this are not materialized.
    #[serde(default = "default_noise_threshold")]
    pub noise_threshold: u32,
    /// Keep only the most-mentioned concept nodes.
    #[serde(default = "default_max_concepts")]
    pub max_concepts: Option<usize>,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
}

fn default_noise_threshold() -> u32 {
    2
}

fn default_max_concepts() -> Option<usize> {
    Some(200)
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            noise_threshold: default_noise_threshold(),
            max_concepts: default_max_concepts(),
            normalizer: NormalizerConfig::default(),
        }
    }
}

impl BuildConfig {
    pub fn with_noise_threshold(mut self, threshold: u32) -> Self {
        self.noise_threshold = threshold.max(1);
        self
    }

    pub fn with_max_concepts(mut self, max: Option<usize>) -> Self {
        self.max_concepts = max;
        self
    }
}

/// What a rebuild kept and dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub records: usize,
    pub records_without_chunk: usize,
    /// Names removed as empty or garbage by the normalizer.
    pub dropped_names: usize,
    /// Concept nodes removed by the `max_concepts` cap.
    pub capped_concepts: usize,
    pub self_loops: usize,
    pub edges_below_threshold: usize,
    /// Edges whose endpoint never became a node.
    pub dangling_edges: usize,
    pub nodes: usize,
    pub edges: usize,
}

#[derive(Default)]
struct NodeTally {
    kind: Option<NodeKind>,
    mentions: u64,
    chunks: BTreeSet<String>,
}

impl NodeTally {
    fn observe(&mut self, kind: NodeKind, chunk: &str) {
        self.kind = Some(match self.kind {
            Some(k) if k.precedence() <= kind.precedence() => k,
            _ => kind,
        });
        if !chunk.is_empty() {
            self.chunks.insert(chunk.to_string());
        }
    }
}

/// Builds knowledge graphs from extraction records.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    config: BuildConfig,
    normalizer: Normalizer,
}

impl GraphBuilder {
    pub fn new(config: BuildConfig) -> Self {
        let normalizer = Normalizer::with_config(&config.normalizer);
        Self { config, normalizer }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build a graph; identical input always yields identical nodes and edges.
    pub fn build(&self, records: &[ExtractionRecord]) -> Result<(KnowledgeGraph, BuildReport)> {
        let mut report = BuildReport {
            records: records.len(),
            ..Default::default()
        };

        let normalized: Vec<NormalizedRecord> =
            records.iter().map(|r| self.normalizer.record(r)).collect();

        let mut tallies: BTreeMap<String, NodeTally> = BTreeMap::new();
        let mut observations: BTreeMap<(String, String, Relation), u32> = BTreeMap::new();
        let mut chunks: HashSet<&str> = HashSet::new();

        for rec in &normalized {
            report.dropped_names += rec.dropped;
            if rec.chunk_id.is_empty() {
                report.records_without_chunk += 1;
            } else {
                chunks.insert(rec.chunk_id.as_str());
            }

            // One mention per record per name, whatever the role.
            let mut mentioned: HashSet<&str> = HashSet::new();
            let roles = rec
                .topic
                .iter()
                .map(|t| (t, NodeKind::Topic))
                .chain(rec.concepts.iter().map(|c| (c, NodeKind::Concept)))
                .chain(rec.prerequisites.iter().map(|p| (p, NodeKind::Prerequisite)));
            for (name, kind) in roles {
                let tally = tallies.entry(name.clone()).or_default();
                tally.observe(kind, &rec.chunk_id);
                if mentioned.insert(name.as_str()) {
                    tally.mentions += 1;
                }
            }

            let Some(topic) = rec.topic.as_ref() else {
                continue;
            };
            let mut observe = |source: &str, target: &str, relation: Relation| {
                if source == target {
                    report.self_loops += 1;
                    return;
                }
                *observations
                    .entry((source.to_string(), target.to_string(), relation))
                    .or_insert(0) += 1;
            };
            for concept in &rec.concepts {
                observe(topic, concept, Relation::Contains);
            }
            for prereq in &rec.prerequisites {
                observe(prereq, topic, Relation::PrerequisiteFor);
            }
            for next in &rec.leads_to {
                observe(topic, next, Relation::LeadsTo);
            }
        }

        if let Some(max) = self.config.max_concepts {
            let mut concepts: Vec<(&String, u64)> = tallies
                .iter()
                .filter(|(_, t)| t.kind == Some(NodeKind::Concept))
                .map(|(id, t)| (id, t.mentions))
                .collect();
            if concepts.len() > max {
                concepts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
                let dropped: Vec<String> = concepts[max..].iter().map(|(id, _)| (*id).clone()).collect();
                report.capped_concepts = dropped.len();
                for id in dropped {
                    tallies.remove(&id);
                }
            }
        }

        let nodes: Vec<Node> = tallies
            .into_iter()
            .filter_map(|(id, tally)| {
                let kind = tally.kind?;
                let mut node = Node::new(id, kind).with_mentions(tally.mentions);
                node.source_chunk_ids = tally.chunks;
                Some(node)
            })
            .collect();
        let node_ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();

        let mut edges = Vec::new();
        for ((source, target, relation), weight) in observations {
            if weight < self.config.noise_threshold {
                report.edges_below_threshold += 1;
            } else if !node_ids.contains(source.as_str()) || !node_ids.contains(target.as_str()) {
                report.dangling_edges += 1;
            } else {
                edges.push(Edge::new(source, target, relation, weight));
            }
        }

        report.nodes = nodes.len();
        report.edges = edges.len();
        let metadata = GraphMetadata {
            total_chunks: chunks.len(),
            unique_topics: nodes.iter().filter(|n| n.kind == NodeKind::Topic).count(),
            total_nodes: nodes.len(),
            total_edges: edges.len(),
            noise_threshold: Some(self.config.noise_threshold),
            generated: Some(chrono::Utc::now().to_rfc3339()),
            build_id: Some(uuid::Uuid::new_v4().to_string()),
            ..Default::default()
        };

        let graph = KnowledgeGraph::from_parts(nodes, edges, metadata)?;
        tracing::info!(
            records = report.records,
            nodes = report.nodes,
            edges = report.edges,
            below_threshold = report.edges_below_threshold,
            dangling = report.dangling_edges,
            "graph rebuilt"
        );
        if report.dropped_names > 0 {
            tracing::debug!(dropped = report.dropped_names, "normalizer dropped names");
        }
        Ok((graph, report))
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(BuildConfig::default())
    }
}

impl KnowledgeGraph {
    /// Build with default configuration.
    pub fn build(records: &[ExtractionRecord]) -> Result<KnowledgeGraph> {
        GraphBuilder::default().build(records).map(|(graph, _)| graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(chunk: &str, topic: &str) -> ExtractionRecord {
        ExtractionRecord::new(chunk).with_topic(topic)
    }

    #[test]
    fn repeated_observations_raise_weight() {
        let records = vec![
            rec("c1", "Kinetics").with_prerequisites(["Thermodynamics"]),
            rec("c2", "Kinetics").with_prerequisites(["Thermodynamics"]),
            rec("c3", "Kinetics").with_prerequisites(["Algebra"]),
        ];
        let (g, report) = GraphBuilder::default().build(&records).unwrap();
        let edge = g.edge("Thermodynamics", "Kinetics", Relation::PrerequisiteFor).unwrap();
        assert_eq!(edge.weight, 2);
        assert!(g.edge("Algebra", "Kinetics", Relation::PrerequisiteFor).is_none());
        assert_eq!(report.edges_below_threshold, 1);
        assert_eq!(g.node("Kinetics").unwrap().mention_count, 3);
    }

    #[test]
    fn topic_kind_wins_over_prerequisite() {
        let records = vec![
            rec("c1", "Atomic Structure"),
            rec("c2", "Periodic Trends").with_prerequisites(["Atomic Structure"]),
        ];
        let (g, _) = GraphBuilder::default().build(&records).unwrap();
        let node = g.node("Atomic Structure").unwrap();
        assert_eq!(node.kind, NodeKind::Topic);
        assert_eq!(node.mention_count, 2);
        assert_eq!(node.source_chunk_ids.len(), 2);
    }

    #[test]
    fn leads_to_unknown_target_is_dangling() {
        let records = vec![
            rec("c1", "Kinetics").with_leads_to(["Catalysis"]),
            rec("c2", "Kinetics").with_leads_to(["Catalysis"]),
        ];
        let (g, report) = GraphBuilder::default().build(&records).unwrap();
        assert!(!g.contains("Catalysis"));
        assert_eq!(report.dangling_edges, 1);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn concept_cap_keeps_most_mentioned() {
        let records = vec![
            rec("c1", "T").with_concepts(["alpha", "beta"]),
            rec("c2", "T").with_concepts(["alpha"]),
        ];
        let config = BuildConfig::default().with_max_concepts(Some(1));
        let (g, report) = GraphBuilder::new(config).build(&records).unwrap();
        assert!(g.contains("alpha"));
        assert!(!g.contains("beta"));
        assert_eq!(report.capped_concepts, 1);
    }

    #[test]
    fn self_loops_are_skipped() {
        let records = vec![
            rec("c1", "Kinetics").with_prerequisites(["Kinetics"]),
            rec("c2", "Kinetics").with_prerequisites(["Kinetics"]),
        ];
        let (g, report) = GraphBuilder::default().build(&records).unwrap();
        assert_eq!(report.self_loops, 2);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn metadata_counts() {
        let records = vec![
            rec("c1", "A").with_concepts(["alpha"]),
            rec("c2", "B"),
            ExtractionRecord::default(),
        ];
        let (g, report) = GraphBuilder::default().build(&records).unwrap();
        let meta = g.metadata();
        assert_eq!(meta.total_chunks, 2);
        assert_eq!(meta.unique_topics, 2);
        assert_eq!(meta.total_nodes, 3);
        assert!(meta.build_id.is_some());
        assert_eq!(report.records_without_chunk, 1);
    }
}
