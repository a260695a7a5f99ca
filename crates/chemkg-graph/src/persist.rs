//! Graph persistence: save/load the JSON graph file.
//!
//! File layout: `{"nodes": [...], "edges": [...], "metadata": {...}}`.
//! `pagerank`, `scores` and `chunk_ids` appear on nodes only after the
//! enhance step. Saves go through a temporary file and a rename so a
//! concurrent reader sees either the old graph or the new one.

use crate::store::{GraphMetadata, KnowledgeGraph};
use chemkg_core::error::{ChemkgError, Result, Violation};
use chemkg_core::types::{Edge, Node, NodeKind, NodeScores, Relation, Scale};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Serializable snapshot of the knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphFile {
    pub nodes: Vec<PersistedNode>,
    pub edges: Vec<PersistedEdge>,
    #[serde(default)]
    pub metadata: GraphMetadata,
}

/// Serializable node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedNode {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub count: u64,
    /// Scale name.
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagerank: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "chunk_ids_from_any"
    )]
    pub chunk_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<NodeScores>,
}

/// Serializable edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedEdge {
    pub source: String,
    pub target: String,
    pub relation: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

fn chunk_ids_from_any<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(raw.map(|values| {
        values
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect()
    }))
}

impl GraphFile {
    /// Snapshot a graph. Chunk ids are written only once the mutual index
    /// has been materialized by the enhance step.
    pub fn from_graph(graph: &KnowledgeGraph) -> Self {
        let (nodes, edges, metadata) = graph.to_parts();
        let with_chunks = metadata.mutual_indexing;
        let nodes = nodes
            .into_iter()
            .map(|n| PersistedNode {
                label: Some(n.id.clone()),
                kind: Some(n.kind.to_string()),
                count: n.mention_count,
                group: Some(n.scale.to_string()),
                pagerank: n.scores.map(|s| s.reverse_rank),
                chunk_ids: with_chunks.then(|| n.source_chunk_ids.iter().cloned().collect()),
                scores: n.scores,
                id: n.id,
            })
            .collect();
        let edges = edges
            .into_iter()
            .map(|e| PersistedEdge {
                relation: e.relation.to_string(),
                source: e.source,
                target: e.target,
                weight: e.weight,
            })
            .collect();
        GraphFile {
            nodes,
            edges,
            metadata,
        }
    }

    /// Convert into a validated graph.
    pub fn into_graph(self) -> Result<KnowledgeGraph> {
        let mut violations = Vec::new();

        let nodes: Vec<Node> = self
            .nodes
            .into_iter()
            .map(|p| {
                let kind = p
                    .kind
                    .as_deref()
                    .and_then(NodeKind::parse)
                    .unwrap_or(NodeKind::Concept);
                let scale = p
                    .group
                    .as_deref()
                    .and_then(Scale::parse)
                    .unwrap_or_else(|| Scale::infer(&p.id));
                let scores = p.scores.or_else(|| {
                    p.pagerank.map(|rank| NodeScores {
                        reverse_rank: rank,
                        ..Default::default()
                    })
                });
                Node {
                    id: p.id.trim().to_string(),
                    kind,
                    mention_count: p.count,
                    source_chunk_ids: p.chunk_ids.unwrap_or_default().into_iter().collect::<BTreeSet<_>>(),
                    scale,
                    scores,
                }
            })
            .collect();

        let mut edges = Vec::with_capacity(self.edges.len());
        for e in self.edges {
            match Relation::parse(&e.relation) {
                Some(relation) => edges.push(Edge::new(e.source, e.target, relation, e.weight)),
                None => violations.push(Violation::UnknownRelation(e.relation)),
            }
        }

        violations.extend(crate::store::validate(&nodes, &edges));
        if !violations.is_empty() {
            return Err(ChemkgError::violations(violations));
        }
        KnowledgeGraph::from_parts(nodes, edges, self.metadata)
    }
}

/// Save a graph as pretty JSON, creating parent directories as needed.
pub fn save_graph(graph: &KnowledgeGraph, path: &Path) -> Result<()> {
    let file = GraphFile::from_graph(graph);
    let json = serde_json::to_string_pretty(&file)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    tracing::info!(path = %path.display(), nodes = graph.node_count(), "graph saved");
    Ok(())
}

/// Load a graph, rebuilding the mutual index from persisted chunk ids.
pub fn load_graph(path: &Path) -> Result<KnowledgeGraph> {
    if !path.exists() {
        return Err(ChemkgError::graph_not_found(path.display().to_string()));
    }
    let json = std::fs::read_to_string(path)
        .map_err(|e| ChemkgError::malformed_graph(path.display().to_string(), e.to_string()))?;
    let file: GraphFile = serde_json::from_str(&json)
        .map_err(|e| ChemkgError::malformed_graph(path.display().to_string(), e.to_string()))?;
    let graph = file.into_graph()?;
    tracing::info!(
        path = %path.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        enhanced = graph.is_enhanced(),
        "graph loaded"
    );
    Ok(graph)
}

impl KnowledgeGraph {
    pub fn load(path: &Path) -> Result<KnowledgeGraph> {
        load_graph(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_graph(self, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chemkg_core::error::GraphError;

    #[test]
    fn missing_file_is_not_found() {
        let err = load_graph(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ChemkgError::Graph(GraphError::NotFound(_))));
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_graph(&path).unwrap_err();
        assert!(matches!(err, ChemkgError::Graph(GraphError::Malformed { .. })));
    }

    #[test]
    fn accepts_legacy_fields() {
        let json = r#"{
            "nodes": [
                {"id": "Crystal Field Theory", "label": "Crystal Field Theory", "type": "topic", "count": 40, "group": "topic", "pagerank": 0.2, "chunk_ids": [17, "c9"]},
                {"id": "Atomic Structure", "type": "prerequisite", "count": 12}
            ],
            "edges": [
                {"source": "Atomic Structure", "target": "Crystal Field Theory", "relation": "prerequisite_for", "weight": 3}
            ],
            "metadata": {"total_chunks": 2, "source": "legacy"}
        }"#;
        let file: GraphFile = serde_json::from_str(json).unwrap();
        let graph = file.into_graph().unwrap();
        let cft = graph.node("Crystal Field Theory").unwrap();
        assert_eq!(cft.scale, Scale::Electronic);
        assert_eq!(cft.scores.map(|s| s.reverse_rank), Some(0.2));
        assert_eq!(graph.mutual_index().nodes_for("17"), vec!["Crystal Field Theory"]);
        assert_eq!(graph.metadata().extra.get("source"), Some(&serde_json::json!("legacy")));
    }

    #[test]
    fn unknown_relation_is_a_violation() {
        let json = r#"{"nodes": [{"id": "A"}, {"id": "B"}],
                       "edges": [{"source": "A", "target": "B", "relation": "related_to"}]}"#;
        let file: GraphFile = serde_json::from_str(json).unwrap();
        let err = file.into_graph().unwrap_err();
        assert!(err.to_string().contains("unknown relation: related_to"));
    }
}
