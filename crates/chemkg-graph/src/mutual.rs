//! Mutual index between knowledge nodes and source passages.
//!
//! Both directions are populated through a single `link` call, so a chunk
//! is listed under a node exactly when the node is listed under the chunk.

use chemkg_core::types::Node;
use std::collections::{BTreeMap, BTreeSet};

/// Bidirectional node <-> chunk mapping, built once per graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutualIndex {
    node_to_chunks: BTreeMap<String, BTreeSet<String>>,
    chunk_to_nodes: BTreeMap<String, BTreeSet<String>>,
}

impl MutualIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `source_chunk_ids` of every node.
    pub fn from_nodes<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Self {
        let mut index = Self::new();
        for node in nodes {
            for chunk in &node.source_chunk_ids {
                index.link(&node.id, chunk);
            }
        }
        index
    }

    fn link(&mut self, node: &str, chunk: &str) {
        if node.is_empty() || chunk.is_empty() {
            return;
        }
        self.node_to_chunks
            .entry(node.to_string())
            .or_default()
            .insert(chunk.to_string());
        self.chunk_to_nodes
            .entry(chunk.to_string())
            .or_default()
            .insert(node.to_string());
    }

    /// Source passages a node was extracted from.
    pub fn chunks_for(&self, node: &str) -> Vec<&str> {
        self.node_to_chunks
            .get(node)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Nodes extracted from a source passage.
    pub fn nodes_for(&self, chunk: &str) -> Vec<&str> {
        self.chunk_to_nodes
            .get(chunk)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, node: &str, chunk: &str) -> bool {
        self.node_to_chunks
            .get(node)
            .is_some_and(|set| set.contains(chunk))
    }

    /// Number of nodes with at least one chunk.
    pub fn indexed_nodes(&self) -> usize {
        self.node_to_chunks.len()
    }

    /// Number of chunks with at least one node.
    pub fn indexed_chunks(&self) -> usize {
        self.chunk_to_nodes.len()
    }

    pub fn mean_chunks_per_node(&self) -> f64 {
        if self.node_to_chunks.is_empty() {
            return 0.0;
        }
        let total: usize = self.node_to_chunks.values().map(BTreeSet::len).sum();
        total as f64 / self.node_to_chunks.len() as f64
    }

    pub fn max_chunks_per_node(&self) -> usize {
        self.node_to_chunks
            .values()
            .map(BTreeSet::len)
            .max()
            .unwrap_or(0)
    }

    /// Check that every forward entry has its reverse and vice versa.
    pub fn is_symmetric(&self) -> bool {
        let forward_ok = self.node_to_chunks.iter().all(|(node, chunks)| {
            chunks.iter().all(|c| {
                self.chunk_to_nodes
                    .get(c)
                    .is_some_and(|nodes| nodes.contains(node))
            })
        });
        let reverse_ok = self.chunk_to_nodes.iter().all(|(chunk, nodes)| {
            nodes.iter().all(|n| {
                self.node_to_chunks
                    .get(n)
                    .is_some_and(|chunks| chunks.contains(chunk))
            })
        });
        forward_ok && reverse_ok
    }

    /// Iterate `(node, chunks)` pairs in node order.
    pub fn iter_nodes(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.node_to_chunks.iter().map(|(n, c)| (n.as_str(), c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chemkg_core::types::NodeKind;

    #[test]
    fn index_is_symmetric() {
        let mut a = Node::new("A", NodeKind::Topic);
        a.source_chunk_ids.extend(["c1".to_string(), "c2".to_string()]);
        let mut b = Node::new("B", NodeKind::Concept);
        b.source_chunk_ids.insert("c2".to_string());
        let index = MutualIndex::from_nodes([&a, &b]);

        assert!(index.is_symmetric());
        assert_eq!(index.chunks_for("A"), vec!["c1", "c2"]);
        assert_eq!(index.nodes_for("c2"), vec!["A", "B"]);
        assert_eq!(index.indexed_chunks(), 2);
        assert_eq!(index.max_chunks_per_node(), 2);
        assert!((index.mean_chunks_per_node() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn unknown_lookups_are_empty() {
        let index = MutualIndex::new();
        assert!(index.chunks_for("nope").is_empty());
        assert!(index.nodes_for("c9").is_empty());
        assert!(!index.contains("nope", "c9"));
    }
}
