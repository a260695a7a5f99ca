//! Community detection via label propagation.
//!
//! Runs over the "enables" subgraph, treating edges as undirected with
//! weights summed across both directions. Nodes are visited in id order
//! and ties are broken deterministically, so the same graph always yields
//! the same partition.

use crate::store::KnowledgeGraph;
use chemkg_core::types::{Node, NodeKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label propagation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Node kinds that take part.
    #[serde(default = "default_kinds")]
    pub kinds: Vec<NodeKind>,
    /// Communities smaller than this are discarded.
    #[serde(default = "default_min_size")]
    pub min_size: usize,
}

fn default_max_iterations() -> usize {
    10
}

fn default_kinds() -> Vec<NodeKind> {
    vec![NodeKind::Topic]
}

fn default_min_size() -> usize {
    2
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            kinds: default_kinds(),
            min_size: default_min_size(),
        }
    }
}

/// A detected community in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Community {
    pub id: usize,
    /// Id of the most-mentioned member.
    pub name: String,
    /// Sorted by id.
    pub members: Vec<String>,
    pub size: usize,
    pub total_mentions: u64,
}

/// Result of community detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunityResult {
    /// Sorted by size, then total mentions, then name.
    pub communities: Vec<Community>,
    /// Node id → community id, for members of kept communities.
    pub assignments: BTreeMap<String, usize>,
    pub total_nodes: usize,
    pub num_communities: usize,
    pub iterations: usize,
    pub converged: bool,
}

impl CommunityResult {
    pub fn community_of(&self, id: &str) -> Option<&Community> {
        let idx = *self.assignments.get(id)?;
        self.communities.iter().find(|c| c.id == idx)
    }
}

/// Detect communities among nodes of the configured kinds.
pub fn detect_communities(graph: &KnowledgeGraph, config: &CommunityConfig) -> CommunityResult {
    detect_where(graph, config, |node| config.kinds.contains(&node.kind))
}

/// Detect communities among nodes accepted by `keep` (kinds are not consulted).
pub fn detect_where<F>(graph: &KnowledgeGraph, config: &CommunityConfig, keep: F) -> CommunityResult
where
    F: Fn(&Node) -> bool,
{
    let adj = graph.enabling_adjacency_where(keep);
    let n = adj.len();

    // Undirected neighbor weights.
    let neighbors: Vec<Vec<(usize, f64)>> = (0..n)
        .map(|i| {
            let mut merged: BTreeMap<usize, f64> = BTreeMap::new();
            for &(j, w) in adj.successors[i].iter().chain(&adj.predecessors[i]) {
                *merged.entry(j).or_insert(0.0) += w;
            }
            merged.into_iter().collect()
        })
        .collect();

    let mut labels: Vec<usize> = (0..n).collect();
    let mut iterations = 0;
    let mut converged = n == 0;

    for _ in 0..config.max_iterations {
        if n == 0 {
            break;
        }
        iterations += 1;
        let mut changed = false;

        for i in 0..n {
            if neighbors[i].is_empty() {
                continue;
            }
            let mut votes: BTreeMap<usize, f64> = BTreeMap::new();
            for &(j, w) in &neighbors[i] {
                *votes.entry(labels[j]).or_insert(0.0) += w;
            }
            let best = votes.values().copied().fold(f64::MIN, f64::max);
            let current = labels[i];
            if votes.get(&current).is_some_and(|w| *w >= best) {
                continue;
            }
            // BTreeMap iterates in label order: first maximum is the lowest label.
            if let Some((&label, _)) = votes.iter().find(|(_, w)| **w >= best) {
                labels[i] = label;
                changed = true;
            }
        }

        if !changed {
            converged = true;
            break;
        }
    }
    tracing::debug!(nodes = n, iterations, converged, "label propagation finished");

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, label) in labels.iter().enumerate() {
        groups.entry(*label).or_default().push(i);
    }

    let mut communities: Vec<Community> = groups
        .into_values()
        .filter(|members| members.len() >= config.min_size.max(1))
        .map(|members| {
            let nodes: Vec<&Node> = members
                .iter()
                .filter_map(|&i| graph.node(adj.ids[i]))
                .collect();
            let name = nodes
                .iter()
                .max_by(|a, b| {
                    a.mention_count
                        .cmp(&b.mention_count)
                        .then_with(|| b.id.cmp(&a.id))
                })
                .map(|n| n.id.clone())
                .unwrap_or_default();
            Community {
                id: 0,
                name,
                size: nodes.len(),
                total_mentions: nodes.iter().map(|n| n.mention_count).sum(),
                members: nodes.iter().map(|n| n.id.clone()).collect(),
            }
        })
        .collect();

    communities.sort_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then_with(|| b.total_mentions.cmp(&a.total_mentions))
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut assignments = BTreeMap::new();
    for (idx, community) in communities.iter_mut().enumerate() {
        community.id = idx;
        for member in &community.members {
            assignments.insert(member.clone(), idx);
        }
    }

    CommunityResult {
        num_communities: communities.len(),
        total_nodes: n,
        communities,
        assignments,
        iterations,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::GraphMetadata;
    use chemkg_core::types::{Edge, Relation};

    fn topics(ids: &[(&str, u64)], edges: &[(&str, &str)]) -> KnowledgeGraph {
        let nodes = ids
            .iter()
            .map(|(id, m)| Node::new(*id, NodeKind::Topic).with_mentions(*m))
            .collect();
        let edges = edges
            .iter()
            .map(|(s, t)| Edge::new(*s, *t, Relation::PrerequisiteFor, 1))
            .collect();
        KnowledgeGraph::from_parts(nodes, edges, GraphMetadata::default()).unwrap()
    }

    fn weighted(ids: &[&str], edges: &[(&str, &str, u32)]) -> KnowledgeGraph {
        let nodes = ids.iter().map(|id| Node::new(*id, NodeKind::Topic)).collect();
        let edges = edges
            .iter()
            .map(|(s, t, w)| Edge::new(*s, *t, Relation::PrerequisiteFor, *w))
            .collect();
        KnowledgeGraph::from_parts(nodes, edges, GraphMetadata::default()).unwrap()
    }

    #[test]
    fn tied_node_keeps_its_current_label() {
        // C adopts D's label before D is visited; D then sees its own label
        // tied with B's lower one and must keep it.
        let g = weighted(&["A", "B", "C", "D"], &[("A", "B", 2), ("B", "D", 1), ("C", "D", 1)]);
        let result = detect_communities(&g, &CommunityConfig::default());
        assert!(result.converged);
        assert_eq!(result.num_communities, 2);
        assert_eq!(result.assignments["A"], result.assignments["B"]);
        assert_eq!(result.assignments["C"], result.assignments["D"]);
        assert_ne!(result.assignments["A"], result.assignments["D"]);
    }

    #[test]
    fn tie_between_other_labels_takes_the_lowest() {
        // E is bridged equally to {A, B} and {C, D}; the pair labelled from
        // the lower id wins.
        let g = weighted(
            &["A", "B", "C", "D", "E"],
            &[("A", "B", 5), ("C", "D", 5), ("B", "E", 1), ("D", "E", 1)],
        );
        let result = detect_communities(&g, &CommunityConfig::default());
        assert!(result.converged);
        assert_eq!(result.num_communities, 2);
        assert_eq!(result.assignments["E"], result.assignments["A"]);
        assert_eq!(result.assignments["E"], result.assignments["B"]);
        assert_ne!(result.assignments["E"], result.assignments["C"]);
        assert_eq!(result.community_of("E").map(|c| c.size), Some(3));
    }

    #[test]
    fn star_collapses_to_one_community() {
        let g = topics(
            &[("Hub", 30), ("A", 1), ("B", 2), ("C", 3)],
            &[("Hub", "A"), ("Hub", "B"), ("Hub", "C")],
        );
        let result = detect_communities(&g, &CommunityConfig::default());
        assert_eq!(result.num_communities, 1);
        let c = &result.communities[0];
        assert_eq!(c.name, "Hub");
        assert_eq!(c.size, 4);
        assert_eq!(c.total_mentions, 36);
        assert_eq!(result.community_of("B").map(|c| c.id), Some(0));
    }

    #[test]
    fn singletons_are_discarded() {
        let g = topics(&[("A", 1), ("B", 1), ("Lonely", 9)], &[("A", "B")]);
        let result = detect_communities(&g, &CommunityConfig::default());
        assert_eq!(result.num_communities, 1);
        assert!(!result.assignments.contains_key("Lonely"));
        assert_eq!(result.total_nodes, 3);
    }

    #[test]
    fn only_configured_kinds_take_part() {
        let nodes = vec![
            Node::new("T", NodeKind::Topic),
            Node::new("P", NodeKind::Prerequisite),
        ];
        let edges = vec![Edge::new("P", "T", Relation::PrerequisiteFor, 3)];
        let g = KnowledgeGraph::from_parts(nodes, edges, GraphMetadata::default()).unwrap();
        let result = detect_communities(&g, &CommunityConfig::default());
        assert_eq!(result.total_nodes, 1);
        assert_eq!(result.num_communities, 0);
    }

    #[test]
    fn deterministic_across_runs() {
        let g = topics(
            &[("A", 1), ("B", 1), ("C", 1), ("D", 1)],
            &[("A", "B"), ("B", "C"), ("C", "D"), ("D", "A")],
        );
        let first = detect_communities(&g, &CommunityConfig::default());
        let second = detect_communities(&g, &CommunityConfig::default());
        assert_eq!(first, second);
    }
}
