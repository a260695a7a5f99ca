//! Petgraph-backed knowledge graph store.
//!
//! The graph is assembled once from validated parts and is read-only
//! afterwards. `enhance` returns a new graph rather than mutating in place,
//! so readers holding an `Arc<KnowledgeGraph>` never observe a partial update.

use crate::centrality::ScoreTable;
use crate::mutual::MutualIndex;
use chemkg_core::error::{ChemkgError, Result, Violation};
use chemkg_core::types::{Edge, Node, NodeKind, Relation};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Edge payload stored in petgraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeData {
    pub relation: Relation,
    pub weight: u32,
}

/// Graph-level metadata persisted alongside nodes and edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    #[serde(default)]
    pub total_chunks: usize,
    #[serde(default)]
    pub unique_topics: usize,
    #[serde(default)]
    pub total_nodes: usize,
    #[serde(default)]
    pub total_edges: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_threshold: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,
    #[serde(default)]
    pub mutual_indexing: bool,
    #[serde(default)]
    pub pagerank_computed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced_at: Option<String>,
    /// Keys written by other tools, preserved on round trip.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Immutable knowledge graph with a mutual node <-> chunk index.
#[derive(Debug, Clone)]
pub struct KnowledgeGraph {
    graph: DiGraph<Node, EdgeData>,
    /// Map from node id to petgraph's internal index.
    node_index: HashMap<String, NodeIndex>,
    /// One edge per (source, target, relation).
    edge_index: HashMap<(NodeIndex, NodeIndex, Relation), EdgeIndex>,
    mutual: MutualIndex,
    metadata: GraphMetadata,
}

/// Dense adjacency over the "enables" subgraph.
///
/// `prerequisite_for` and `leads_to` edges between the same pair are merged
/// into one neighbor entry whose weight is their sum. Self-loops are skipped.
/// Ids are sorted, so index order is deterministic.
#[derive(Debug, Clone)]
pub struct EnablingAdjacency<'g> {
    pub ids: Vec<&'g str>,
    pub index: HashMap<&'g str, usize>,
    pub successors: Vec<Vec<(usize, f64)>>,
    pub predecessors: Vec<Vec<(usize, f64)>>,
}

impl<'g> EnablingAdjacency<'g> {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Distinct enabling edges (pairs) in the view.
    pub fn edge_count(&self) -> usize {
        self.successors.iter().map(Vec::len).sum()
    }

    pub fn in_degree(&self, i: usize) -> usize {
        self.predecessors[i].len()
    }

    pub fn out_degree(&self, i: usize) -> usize {
        self.successors[i].len()
    }
}

/// Check graph-structural invariants, collecting every violation.
pub fn validate(nodes: &[Node], edges: &[Edge]) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for node in nodes {
        if node.id.trim().is_empty() {
            violations.push(Violation::EmptyNodeId);
        } else if !seen.insert(node.id.as_str()) {
            violations.push(Violation::DuplicateNode(node.id.clone()));
        }
    }

    let mut triples: HashSet<(&str, &str, Relation)> = HashSet::new();
    for edge in edges {
        for endpoint in [&edge.source, &edge.target] {
            if !seen.contains(endpoint.as_str()) {
                violations.push(Violation::DanglingEdge {
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                    missing: endpoint.clone(),
                });
            }
        }
        if edge.weight == 0 {
            violations.push(Violation::ZeroWeight {
                source: edge.source.clone(),
                target: edge.target.clone(),
            });
        }
        if !triples.insert(edge.key()) {
            violations.push(Violation::DuplicateEdge {
                source: edge.source.clone(),
                target: edge.target.clone(),
                relation: edge.relation.to_string(),
            });
        }
    }
    violations
}

impl KnowledgeGraph {
    /// Assemble a graph from parts, rejecting any structural violation.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>, metadata: GraphMetadata) -> Result<Self> {
        let violations = validate(&nodes, &edges);
        if !violations.is_empty() {
            return Err(ChemkgError::violations(violations));
        }

        let mut graph = DiGraph::with_capacity(nodes.len(), edges.len());
        let mut node_index = HashMap::with_capacity(nodes.len());
        for node in nodes {
            let id = node.id.clone();
            let idx = graph.add_node(node);
            node_index.insert(id, idx);
        }

        let mut edge_index = HashMap::with_capacity(edges.len());
        for edge in edges {
            // Endpoints were checked by validate.
            let (Some(&s), Some(&t)) = (node_index.get(&edge.source), node_index.get(&edge.target))
            else {
                continue;
            };
            let idx = graph.add_edge(
                s,
                t,
                EdgeData {
                    relation: edge.relation,
                    weight: edge.weight,
                },
            );
            edge_index.insert((s, t, edge.relation), idx);
        }

        let mutual = MutualIndex::from_nodes(graph.node_weights());
        Ok(Self {
            graph,
            node_index,
            edge_index,
            mutual,
            metadata,
        })
    }

    /// An empty graph.
    pub fn empty() -> Self {
        Self {
            graph: DiGraph::new(),
            node_index: HashMap::new(),
            edge_index: HashMap::new(),
            mutual: MutualIndex::new(),
            metadata: GraphMetadata::default(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|idx| &self.graph[*idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    /// Case-insensitive exact id lookup.
    pub fn resolve(&self, name: &str) -> Option<&Node> {
        let name = name.trim();
        if let Some(node) = self.node(name) {
            return Some(node);
        }
        let lower = name.to_lowercase();
        self.nodes_sorted()
            .into_iter()
            .find(|n| n.id.to_lowercase() == lower)
    }

    /// Nodes in storage order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// Nodes sorted by id.
    pub fn nodes_sorted(&self) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self.graph.node_weights().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes().filter(move |n| n.kind == kind)
    }

    /// All edges, sorted by (source, target, relation).
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self
            .graph
            .edge_references()
            .map(|e| {
                Edge::new(
                    self.graph[e.source()].id.clone(),
                    self.graph[e.target()].id.clone(),
                    e.weight().relation,
                    e.weight().weight,
                )
            })
            .collect();
        edges.sort_by(|a, b| a.key().cmp(&b.key()));
        edges
    }

    pub fn edge(&self, source: &str, target: &str, relation: Relation) -> Option<EdgeData> {
        let s = self.node_index.get(source)?;
        let t = self.node_index.get(target)?;
        let idx = self.edge_index.get(&(*s, *t, relation))?;
        Some(self.graph[*idx])
    }

    /// Targets of `relation` edges leaving `id`, sorted.
    pub fn successors(&self, id: &str, relation: Relation) -> Vec<&str> {
        self.neighbors(id, relation, Direction::Outgoing)
    }

    /// Sources of `relation` edges entering `id`, sorted.
    pub fn predecessors(&self, id: &str, relation: Relation) -> Vec<&str> {
        self.neighbors(id, relation, Direction::Incoming)
    }

    fn neighbors(&self, id: &str, relation: Relation, dir: Direction) -> Vec<&str> {
        let Some(&idx) = self.node_index.get(id) else {
            return Vec::new();
        };
        let mut out: Vec<&str> = self
            .graph
            .edges_directed(idx, dir)
            .filter(|e| e.weight().relation == relation)
            .map(|e| {
                let other = if dir == Direction::Outgoing {
                    e.target()
                } else {
                    e.source()
                };
                self.graph[other].id.as_str()
            })
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Enabling predecessors (what must be known first), sorted.
    pub fn enabling_predecessors(&self, id: &str) -> Vec<&str> {
        let mut out = self.predecessors(id, Relation::PrerequisiteFor);
        out.extend(self.predecessors(id, Relation::LeadsTo));
        out.sort_unstable();
        out.dedup();
        out.retain(|p| *p != id);
        out
    }

    /// Enabling successors (what this opens up), sorted.
    pub fn enabling_successors(&self, id: &str) -> Vec<&str> {
        let mut out = self.successors(id, Relation::PrerequisiteFor);
        out.extend(self.successors(id, Relation::LeadsTo));
        out.sort_unstable();
        out.dedup();
        out.retain(|s| *s != id);
        out
    }

    /// Dense enabling adjacency over every node.
    pub fn enabling_adjacency(&self) -> EnablingAdjacency<'_> {
        self.enabling_adjacency_where(|_| true)
    }

    /// Dense enabling adjacency restricted to nodes accepted by `keep`.
    pub fn enabling_adjacency_where<F>(&self, keep: F) -> EnablingAdjacency<'_>
    where
        F: Fn(&Node) -> bool,
    {
        let mut members: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|idx| keep(&self.graph[*idx]))
            .collect();
        members.sort_by(|a, b| self.graph[*a].id.cmp(&self.graph[*b].id));

        let ids: Vec<&str> = members.iter().map(|idx| self.graph[*idx].id.as_str()).collect();
        let index: HashMap<&str, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let local: HashMap<NodeIndex, usize> =
            members.iter().enumerate().map(|(i, idx)| (*idx, i)).collect();

        let mut succ: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); ids.len()];
        let mut pred: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); ids.len()];
        for edge in self.graph.edge_references() {
            if !edge.weight().relation.is_enabling() || edge.source() == edge.target() {
                continue;
            }
            let (Some(&s), Some(&t)) = (local.get(&edge.source()), local.get(&edge.target())) else {
                continue;
            };
            let w = edge.weight().weight as f64;
            *succ[s].entry(t).or_insert(0.0) += w;
            *pred[t].entry(s).or_insert(0.0) += w;
        }

        EnablingAdjacency {
            ids,
            index,
            successors: succ.into_iter().map(|m| m.into_iter().collect()).collect(),
            predecessors: pred.into_iter().map(|m| m.into_iter().collect()).collect(),
        }
    }

    pub fn mutual_index(&self) -> &MutualIndex {
        &self.mutual
    }

    pub fn metadata(&self) -> &GraphMetadata {
        &self.metadata
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// True once every node carries written-back scores.
    pub fn is_enhanced(&self) -> bool {
        !self.is_empty() && self.graph.node_weights().all(Node::is_enhanced)
    }

    /// Return a copy with computed scores written onto every node.
    ///
    /// Nodes missing from `scores` get zeroed scores, so stale values from
    /// a previous enhance never survive.
    pub fn enhance(&self, scores: &ScoreTable) -> KnowledgeGraph {
        let mut enhanced = self.clone();
        for node in enhanced.graph.node_weights_mut() {
            node.scores = Some(scores.get(&node.id).copied().unwrap_or_default());
        }
        enhanced.metadata.mutual_indexing = true;
        enhanced.metadata.pagerank_computed = true;
        enhanced.metadata.enhanced_at = Some(chrono::Utc::now().to_rfc3339());
        tracing::info!(
            nodes = enhanced.node_count(),
            indexed_chunks = enhanced.mutual.indexed_chunks(),
            "graph enhanced"
        );
        enhanced
    }

    /// Decompose into owned parts (nodes sorted by id, edges sorted by key).
    pub fn to_parts(&self) -> (Vec<Node>, Vec<Edge>, GraphMetadata) {
        let nodes = self.nodes_sorted().into_iter().cloned().collect();
        (nodes, self.edges(), self.metadata.clone())
    }
}

impl Default for KnowledgeGraph {
    fn default() -> Self {
        Self::empty()
    }
}
