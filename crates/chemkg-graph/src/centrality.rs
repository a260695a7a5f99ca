//! Centrality & classification over the "enables" subgraph.
//!
//! Two complementary views:
//! - rank propagation (forward = where paths converge, reverse = where they start)
//! - degree-threshold classes for sparse graphs
//!
//! `recommend_method` picks between them from the mean degree.

use crate::store::{EnablingAdjacency, KnowledgeGraph};
use chemkg_core::error::{ChemkgError, Result};
use chemkg_core::types::NodeScores;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Power-iteration parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankConfig {
    #[serde(default = "default_damping")]
    pub damping: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// L1 distance between successive iterates that counts as converged.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_damping() -> f64 {
    0.85
}

fn default_max_iterations() -> usize {
    100
}

fn default_tolerance() -> f64 {
    1e-6
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            damping: default_damping(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
        }
    }
}

impl RankConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.damping) {
            return Err(ChemkgError::out_of_range("rank.damping", 0.0, 1.0, self.damping));
        }
        if self.max_iterations == 0 {
            return Err(ChemkgError::invalid_config(
                "rank.max_iterations",
                "0",
                "at least one iteration is required",
            ));
        }
        if self.tolerance <= 0.0 {
            return Err(ChemkgError::invalid_config(
                "rank.tolerance",
                self.tolerance.to_string(),
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// Which way rank mass flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankDirection {
    /// Along enabling edges; mass pools at capstones.
    Forward,
    /// Against enabling edges; mass pools at foundations.
    Reverse,
}

/// Output of one power iteration run, indexed like the adjacency ids.
#[derive(Debug, Clone, PartialEq)]
pub struct RankResult {
    pub ranks: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

/// Weighted PageRank over an enabling adjacency.
///
/// Nodes without outgoing weight in the chosen direction spread their mass
/// uniformly over all nodes each iteration, so the ranks always sum to 1.
pub fn propagate_rank(
    adj: &EnablingAdjacency<'_>,
    direction: RankDirection,
    config: &RankConfig,
) -> RankResult {
    let n = adj.len();
    if n == 0 {
        return RankResult {
            ranks: Vec::new(),
            iterations: 0,
            converged: true,
        };
    }

    let out = match direction {
        RankDirection::Forward => &adj.successors,
        RankDirection::Reverse => &adj.predecessors,
    };
    let out_weight: Vec<f64> = out
        .iter()
        .map(|nbrs| nbrs.iter().map(|(_, w)| w).sum())
        .collect();

    let nf = n as f64;
    let d = config.damping;
    let mut rank = vec![1.0 / nf; n];
    let mut next = vec![0.0; n];

    for iteration in 1..=config.max_iterations {
        let dangling: f64 = (0..n)
            .filter(|&u| out_weight[u] <= 0.0)
            .map(|u| rank[u])
            .sum();
        let base = (1.0 - d) / nf + d * dangling / nf;
        next.iter_mut().for_each(|r| *r = base);

        for u in 0..n {
            if out_weight[u] <= 0.0 {
                continue;
            }
            let share = d * rank[u] / out_weight[u];
            for &(v, w) in &out[u] {
                next[v] += share * w;
            }
        }

        let delta: f64 = rank.iter().zip(&next).map(|(a, b)| (a - b).abs()).sum();
        std::mem::swap(&mut rank, &mut next);
        if delta < config.tolerance {
            tracing::debug!(iteration, delta, ?direction, "rank converged");
            return RankResult {
                ranks: rank,
                iterations: iteration,
                converged: true,
            };
        }
    }

    tracing::debug!(iterations = config.max_iterations, ?direction, "rank hit iteration cap");
    RankResult {
        ranks: rank,
        iterations: config.max_iterations,
        converged: false,
    }
}

/// Degree thresholds for role classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegreeThresholds {
    /// Minimum out-degree for a source node to count as a foundation.
    #[serde(default = "default_foundation_min_out")]
    pub foundation_min_out: usize,
    /// Minimum in-degree for a sink node to count as a capstone.
    #[serde(default = "default_capstone_min_in")]
    pub capstone_min_in: usize,
    /// Hubs need strictly more than this in both directions.
    #[serde(default = "default_hub_above")]
    pub hub_above: usize,
}

fn default_foundation_min_out() -> usize {
    5
}

fn default_capstone_min_in() -> usize {
    50
}

fn default_hub_above() -> usize {
    2
}

impl Default for DegreeThresholds {
    fn default() -> Self {
        Self {
            foundation_min_out: default_foundation_min_out(),
            capstone_min_in: default_capstone_min_in(),
            hub_above: default_hub_above(),
        }
    }
}

impl DegreeThresholds {
    /// Every source is a foundation and every sink a capstone.
    pub fn pure() -> Self {
        Self {
            foundation_min_out: 1,
            capstone_min_in: 1,
            hub_above: default_hub_above(),
        }
    }

    pub fn classify(&self, in_degree: usize, out_degree: usize) -> DegreeRole {
        if in_degree == 0 && out_degree >= self.foundation_min_out {
            DegreeRole::Foundation
        } else if out_degree == 0 && in_degree >= self.capstone_min_in {
            DegreeRole::Capstone
        } else if in_degree > self.hub_above && out_degree > self.hub_above {
            DegreeRole::Hub
        } else {
            DegreeRole::Unclassified
        }
    }
}

/// Role from degree thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DegreeRole {
    Foundation,
    Capstone,
    Hub,
    Unclassified,
}

impl DegreeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            DegreeRole::Foundation => "FOUNDATION",
            DegreeRole::Capstone => "CAPSTONE",
            DegreeRole::Hub => "HUB",
            DegreeRole::Unclassified => "UNCLASSIFIED",
        }
    }
}

/// Cut points on `reverse_rank - forward_rank`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionThresholds {
    #[serde(default = "default_foundation_above")]
    pub foundation_above: f64,
    #[serde(default = "default_capstone_below")]
    pub capstone_below: f64,
}

fn default_foundation_above() -> f64 {
    0.001
}

fn default_capstone_below() -> f64 {
    -0.005
}

impl Default for PositionThresholds {
    fn default() -> Self {
        Self {
            foundation_above: default_foundation_above(),
            capstone_below: default_capstone_below(),
        }
    }
}

impl PositionThresholds {
    pub fn classify(&self, position: f64) -> PositionRole {
        if position > self.foundation_above {
            PositionRole::Foundation
        } else if position < self.capstone_below {
            PositionRole::Capstone
        } else {
            PositionRole::Bridge
        }
    }
}

/// Role from the dual-rank position score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionRole {
    Foundation,
    Bridge,
    Capstone,
}

impl PositionRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionRole::Foundation => "FOUNDATION",
            PositionRole::Bridge => "BRIDGE",
            PositionRole::Capstone => "CAPSTONE",
        }
    }
}

/// Which classification suits the graph's density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Degree,
    Rank,
    Both,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Degree => "degree",
            Method::Rank => "rank",
            Method::Both => "both",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mean total degree (2E/N) over distinct enabling pairs.
pub fn mean_degree(graph: &KnowledgeGraph) -> f64 {
    let adj = graph.enabling_adjacency();
    if adj.is_empty() {
        return 0.0;
    }
    2.0 * adj.edge_count() as f64 / adj.len() as f64
}

/// "degree" below mean degree 3, "rank" above 10, "both" in between.
pub fn recommend_method(graph: &KnowledgeGraph) -> Method {
    method_for_mean_degree(mean_degree(graph))
}

fn method_for_mean_degree(mean: f64) -> Method {
    if mean < 3.0 {
        Method::Degree
    } else if mean > 10.0 {
        Method::Rank
    } else {
        Method::Both
    }
}

/// `min(1, (in + out) / 50)`.
pub fn hub_score(in_degree: usize, out_degree: usize) -> f64 {
    ((in_degree + out_degree) as f64 / 50.0).min(1.0)
}

/// Computed scores keyed by node id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreTable {
    scores: BTreeMap<String, NodeScores>,
}

impl ScoreTable {
    pub fn get(&self, id: &str) -> Option<&NodeScores> {
        self.scores.get(id)
    }

    /// Reverse rank, or 0 for unknown ids.
    pub fn reverse_rank(&self, id: &str) -> f64 {
        self.scores.get(id).map(|s| s.reverse_rank).unwrap_or(0.0)
    }

    pub fn forward_rank(&self, id: &str) -> f64 {
        self.scores.get(id).map(|s| s.forward_rank).unwrap_or(0.0)
    }

    /// `reverse_rank - forward_rank`.
    pub fn position(&self, id: &str) -> f64 {
        self.reverse_rank(id) - self.forward_rank(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeScores)> {
        self.scores.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn insert(&mut self, id: impl Into<String>, scores: NodeScores) {
        self.scores.insert(id.into(), scores);
    }

    /// Ids sorted by descending reverse rank, ties by id.
    pub fn by_reverse_rank(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.scores.keys().map(String::as_str).collect();
        ids.sort_by(|a, b| {
            self.reverse_rank(b)
                .total_cmp(&self.reverse_rank(a))
                .then_with(|| a.cmp(b))
        });
        ids
    }
}

/// Per-node classification row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeClass {
    pub id: String,
    pub in_degree: usize,
    pub out_degree: usize,
    pub forward_rank: f64,
    pub reverse_rank: f64,
    pub position: f64,
    pub hub_score: f64,
    pub degree_role: DegreeRole,
    pub position_role: PositionRole,
}

/// Everything `analyze` knows about the graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CentralityReport {
    pub method: Method,
    pub mean_degree: f64,
    pub forward_iterations: usize,
    pub reverse_iterations: usize,
    pub converged: bool,
    /// Sorted by id.
    pub classes: Vec<NodeClass>,
    pub top_foundations_by_rank: Vec<String>,
    pub top_capstones_by_rank: Vec<String>,
    pub foundations_by_degree: Vec<String>,
    pub capstones_by_degree: Vec<String>,
    pub hubs: Vec<String>,
    #[serde(skip)]
    pub scores: ScoreTable,
}

impl CentralityReport {
    pub fn class(&self, id: &str) -> Option<&NodeClass> {
        self.classes
            .binary_search_by(|c| c.id.as_str().cmp(id))
            .ok()
            .map(|i| &self.classes[i])
    }
}

/// Runs rank propagation and classification with explicit configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CentralityEngine {
    #[serde(default)]
    pub rank: RankConfig,
    #[serde(default)]
    pub degree: DegreeThresholds,
    #[serde(default)]
    pub position: PositionThresholds,
    /// Length of each top-N list in the report.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_top_n() -> usize {
    10
}

impl CentralityEngine {
    pub fn new(rank: RankConfig, degree: DegreeThresholds) -> Self {
        Self {
            rank,
            degree,
            position: PositionThresholds::default(),
            top_n: default_top_n(),
        }
    }

    /// Forward/reverse rank, degrees and hub score for every node.
    pub fn scores(&self, graph: &KnowledgeGraph) -> ScoreTable {
        self.compute(graph).0
    }

    fn compute(&self, graph: &KnowledgeGraph) -> (ScoreTable, RankResult, RankResult) {
        let adj = graph.enabling_adjacency();
        let forward = propagate_rank(&adj, RankDirection::Forward, &self.rank);
        let reverse = propagate_rank(&adj, RankDirection::Reverse, &self.rank);

        let mut table = ScoreTable::default();
        for (i, id) in adj.ids.iter().enumerate() {
            let (in_degree, out_degree) = (adj.in_degree(i), adj.out_degree(i));
            table.insert(
                *id,
                NodeScores {
                    forward_rank: forward.ranks[i],
                    reverse_rank: reverse.ranks[i],
                    in_degree,
                    out_degree,
                    hub_score: hub_score(in_degree, out_degree),
                },
            );
        }
        (table, forward, reverse)
    }

    /// Degree role of every node.
    pub fn degree_roles(&self, scores: &ScoreTable) -> BTreeMap<String, DegreeRole> {
        scores
            .iter()
            .map(|(id, s)| (id.to_string(), self.degree.classify(s.in_degree, s.out_degree)))
            .collect()
    }

    /// Dual-rank position role of every node.
    pub fn position_roles(&self, scores: &ScoreTable) -> BTreeMap<String, PositionRole> {
        scores
            .iter()
            .map(|(id, s)| {
                (
                    id.to_string(),
                    self.position.classify(s.reverse_rank - s.forward_rank),
                )
            })
            .collect()
    }

    /// Full classification report.
    pub fn analyze(&self, graph: &KnowledgeGraph) -> CentralityReport {
        let (scores, forward, reverse) = self.compute(graph);
        let mean = mean_degree(graph);
        let method = method_for_mean_degree(mean);

        let classes: Vec<NodeClass> = scores
            .iter()
            .map(|(id, s)| {
                let position = s.reverse_rank - s.forward_rank;
                NodeClass {
                    id: id.to_string(),
                    in_degree: s.in_degree,
                    out_degree: s.out_degree,
                    forward_rank: s.forward_rank,
                    reverse_rank: s.reverse_rank,
                    position,
                    hub_score: s.hub_score,
                    degree_role: self.degree.classify(s.in_degree, s.out_degree),
                    position_role: self.position.classify(position),
                }
            })
            .collect();

        let top_by = |role: PositionRole, key: fn(&NodeClass) -> f64| -> Vec<String> {
            let mut picked: Vec<&NodeClass> =
                classes.iter().filter(|c| c.position_role == role).collect();
            picked.sort_by(|a, b| key(b).total_cmp(&key(a)).then_with(|| a.id.cmp(&b.id)));
            picked.into_iter().take(self.top_n).map(|c| c.id.clone()).collect()
        };
        let top_foundations_by_rank = top_by(PositionRole::Foundation, |c| c.position);
        let top_capstones_by_rank = top_by(PositionRole::Capstone, |c| -c.position);

        let with_role = |role: DegreeRole, key: fn(&NodeClass) -> usize| -> Vec<String> {
            let mut picked: Vec<&NodeClass> =
                classes.iter().filter(|c| c.degree_role == role).collect();
            picked.sort_by(|a, b| key(b).cmp(&key(a)).then_with(|| a.id.cmp(&b.id)));
            picked.into_iter().take(self.top_n).map(|c| c.id.clone()).collect()
        };
        let foundations_by_degree = with_role(DegreeRole::Foundation, |c| c.out_degree);
        let capstones_by_degree = with_role(DegreeRole::Capstone, |c| c.in_degree);
        let hubs = with_role(DegreeRole::Hub, |c| c.in_degree + c.out_degree);

        tracing::info!(
            nodes = classes.len(),
            mean_degree = mean,
            method = %method,
            "centrality computed"
        );

        CentralityReport {
            method,
            mean_degree: mean,
            forward_iterations: forward.iterations,
            reverse_iterations: reverse.iterations,
            converged: forward.converged && reverse.converged,
            classes,
            top_foundations_by_rank,
            top_capstones_by_rank,
            foundations_by_degree,
            capstones_by_degree,
            hubs,
            scores,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::GraphMetadata;
    use chemkg_core::types::{Edge, Node, NodeKind, Relation};

    fn graph(ids: &[&str], edges: &[(&str, &str)]) -> KnowledgeGraph {
        let nodes = ids.iter().map(|id| Node::new(*id, NodeKind::Topic)).collect();
        let edges = edges
            .iter()
            .map(|(s, t)| Edge::new(*s, *t, Relation::PrerequisiteFor, 1))
            .collect();
        KnowledgeGraph::from_parts(nodes, edges, GraphMetadata::default()).unwrap()
    }

    #[test]
    fn two_node_chain_pools_forward_rank_at_sink() {
        let g = graph(&["X", "Y"], &[("X", "Y")]);
        let scores = CentralityEngine::default().scores(&g);
        assert!(scores.forward_rank("Y") > scores.forward_rank("X"));
        assert!(scores.reverse_rank("X") > scores.reverse_rank("Y"));
    }

    #[test]
    fn ranks_sum_to_one_with_dangling_nodes() {
        let g = graph(
            &["A", "B", "C", "D", "E"],
            &[("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")],
        );
        let scores = CentralityEngine::default().scores(&g);
        let fwd: f64 = scores.iter().map(|(_, s)| s.forward_rank).sum();
        let rev: f64 = scores.iter().map(|(_, s)| s.reverse_rank).sum();
        assert!((fwd - 1.0).abs() < 1e-4, "forward sum {fwd}");
        assert!((rev - 1.0).abs() < 1e-4, "reverse sum {rev}");
    }

    #[test]
    fn empty_graph_has_no_scores() {
        let scores = CentralityEngine::default().scores(&KnowledgeGraph::empty());
        assert!(scores.is_empty());
        assert_eq!(recommend_method(&KnowledgeGraph::empty()), Method::Degree);
    }

    #[test]
    fn degree_thresholds() {
        let t = DegreeThresholds::default();
        assert_eq!(t.classify(0, 5), DegreeRole::Foundation);
        assert_eq!(t.classify(0, 4), DegreeRole::Unclassified);
        assert_eq!(t.classify(50, 0), DegreeRole::Capstone);
        assert_eq!(t.classify(3, 3), DegreeRole::Hub);
        assert_eq!(t.classify(2, 3), DegreeRole::Unclassified);
        assert_eq!(DegreeThresholds::pure().classify(1, 0), DegreeRole::Capstone);
    }

    #[test]
    fn position_thresholds() {
        let t = PositionThresholds::default();
        assert_eq!(t.classify(0.002), PositionRole::Foundation);
        assert_eq!(t.classify(0.0), PositionRole::Bridge);
        assert_eq!(t.classify(-0.004), PositionRole::Bridge);
        assert_eq!(t.classify(-0.006), PositionRole::Capstone);
    }

    #[test]
    fn method_follows_density() {
        assert_eq!(method_for_mean_degree(1.0), Method::Degree);
        assert_eq!(method_for_mean_degree(3.0), Method::Both);
        assert_eq!(method_for_mean_degree(10.0), Method::Both);
        assert_eq!(method_for_mean_degree(10.5), Method::Rank);

        let chain = graph(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
        assert!((mean_degree(&chain) - 4.0 / 3.0).abs() < 1e-9);
        assert_eq!(recommend_method(&chain), Method::Degree);
    }

    #[test]
    fn hub_score_saturates() {
        assert_eq!(hub_score(10, 15), 0.5);
        assert_eq!(hub_score(40, 40), 1.0);
    }

    #[test]
    fn analyze_lists_roles() {
        let g = graph(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
        let engine = CentralityEngine {
            degree: DegreeThresholds::pure(),
            ..Default::default()
        };
        let report = engine.analyze(&g);
        assert!(report.converged);
        assert_eq!(report.foundations_by_degree, vec!["A"]);
        assert_eq!(report.capstones_by_degree, vec!["C"]);
        assert_eq!(report.class("A").map(|c| c.position_role), Some(PositionRole::Foundation));
        assert_eq!(report.class("C").map(|c| c.position_role), Some(PositionRole::Capstone));
        assert_eq!(report.top_foundations_by_rank.first().map(String::as_str), Some("A"));
    }
}
