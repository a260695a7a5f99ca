//! Curriculum sequencing over the significant node subset.
//!
//! Each ordering method is an [`OrderingStrategy`]; [`Strategy`] names the
//! built-in ones. Orders are always total over the subset: when edges form
//! a cycle, the remainder is appended deterministically and reported in
//! [`Curriculum::cycle`].

mod checkpoints;
mod strategies;

pub use checkpoints::{find_checkpoints, remediation_pointer, Checkpoint, CheckpointConfig, CheckpointReason};
pub use strategies::{
    BfsFromCore, CommunityOrder, CoverageOrder, DfsFromCore, DifficultyOrder, HybridOrder,
    RankOrder, TopologicalOrder,
};

use crate::centrality::ScoreTable;
use crate::community::CommunityConfig;
use crate::store::{EnablingAdjacency, KnowledgeGraph};
use chemkg_core::error::{ChemkgError, Result};
use chemkg_core::types::NodeKind;
use serde::{Deserialize, Serialize};

/// Sequencer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencerConfig {
    /// Minimum `mention_count` for a node to be sequenced.
    #[serde(default = "default_min_count")]
    pub min_count: u64,
    /// Restrict to these kinds; `None` keeps every kind.
    #[serde(default)]
    pub kinds: Option<Vec<NodeKind>>,
    /// Entries kept in an exported curriculum.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Seeds for the depth- and breadth-first strategies.
    #[serde(default = "default_seed_count")]
    pub seed_count: usize,
    #[serde(default)]
    pub community: CommunityConfig,
}

fn default_min_count() -> u64 {
    10
}

fn default_top_n() -> usize {
    30
}

fn default_seed_count() -> usize {
    5
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            min_count: default_min_count(),
            kinds: None,
            top_n: default_top_n(),
            seed_count: default_seed_count(),
            community: CommunityConfig::default(),
        }
    }
}

impl SequencerConfig {
    pub fn with_min_count(mut self, min_count: u64) -> Self {
        self.min_count = min_count;
        self
    }

    pub fn with_kinds(mut self, kinds: Vec<NodeKind>) -> Self {
        self.kinds = Some(kinds);
        self
    }
}

/// Built-in ordering methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Topological,
    Rank,
    Hybrid,
    Coverage,
    Dfs,
    Bfs,
    Community,
    Difficulty,
}

impl Strategy {
    pub const ALL: [Strategy; 8] = [
        Strategy::Topological,
        Strategy::Rank,
        Strategy::Hybrid,
        Strategy::Coverage,
        Strategy::Dfs,
        Strategy::Bfs,
        Strategy::Community,
        Strategy::Difficulty,
    ];

    pub fn name(&self) -> &'static str {
        self.implementation().name()
    }

    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        Strategy::ALL
            .iter()
            .copied()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| {
                ChemkgError::invalid_config(
                    "strategy",
                    s.clone(),
                    "expected one of topological, rank, hybrid, coverage, dfs, bfs, community, difficulty",
                )
            })
    }

    fn implementation(&self) -> &'static dyn OrderingStrategy {
        match self {
            Strategy::Topological => &TopologicalOrder,
            Strategy::Rank => &RankOrder,
            Strategy::Hybrid => &HybridOrder,
            Strategy::Coverage => &CoverageOrder,
            Strategy::Dfs => &DfsFromCore,
            Strategy::Bfs => &BfsFromCore,
            Strategy::Community => &CommunityOrder,
            Strategy::Difficulty => &DifficultyOrder,
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Indices into [`Subset::ids`] in curriculum order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ordering {
    pub order: Vec<usize>,
    /// Members that could only be placed by the cycle fallback.
    pub cycle: Vec<usize>,
}

impl Ordering {
    pub fn acyclic(order: Vec<usize>) -> Self {
        Self {
            order,
            cycle: Vec::new(),
        }
    }
}

/// One way of ordering the significant subset.
pub trait OrderingStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn order(&self, subset: &Subset<'_>) -> Ordering;
}

/// The significant node subset with its enabling adjacency.
///
/// Indices are positions in `ids`, which is sorted.
pub struct Subset<'g> {
    pub graph: &'g KnowledgeGraph,
    pub scores: &'g ScoreTable,
    pub config: &'g SequencerConfig,
    pub ids: Vec<&'g str>,
    pub mentions: Vec<u64>,
    pub ranks: Vec<f64>,
    pub adjacency: EnablingAdjacency<'g>,
    /// Index order by descending reverse rank, ties by id.
    pub by_rank: Vec<usize>,
}

impl<'g> Subset<'g> {
    pub fn new(graph: &'g KnowledgeGraph, scores: &'g ScoreTable, config: &'g SequencerConfig) -> Self {
        let adjacency = graph.enabling_adjacency_where(|node| {
            node.mention_count >= config.min_count
                && config.kinds.as_ref().map_or(true, |kinds| kinds.contains(&node.kind))
        });
        let ids = adjacency.ids.clone();
        let mentions = ids
            .iter()
            .map(|id| graph.node(id).map(|n| n.mention_count).unwrap_or(0))
            .collect();
        let ranks: Vec<f64> = ids.iter().map(|id| scores.reverse_rank(id)).collect();
        let mut by_rank: Vec<usize> = (0..ids.len()).collect();
        by_rank.sort_by(|&a, &b| ranks[b].total_cmp(&ranks[a]).then_with(|| a.cmp(&b)));
        Self {
            graph,
            scores,
            config,
            ids,
            mentions,
            ranks,
            adjacency,
            by_rank,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Rank position of every index (0 = highest reverse rank).
    pub fn rank_positions(&self) -> Vec<usize> {
        let mut pos = vec![0; self.len()];
        for (p, &i) in self.by_rank.iter().enumerate() {
            pos[i] = p;
        }
        pos
    }

    /// Successors of `i` inside the subset, highest reverse rank first.
    pub fn successors_by_rank(&self, i: usize, rank_pos: &[usize]) -> Vec<usize> {
        let mut next: Vec<usize> = self.adjacency.successors[i].iter().map(|(j, _)| *j).collect();
        next.sort_by_key(|&j| rank_pos[j]);
        next
    }
}

/// One row of an exported curriculum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumEntry {
    /// 1-based position.
    pub rank: usize,
    pub id: String,
    pub mention_count: u64,
    pub reverse_rank: f64,
    /// Enabling predecessors inside the subset.
    pub prerequisites: Vec<String>,
    /// Enabling successors inside the subset.
    pub leads_to: Vec<String>,
}

/// A sequenced curriculum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curriculum {
    pub method: String,
    pub min_count: u64,
    pub total_topics: usize,
    /// First `top_n` entries.
    pub topics: Vec<CurriculumEntry>,
    /// The full order.
    #[serde(default, skip_serializing)]
    pub order: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cycle: Vec<String>,
}

impl Curriculum {
    /// 1-based position of `id` in the full order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|o| o == id).map(|p| p + 1)
    }

    pub fn entry(&self, id: &str) -> Option<&CurriculumEntry> {
        self.topics.iter().find(|e| e.id == id)
    }

    pub fn has_cycle(&self) -> bool {
        !self.cycle.is_empty()
    }
}

/// Orders the significant subset with any strategy.
pub struct CurriculumSequencer<'g> {
    graph: &'g KnowledgeGraph,
    scores: &'g ScoreTable,
    config: SequencerConfig,
}

impl<'g> CurriculumSequencer<'g> {
    pub fn new(graph: &'g KnowledgeGraph, scores: &'g ScoreTable, config: SequencerConfig) -> Self {
        Self {
            graph,
            scores,
            config,
        }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Run a built-in strategy.
    pub fn sequence(&self, strategy: Strategy) -> Curriculum {
        self.sequence_with(strategy.implementation())
    }

    /// Run any strategy implementation.
    pub fn sequence_with(&self, strategy: &dyn OrderingStrategy) -> Curriculum {
        let subset = Subset::new(self.graph, self.scores, &self.config);
        let ordering = strategy.order(&subset);
        if !ordering.cycle.is_empty() {
            tracing::warn!(
                strategy = strategy.name(),
                members = ordering.cycle.len(),
                "cycle in enabling edges; remainder appended"
            );
        }
        tracing::debug!(strategy = strategy.name(), topics = subset.len(), "curriculum sequenced");
        self.export(strategy.name(), &subset, ordering)
    }

    /// Every built-in strategy, in [`Strategy::ALL`] order.
    pub fn compare_all(&self) -> Vec<Curriculum> {
        Strategy::ALL.iter().map(|s| self.sequence(*s)).collect()
    }

    fn export(&self, method: &str, subset: &Subset<'_>, ordering: Ordering) -> Curriculum {
        let name = |i: usize| subset.ids[i].to_string();
        let topics = ordering
            .order
            .iter()
            .take(self.config.top_n)
            .enumerate()
            .map(|(pos, &i)| CurriculumEntry {
                rank: pos + 1,
                id: name(i),
                mention_count: subset.mentions[i],
                reverse_rank: subset.ranks[i],
                prerequisites: subset.adjacency.predecessors[i].iter().map(|(j, _)| name(*j)).collect(),
                leads_to: subset.adjacency.successors[i].iter().map(|(j, _)| name(*j)).collect(),
            })
            .collect();
        Curriculum {
            method: method.to_string(),
            min_count: self.config.min_count,
            total_topics: subset.len(),
            topics,
            order: ordering.order.iter().map(|&i| name(i)).collect(),
            cycle: ordering.cycle.iter().map(|&i| name(i)).collect(),
        }
    }
}

#[cfg(test)]
pub(crate) fn is_permutation(order: &[usize], len: usize) -> bool {
    let seen: std::collections::HashSet<usize> = order.iter().copied().collect();
    order.len() == len && seen.len() == len && order.iter().all(|&i| i < len)
}
