//! Shared types for the knowledge graph.
//!
//! Nodes are knowledge units identified by a canonical string id.
//! Edges are directed, typed and weighted by the number of corroborating
//! observations. Scores are derived values and are never authoritative.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Canonical node identifier (the normalized display name).
pub type NodeId = String;

/// Opaque identifier of a source passage.
pub type ChunkId = String;

/// Role a node plays in the extraction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Topic,
    Concept,
    Prerequisite,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Topic => "topic",
            NodeKind::Concept => "concept",
            NodeKind::Prerequisite => "prerequisite",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "topic" => Some(NodeKind::Topic),
            "concept" => Some(NodeKind::Concept),
            "prerequisite" | "prereq" => Some(NodeKind::Prerequisite),
            _ => None,
        }
    }

    /// Precedence when one name occurs in several roles (lower wins).
    pub fn precedence(&self) -> u8 {
        match self {
            NodeKind::Topic => 0,
            NodeKind::Concept => 1,
            NodeKind::Prerequisite => 2,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge relation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// Topic contains a concept.
    Contains,
    /// Source must be known before target.
    PrerequisiteFor,
    /// Source opens the way to target.
    LeadsTo,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Contains => "contains",
            Relation::PrerequisiteFor => "prerequisite_for",
            Relation::LeadsTo => "leads_to",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "contains" => Some(Relation::Contains),
            "prerequisite_for" | "prerequisite" => Some(Relation::PrerequisiteFor),
            "leads_to" => Some(Relation::LeadsTo),
            _ => None,
        }
    }

    /// `prerequisite_for` and `leads_to` both mean "must know source to reach target".
    pub fn is_enabling(&self) -> bool {
        matches!(self, Relation::PrerequisiteFor | Relation::LeadsTo)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic scale of a concept, ordered from most fundamental to most applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scale {
    Quantum,
    Electronic,
    Structural,
    Descriptive,
    Application,
}

const QUANTUM_KEYWORDS: &[&str] = &[
    "quantum",
    "wave function",
    "orbital",
    "schrodinger",
    "atomic structure",
    "electron configuration",
    "quantum number",
    "spin",
    "pauli",
];

const ELECTRONIC_KEYWORDS: &[&str] = &[
    "crystal field",
    "molecular orbital",
    "mo theory",
    "bonding",
    "electronic",
    "d-orbital",
    "splitting",
    "cfse",
    "ligand field",
    "band",
    "magnetism",
    "magnetic",
    "spectroscopy",
    "color",
];

const STRUCTURAL_KEYWORDS: &[&str] = &[
    "symmetry",
    "point group",
    "geometry",
    "structure",
    "crystal",
    "coordination",
    "isomer",
    "lattice",
    "unit cell",
    "packing",
];

const APPLICATION_KEYWORDS: &[&str] = &[
    "application",
    "industrial",
    "biological",
    "catalysis",
    "material",
    "environmental",
    "medicine",
    "synthesis",
    "reaction mechanism",
];

impl Scale {
    /// All scales in funnel order.
    pub const ALL: [Scale; 5] = [
        Scale::Quantum,
        Scale::Electronic,
        Scale::Structural,
        Scale::Descriptive,
        Scale::Application,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scale::Quantum => "QUANTUM",
            Scale::Electronic => "ELECTRONIC",
            Scale::Structural => "STRUCTURAL",
            Scale::Descriptive => "DESCRIPTIVE",
            Scale::Application => "APPLICATION",
        }
    }

    /// Position in the funnel (0 = most fundamental).
    pub fn ordinal(&self) -> usize {
        *self as usize
    }

    pub fn parse(s: &str) -> Option<Self> {
        Scale::ALL
            .iter()
            .copied()
            .find(|scale| scale.as_str().eq_ignore_ascii_case(s.trim()))
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Scale::Quantum => QUANTUM_KEYWORDS,
            Scale::Electronic => ELECTRONIC_KEYWORDS,
            Scale::Structural => STRUCTURAL_KEYWORDS,
            Scale::Descriptive => &[],
            Scale::Application => APPLICATION_KEYWORDS,
        }
    }

    /// Infer the scale of a label by keyword match.
    ///
    /// Scales are tried in funnel order and the first match wins, so
    /// "Molecular Orbital Theory" lands in QUANTUM through "orbital".
    pub fn infer(label: &str) -> Scale {
        let lower = label.to_lowercase();
        Scale::ALL
            .iter()
            .copied()
            .find(|scale| scale.keywords().iter().any(|kw| lower.contains(kw)))
            .unwrap_or(Scale::Descriptive)
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived scores written back onto a node by the enhance step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeScores {
    pub forward_rank: f64,
    pub reverse_rank: f64,
    pub in_degree: usize,
    pub out_degree: usize,
    pub hub_score: f64,
}

/// A knowledge unit in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub mention_count: u64,
    pub source_chunk_ids: BTreeSet<ChunkId>,
    pub scale: Scale,
    /// Present only after the enhance step.
    pub scores: Option<NodeScores>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, kind: NodeKind) -> Self {
        let id = id.into();
        let scale = Scale::infer(&id);
        Self {
            id,
            kind,
            mention_count: 0,
            source_chunk_ids: BTreeSet::new(),
            scale,
            scores: None,
        }
    }

    pub fn with_mentions(mut self, count: u64) -> Self {
        self.mention_count = count;
        self
    }

    pub fn is_enhanced(&self) -> bool {
        self.scores.is_some()
    }
}

/// A directed, typed relation between two existing nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub relation: Relation,
    /// Number of corroborating observations.
    pub weight: u32,
}

impl Edge {
    pub fn new(
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        relation: Relation,
        weight: u32,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation,
            weight,
        }
    }

    /// Storage key: at most one edge per triple.
    pub fn key(&self) -> (&str, &str, Relation) {
        (&self.source, &self.target, self.relation)
    }
}
