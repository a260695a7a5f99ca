//! Error types for knowledge-graph operations.
//!
//! Structural problems are collected and reported together at build or
//! load time. Collaborator failures are represented here so callers can
//! record them, but the pipelines recover from them locally.

use std::error::Error;
use std::fmt;

/// Result type for knowledge-graph operations.
pub type Result<T> = std::result::Result<T, ChemkgError>;

/// Errors that can occur while building, loading or querying the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum ChemkgError {
    /// Persisted graph missing, malformed or structurally invalid.
    Graph(GraphError),
    /// Requested concept or topic is absent.
    Concept(ConceptError),
    /// Retrieval or text-generation collaborator failure.
    External(ExternalError),
    /// Dependency ordering could not be completed.
    Dependency(DependencyError),
    /// Configuration errors.
    Config(ConfigError),
    /// I/O errors (wrapped).
    Io(String),
    /// Serialization errors.
    Serialization(String),
}

impl fmt::Display for ChemkgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChemkgError::Graph(e) => write!(f, "Graph error: {}", e),
            ChemkgError::Concept(e) => write!(f, "Concept error: {}", e),
            ChemkgError::External(e) => write!(f, "External service error: {}", e),
            ChemkgError::Dependency(e) => write!(f, "Dependency error: {}", e),
            ChemkgError::Config(e) => write!(f, "Config error: {}", e),
            ChemkgError::Io(msg) => write!(f, "I/O error: {}", msg),
            ChemkgError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl Error for ChemkgError {}

impl From<std::io::Error> for ChemkgError {
    fn from(e: std::io::Error) -> Self {
        ChemkgError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for ChemkgError {
    fn from(e: serde_json::Error) -> Self {
        ChemkgError::Serialization(e.to_string())
    }
}

/// A single graph-structural invariant violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Node with an empty id.
    EmptyNodeId,
    /// Two nodes share one id.
    DuplicateNode(String),
    /// Edge endpoint does not exist.
    DanglingEdge {
        source: String,
        target: String,
        missing: String,
    },
    /// Two edges share one (source, target, relation) triple.
    DuplicateEdge {
        source: String,
        target: String,
        relation: String,
    },
    /// Edge weight must be positive.
    ZeroWeight { source: String, target: String },
    /// Relation name not understood.
    UnknownRelation(String),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::EmptyNodeId => write!(f, "node with empty id"),
            Violation::DuplicateNode(id) => write!(f, "duplicate node: {}", id),
            Violation::DanglingEdge {
                source,
                target,
                missing,
            } => write!(
                f,
                "edge {} -> {} references missing node {}",
                source, target, missing
            ),
            Violation::DuplicateEdge {
                source,
                target,
                relation,
            } => write!(f, "duplicate edge {} -[{}]-> {}", source, relation, target),
            Violation::ZeroWeight { source, target } => {
                write!(f, "edge {} -> {} has zero weight", source, target)
            }
            Violation::UnknownRelation(rel) => write!(f, "unknown relation: {}", rel),
        }
    }
}

/// Graph load and structure errors.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    /// Persisted graph file not found.
    NotFound(String),
    /// Persisted graph could not be parsed.
    Malformed { path: String, reason: String },
    /// Structural invariants violated.
    InvariantViolations(Vec<Violation>),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::NotFound(path) => write!(f, "Graph file not found: {}", path),
            GraphError::Malformed { path, reason } => {
                write!(f, "Malformed graph file {}: {}", path, reason)
            }
            GraphError::InvariantViolations(violations) => {
                write!(f, "{} invariant violation(s)", violations.len())?;
                for v in violations.iter().take(5) {
                    write!(f, "; {}", v)?;
                }
                if violations.len() > 5 {
                    write!(f, "; ...")?;
                }
                Ok(())
            }
        }
    }
}

/// Concept lookup errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConceptError {
    /// Concept absent, with fuzzy-match suggestions.
    Unknown {
        name: String,
        suggestions: Vec<String>,
    },
    /// Nothing to look up.
    EmptyQuery,
}

impl fmt::Display for ConceptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConceptError::Unknown { name, suggestions } => {
                write!(f, "Unknown concept: {}", name)?;
                if !suggestions.is_empty() {
                    write!(f, " (did you mean: {})", suggestions.join(", "))?;
                }
                Ok(())
            }
            ConceptError::EmptyQuery => write!(f, "Query is empty"),
        }
    }
}

/// Collaborator boundary errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalError {
    /// Service unreachable or returned an error.
    Unavailable { service: String, reason: String },
    /// Call exceeded its timeout.
    TimedOut { service: String, secs: u64 },
    /// Structured output could not be parsed; raw text kept for diagnostics.
    MalformedResponse { service: String, raw: String },
}

impl fmt::Display for ExternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalError::Unavailable { service, reason } => {
                write!(f, "{} unavailable: {}", service, reason)
            }
            ExternalError::TimedOut { service, secs } => {
                write!(f, "{} timed out after {}s", service, secs)
            }
            ExternalError::MalformedResponse { service, raw } => {
                let preview: String = raw.chars().take(80).collect();
                write!(f, "{} returned malformed output: {}", service, preview)
            }
        }
    }
}

/// Dependency ordering errors.
#[derive(Debug, Clone, PartialEq)]
pub enum DependencyError {
    /// Members that could not be placed because of a cycle.
    Cycle { members: Vec<String> },
}

impl fmt::Display for DependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyError::Cycle { members } => {
                write!(f, "Cycle among: {}", members.join(", "))
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Invalid value.
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
    /// Out of range.
    OutOfRange {
        field: String,
        min: f64,
        max: f64,
        value: f64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue {
                field,
                value,
                reason,
            } => {
                write!(f, "Invalid value for {}: {} ({})", field, value, reason)
            }
            ConfigError::OutOfRange {
                field,
                min,
                max,
                value,
            } => {
                write!(
                    f,
                    "{} out of range: {} (must be {}-{})",
                    field, value, min, max
                )
            }
        }
    }
}

// Convenience constructors
impl ChemkgError {
    pub fn graph_not_found(path: impl Into<String>) -> Self {
        ChemkgError::Graph(GraphError::NotFound(path.into()))
    }

    pub fn malformed_graph(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ChemkgError::Graph(GraphError::Malformed {
            path: path.into(),
            reason: reason.into(),
        })
    }

    pub fn violations(violations: Vec<Violation>) -> Self {
        ChemkgError::Graph(GraphError::InvariantViolations(violations))
    }

    pub fn unknown_concept(name: impl Into<String>, suggestions: Vec<String>) -> Self {
        ChemkgError::Concept(ConceptError::Unknown {
            name: name.into(),
            suggestions,
        })
    }

    pub fn empty_query() -> Self {
        ChemkgError::Concept(ConceptError::EmptyQuery)
    }

    pub fn unavailable(service: impl Into<String>, reason: impl Into<String>) -> Self {
        ChemkgError::External(ExternalError::Unavailable {
            service: service.into(),
            reason: reason.into(),
        })
    }

    pub fn timed_out(service: impl Into<String>, secs: u64) -> Self {
        ChemkgError::External(ExternalError::TimedOut {
            service: service.into(),
            secs,
        })
    }

    pub fn malformed_response(service: impl Into<String>, raw: impl Into<String>) -> Self {
        ChemkgError::External(ExternalError::MalformedResponse {
            service: service.into(),
            raw: raw.into(),
        })
    }

    pub fn cycle(members: Vec<String>) -> Self {
        ChemkgError::Dependency(DependencyError::Cycle { members })
    }

    pub fn out_of_range(field: impl Into<String>, min: f64, max: f64, value: f64) -> Self {
        ChemkgError::Config(ConfigError::OutOfRange {
            field: field.into(),
            min,
            max,
            value,
        })
    }

    pub fn invalid_config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ChemkgError::Config(ConfigError::InvalidValue {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        })
    }

    /// Suggestions carried by an unknown-concept error.
    pub fn suggestions(&self) -> &[String] {
        match self {
            ChemkgError::Concept(ConceptError::Unknown { suggestions, .. }) => suggestions,
            _ => &[],
        }
    }

    pub fn is_unknown_concept(&self) -> bool {
        matches!(self, ChemkgError::Concept(ConceptError::Unknown { .. }))
    }
}
