//! ChemKG Core Prelude: convenient imports for common usage.
//!
//! ```rust
//! use chemkg_core::prelude::*;
//! ```

pub use crate::types::{ChunkId, Edge, Node, NodeId, NodeKind, NodeScores, Relation, Scale};

pub use crate::record::ExtractionRecord;

pub use crate::normalize::{normalize_text, title_case, NormalizedRecord, Normalizer, NormalizerConfig};

pub use crate::error::{
    ChemkgError, ConceptError, ConfigError, DependencyError, ExternalError, GraphError, Result,
    Violation,
};
