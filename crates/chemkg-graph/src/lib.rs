//! # ChemKG Graph
//!
//! The knowledge graph and everything computed from it.
//!
//! The graph is built once from extraction records and is immutable
//! afterwards; analytics read it and never mutate it. `enhance` produces
//! a new graph with scores written back, ready to persist.
//!
//! ```rust
//! use chemkg_core::record::ExtractionRecord;
//! use chemkg_graph::prelude::*;
//!
//! let records = vec![
//!     ExtractionRecord::new("c1").with_topic("Bonding").with_prerequisites(["Atomic Structure"]),
//!     ExtractionRecord::new("c2").with_topic("Bonding").with_prerequisites(["Atomic Structure"]),
//! ];
//! let graph = KnowledgeGraph::build(&records).unwrap();
//! let scores = CentralityEngine::default().scores(&graph);
//! assert!(scores.reverse_rank("Atomic Structure") > scores.reverse_rank("Bonding"));
//! ```

pub mod builder;
pub mod centrality;
pub mod community;
pub mod curriculum;
pub mod mutual;
pub mod persist;
pub mod prelude;
pub mod store;
pub mod tracer;
