//! # ChemKG
//!
//! Knowledge-graph analytics and curriculum sequencing for chemistry
//! textbook corpora.
//!
//! Extraction records ("this passage is about topic T, uses concepts C,
//! requires prerequisites P") are folded into a weighted, immutable graph.
//! Everything else reads that graph: rank propagation and role
//! classification, community detection, eight curriculum orderings with
//! hub checkpoints, prerequisite traces, and a question pipeline that
//! answers dependent sub-questions from the graph and a passage store.
//!
//! ## Quick Start
//!
//! ```rust
//! use chemkg::prelude::*;
//!
//! let records: Vec<ExtractionRecord> = (0..3)
//!     .map(|i| {
//!         ExtractionRecord::new(format!("c{i}"))
//!             .with_topic("Crystal Field Theory")
//!             .with_prerequisites(["Atomic Structure"])
//!     })
//!     .collect();
//!
//! let graph = KnowledgeGraph::build(&records).unwrap();
//! let scores = CentralityEngine::default().scores(&graph);
//!
//! let tracer = PathTracer::new(&graph, &scores, TracerConfig::default());
//! let path = tracer.learning_path("Crystal Field Theory", &[] as &[&str]).unwrap();
//! assert_eq!(path.steps.last().unwrap().concept, "Crystal Field Theory");
//! ```
//!
//! ## Architecture
//!
//! | Crate | What it does |
//! |-------|--------------|
//! | [`chemkg_core`] | Node, edge and record types, normalization, errors |
//! | [`chemkg_graph`] | Graph store, centrality, communities, curricula, tracing |
//! | [`chemkg_llm`] | Text-generation backends and prompts |
//! | [`chemkg_rag`] | Passage retrieval and the question pipeline |
//!
//! ## Curriculum strategies
//!
//! | Name | Orders the significant topics by |
//! |------|----------------------------------|
//! | `topological` | Enabling edges, most-mentioned first among ready topics |
//! | `rank` | Reverse rank (fundamentalness) |
//! | `hybrid` | Highest reverse rank among ready topics |
//! | `coverage` | Mention count |
//! | `dfs` / `bfs` | Walks from the five most fundamental topics |
//! | `community` | Communities by summed rank, then members by rank |
//! | `difficulty` | Size of the transitive prerequisite closure |

pub use chemkg_core as core;
pub use chemkg_graph as graph;
pub use chemkg_llm as llm;
pub use chemkg_rag as rag;

/// Prelude module for convenient imports.
///
/// ```rust
/// use chemkg::prelude::*;
/// ```
pub mod prelude {
    // Core types, records and errors
    pub use chemkg_core::prelude::*;

    // Graph store and analytics
    pub use chemkg_graph::prelude::*;

    // Question answering
    pub use chemkg_rag::prelude::*;
}
