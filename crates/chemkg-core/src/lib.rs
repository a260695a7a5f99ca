//! # ChemKG Core
//!
//! Shared data model for the chemistry knowledge graph.
//!
//! This crate defines the types every other crate speaks:
//!
//! - **Node / Edge**: knowledge units and the typed, weighted relations between them
//! - **Scale**: the five-level semantic funnel from quantum to application
//! - **ExtractionRecord**: per-passage output of the text-understanding collaborator
//! - **Normalizer**: canonical naming applied once at the ingestion boundary
//! - **ChemkgError**: the error taxonomy shared by the graph and query layers
//!
//! ## Quick Start
//!
//! ```rust
//! use chemkg_core::prelude::*;
//!
//! let record = ExtractionRecord::new("c1")
//!     .with_topic("cft")
//!     .with_concepts(["CFSE"]);
//! let normalized = Normalizer::new().record(&record);
//! assert_eq!(normalized.topic.as_deref(), Some("Crystal Field Theory"));
//! assert_eq!(Scale::infer("Crystal Field Theory"), Scale::Electronic);
//! ```

pub mod types;
pub mod record;
pub mod normalize;
pub mod error;
pub mod prelude;
