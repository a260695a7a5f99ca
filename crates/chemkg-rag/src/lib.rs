//! # ChemKG RAG
//!
//! Question answering over the textbook knowledge graph.
//!
//! A question is split into dependent sub-questions, ordered by their
//! declared dependencies, and answered one context bundle at a time:
//!
//! | Step | Source |
//! |------|--------|
//! | Passage search | [`PassageRetriever`] |
//! | Topics and concepts | mutual index and `contains` edges |
//! | Ranked prerequisites | `PathTracer` over `prerequisite_for` edges |
//! | Sub-answer and synthesis | [`chemkg_llm::LlmBackend`] |
//!
//! External calls are bounded by timeouts and never abort a run. Every
//! degraded call is recorded on the [`Answer`].

pub mod coverage;
pub mod decompose;
pub mod diagnostics;
pub mod dual;
pub mod pipeline;
pub mod prelude;
pub mod retrieval;

pub use coverage::{Coverage, SourceCoverage};
pub use diagnostics::{Degradation, Diagnostics, Stage};
pub use pipeline::{Answer, ContextBundle, PipelineConfig, PipelineMode, QuestionPipeline};
pub use retrieval::{InMemoryPassageStore, Passage, PassageHit, PassageRetriever, RetrievalError};
