//! ChemKG RAG Prelude: convenient imports for common usage.
//!
//! ```rust
//! use chemkg_rag::prelude::*;
//! ```

pub use crate::coverage::{Coverage, SourceCoverage};
pub use crate::decompose::{order, sanitize, OrderedQuestions};
pub use crate::diagnostics::{Degradation, Diagnostics, Stage};
pub use crate::dual::{dual_level, ConceptHit, DualRetrieval, TopicHit};
pub use crate::pipeline::{Answer, ContextBundle, PipelineConfig, PipelineMode, QuestionPipeline};
pub use crate::retrieval::{
    InMemoryPassageStore, Passage, PassageHit, PassageRetriever, RetrievalError, RetrievalResult,
};

pub use chemkg_llm::prelude::*;
