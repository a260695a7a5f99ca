//! # ChemKG LLM
//!
//! Text-generation boundary for question answering over the textbook graph.
//!
//! Backends only move text; prompts live in [`prompt`] and structured
//! output parsing in [`types`]. Callers decide how to degrade on errors.
//!
//! ## Features
//!
//! - `local`: Ollama backend over HTTP
//! - `full`: All backends
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chemkg_llm::{LlmBackend, LlmConfig, OllamaBackend};
//!
//! let backend = OllamaBackend::new(LlmConfig::ollama())?;
//! let answer = backend.complete("Why is [Cu(H2O)6]2+ blue?").await?;
//! ```

mod backend;
pub mod prompt;
pub mod types;

pub use backend::{LlmBackend, LlmConfig, LlmError, LlmResult, MockBackend};
pub use prompt::{
    AnswerPrompt, DecompositionPrompt, PerspectivesPrompt, PromptTemplate, SynthesisPrompt,
};
pub use types::{Decomposition, SubQuestion};

#[cfg(feature = "local")]
mod ollama;
#[cfg(feature = "local")]
pub use ollama::OllamaBackend;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{Decomposition, SubQuestion};
    pub use crate::{LlmBackend, LlmConfig, LlmError, LlmResult, MockBackend};
    pub use crate::{PromptTemplate, DecompositionPrompt, AnswerPrompt, SynthesisPrompt, PerspectivesPrompt};

    #[cfg(feature = "local")]
    pub use crate::OllamaBackend;
}
