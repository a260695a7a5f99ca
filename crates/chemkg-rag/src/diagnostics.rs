//! What degraded while answering, and why.
//!
//! Collaborator failures never abort a pipeline. They are converted to
//! [`ExternalError`] here, logged, and kept on the result.

use crate::retrieval::RetrievalError;
use chemkg_core::error::ExternalError;
use chemkg_llm::LlmError;
use serde::Serialize;
use std::fmt;

/// Pipeline stage that made an external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Decompose,
    Retrieve,
    Fetch,
    Answer,
    Synthesize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Decompose => "decompose",
            Stage::Retrieve => "retrieve",
            Stage::Fetch => "fetch",
            Stage::Answer => "answer",
            Stage::Synthesize => "synthesize",
        };
        f.write_str(s)
    }
}

/// One degraded external call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Degradation {
    pub stage: Stage,
    pub sub_question: Option<u32>,
    pub message: String,
    /// Unparseable output, when that was the failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(skip)]
    pub error: ExternalError,
}

impl Degradation {
    pub fn new(stage: Stage, sub_question: Option<u32>, error: ExternalError) -> Self {
        let raw = match &error {
            ExternalError::MalformedResponse { raw, .. } => Some(raw.clone()),
            _ => None,
        };
        tracing::warn!(%stage, sub_question, error = %error, "external call degraded");
        Self {
            stage,
            sub_question,
            message: error.to_string(),
            raw,
            error,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self.error, ExternalError::MalformedResponse { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.error, ExternalError::TimedOut { .. })
    }
}

/// Everything that did not go to plan in one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub degraded: Vec<Degradation>,
    /// Sub-question ids placed by the cycle fallback.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cycle: Vec<u32>,
}

impl Diagnostics {
    pub fn push(&mut self, degradation: Degradation) {
        self.degraded.push(degradation);
    }

    pub fn is_clean(&self) -> bool {
        self.degraded.is_empty() && self.cycle.is_empty()
    }

    pub fn malformed(&self) -> impl Iterator<Item = &Degradation> {
        self.degraded.iter().filter(|d| d.is_malformed())
    }

    pub fn for_stage(&self, stage: Stage) -> impl Iterator<Item = &Degradation> {
        self.degraded.iter().filter(move |d| d.stage == stage)
    }
}

/// Map a text-generation failure onto the shared taxonomy.
pub fn from_llm(service: &str, err: &LlmError) -> ExternalError {
    match err {
        LlmError::Timeout(secs) => ExternalError::TimedOut {
            service: service.to_string(),
            secs: *secs,
        },
        LlmError::ParseError { raw, .. } => ExternalError::MalformedResponse {
            service: service.to_string(),
            raw: raw.clone(),
        },
        other => ExternalError::Unavailable {
            service: service.to_string(),
            reason: other.to_string(),
        },
    }
}

/// Map a retrieval failure onto the shared taxonomy.
pub fn from_retrieval(service: &str, err: &RetrievalError) -> ExternalError {
    ExternalError::Unavailable {
        service: service.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_errors_map_by_kind() {
        assert!(matches!(
            from_llm("ollama", &LlmError::Timeout(120)),
            ExternalError::TimedOut { secs: 120, .. }
        ));
        let malformed = from_llm("ollama", &LlmError::parse("bad", "{oops"));
        let d = Degradation::new(Stage::Decompose, None, malformed);
        assert!(d.is_malformed());
        assert_eq!(d.raw.as_deref(), Some("{oops"));
        assert!(matches!(
            from_llm("ollama", &LlmError::ConnectionFailed("refused".into())),
            ExternalError::Unavailable { .. }
        ));
    }

    #[test]
    fn diagnostics_filters() {
        let mut diag = Diagnostics::default();
        assert!(diag.is_clean());
        diag.push(Degradation::new(
            Stage::Retrieve,
            Some(1),
            from_retrieval("in-memory", &RetrievalError::Unavailable("down".into())),
        ));
        assert!(!diag.is_clean());
        assert_eq!(diag.for_stage(Stage::Retrieve).count(), 1);
        assert_eq!(diag.malformed().count(), 0);

        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["degraded"][0]["stage"], "retrieve");
        assert!(json.get("cycle").is_none());
    }
}
