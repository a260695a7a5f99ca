//! Structured output returned by the text-generation collaborator.

use crate::backend::{LlmError, LlmResult};
use crate::prompt::extract_json_object;
use serde::{Deserialize, Deserializer, Serialize};

/// One atomic sub-question with its declared dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubQuestion {
    #[serde(deserialize_with = "id_from_any")]
    pub id: u32,
    pub question: String,
    #[serde(default, deserialize_with = "ids_from_any")]
    pub depends_on: Vec<u32>,
}

impl SubQuestion {
    pub fn new(id: u32, question: impl Into<String>) -> Self {
        Self {
            id,
            question: question.into(),
            depends_on: Vec::new(),
        }
    }

    pub fn depends_on(mut self, ids: impl IntoIterator<Item = u32>) -> Self {
        self.depends_on = ids.into_iter().collect();
        self
    }
}

/// A decomposed question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decomposition {
    pub sub_questions: Vec<SubQuestion>,
    #[serde(default)]
    pub final_synthesis: Option<String>,
}

impl Decomposition {
    /// The question itself as the only sub-question.
    pub fn single(question: &str) -> Self {
        Self {
            sub_questions: vec![SubQuestion::new(1, question)],
            final_synthesis: None,
        }
    }

    /// Parse model output. An empty list counts as unparseable.
    pub fn parse(raw: &str) -> LlmResult<Self> {
        let json = extract_json_object(raw);
        let parsed: Decomposition =
            serde_json::from_str(json).map_err(|e| LlmError::parse(e.to_string(), raw))?;
        if parsed.sub_questions.is_empty() {
            return Err(LlmError::parse("no sub-questions", raw));
        }
        Ok(parsed)
    }

    /// Keep at most `max` sub-questions and drop dependencies on removed ids.
    pub fn truncate(&mut self, max: usize) {
        self.sub_questions.truncate(max);
        let kept: Vec<u32> = self.sub_questions.iter().map(|sq| sq.id).collect();
        for sq in &mut self.sub_questions {
            sq.depends_on.retain(|d| kept.contains(d));
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Num(u32),
    Text(String),
}

impl RawId {
    fn into_id<E: serde::de::Error>(self) -> Result<u32, E> {
        match self {
            RawId::Num(n) => Ok(n),
            RawId::Text(s) => s
                .trim()
                .trim_start_matches(['q', 'Q'])
                .parse()
                .map_err(|_| E::custom(format!("invalid sub-question id: {}", s))),
        }
    }
}

fn id_from_any<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    RawId::deserialize(d)?.into_id()
}

fn ids_from_any<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u32>, D::Error> {
    Vec::<RawId>::deserialize(d)?
        .into_iter()
        .map(RawId::into_id)
        .collect()
}
