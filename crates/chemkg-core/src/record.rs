//! Extraction records produced by the text-understanding collaborator.
//!
//! One record per source passage. Every field except `chunk_id` may be
//! missing, null or empty; those all deserialize to their defaults.

use crate::error::{ChemkgError, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// Structured statements extracted from one source passage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    #[serde(default, deserialize_with = "chunk_id_from_any")]
    pub chunk_id: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub subtopic: Option<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub key_concepts: Vec<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub prerequisites: Vec<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub leads_to: Vec<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl ExtractionRecord {
    pub fn new(chunk_id: impl Into<String>) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            ..Default::default()
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_concepts<I, S>(mut self, concepts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_concepts = concepts.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_prerequisites<I, S>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prerequisites = prerequisites.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_leads_to<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leads_to = targets.into_iter().map(Into::into).collect();
        self
    }

    /// Parse a batch of records from a JSON array or JSON Lines text.
    pub fn parse_batch(text: &str) -> Result<Vec<ExtractionRecord>> {
        let trimmed = text.trim_start();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        if trimmed.starts_with('[') {
            return serde_json::from_str(trimmed).map_err(ChemkgError::from);
        }

        let mut records = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record = serde_json::from_str(line).map_err(|e| {
                ChemkgError::Serialization(format!("line {}: {}", line_no + 1, e))
            })?;
            records.push(record);
        }
        Ok(records)
    }
}

fn nullable_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Option<String>>> = Option::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default().into_iter().flatten().collect())
}

fn chunk_id_from_any<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    // Vector stores hand out integer point ids as often as strings.
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}
