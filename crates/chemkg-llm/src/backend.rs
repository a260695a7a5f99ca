//! Core text-generation backend trait.

use async_trait::async_trait;
use std::sync::Mutex;
use thiserror::Error;

/// Text-generation errors.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Parsing failed: {reason}")]
    ParseError { reason: String, raw: String },

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LlmError {
    /// Unparseable output, keeping the raw text.
    pub fn parse(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        LlmError::ParseError {
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    /// Raw model output for parse failures.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            LlmError::ParseError { raw, .. } => Some(raw),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LlmError::Timeout(_))
    }
}

/// Result type for text-generation operations.
pub type LlmResult<T> = Result<T, LlmError>;

/// Configuration for text-generation requests.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    /// Base URL of the generation service.
    pub endpoint: String,
    /// Model name/identifier.
    pub model: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Temperature for free-text answers.
    pub temperature: f32,
    /// Temperature for structured (JSON) output.
    pub json_temperature: f32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::ollama()
    }
}

impl LlmConfig {
    /// Local Ollama defaults.
    pub fn ollama() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "qwen3:latest".to_string(),
            max_tokens: 1024,
            temperature: 0.3,
            json_temperature: 0.1,
            timeout_secs: 120,
        }
    }

    /// Set the endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set max tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Core trait for text-generation backends.
///
/// Backends only move text. Prompt construction lives in [`crate::prompt`]
/// and parsing of structured output in [`crate::types`].
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Get the backend name.
    fn name(&self) -> &str;

    /// Get the current configuration.
    fn config(&self) -> &LlmConfig;

    /// Generate a free-text completion for a prompt.
    async fn complete(&self, prompt: &str) -> LlmResult<String>;

    /// Generate a completion constrained to JSON output.
    async fn complete_json(&self, prompt: &str) -> LlmResult<String> {
        self.complete(prompt).await
    }

    /// Check if the backend is available.
    async fn health_check(&self) -> LlmResult<bool> {
        match self.complete("ping").await {
            Ok(_) => Ok(true),
            Err(LlmError::ConnectionFailed(_)) | Err(LlmError::Timeout(_)) => Ok(false),
            Err(_) => Ok(true),
        }
    }
}

/// A deterministic backend for tests.
///
/// Responses are matched by substring in insertion order; the first match
/// wins. Patterns registered with [`MockBackend::fail_on`] are checked
/// first and produce a connection failure.
pub struct MockBackend {
    config: LlmConfig,
    responses: Vec<(String, String)>,
    failures: Vec<String>,
    fallback: String,
    prompts: Mutex<Vec<String>>,
}

impl MockBackend {
    /// Create a new mock backend.
    pub fn new() -> Self {
        Self {
            config: LlmConfig::default(),
            responses: Vec::new(),
            failures: Vec::new(),
            fallback: "Mock response".to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Add a canned response for a prompt pattern.
    pub fn with_response(mut self, pattern: &str, response: &str) -> Self {
        self.responses.push((pattern.to_string(), response.to_string()));
        self
    }

    /// Fail every prompt containing `pattern`.
    pub fn fail_on(mut self, pattern: &str) -> Self {
        self.failures.push(pattern.to_string());
        self
    }

    /// Response used when nothing matches.
    pub fn with_fallback(mut self, response: &str) -> Self {
        self.fallback = response.to_string();
        self
    }

    /// Every prompt seen so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn config(&self) -> &LlmConfig {
        &self.config
    }

    async fn complete(&self, prompt: &str) -> LlmResult<String> {
        if let Ok(mut seen) = self.prompts.lock() {
            seen.push(prompt.to_string());
        }
        if self.failures.iter().any(|p| prompt.contains(p.as_str())) {
            return Err(LlmError::ConnectionFailed("mock backend refused prompt".to_string()));
        }
        let response = self
            .responses
            .iter()
            .find(|(pattern, _)| prompt.contains(pattern.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| self.fallback.clone());
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_backend() {
        let backend = MockBackend::new().with_response("test", "Test response");

        let response = backend.complete("This is a test").await.unwrap();
        assert_eq!(response, "Test response");
        assert_eq!(backend.complete("other").await.unwrap(), "Mock response");
        assert_eq!(backend.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_first_pattern_wins() {
        let backend = MockBackend::new()
            .with_response("orbital", "first")
            .with_response("orbital theory", "second");
        assert_eq!(backend.complete("orbital theory").await.unwrap(), "first");
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let backend = MockBackend::new()
            .with_response("ligand", "ok")
            .fail_on("ligand field");
        let err = backend.complete("explain ligand field splitting").await.unwrap_err();
        assert!(matches!(err, LlmError::ConnectionFailed(_)));
        assert!(backend.health_check().await.unwrap());

        let down = MockBackend::new().fail_on("ping");
        assert!(!down.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_json_defaults_to_complete() {
        let backend = MockBackend::new().with_response("Decompose", "{}");
        assert_eq!(backend.complete_json("Decompose this").await.unwrap(), "{}");
    }

    #[test]
    fn test_config_builders() {
        let config = LlmConfig::ollama().with_model("llama3.2").with_timeout(30);
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(LlmConfig::default().endpoint, "http://localhost:11434");
        assert_eq!(config.with_temperature(5.0).temperature, 2.0);
    }

    #[test]
    fn test_parse_error_keeps_raw() {
        let err = LlmError::parse("expected object", "not json");
        assert_eq!(err.raw_response(), Some("not json"));
        assert_eq!(err.to_string(), "Parsing failed: expected object");
    }
}
