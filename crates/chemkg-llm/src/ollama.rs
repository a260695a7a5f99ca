//! Ollama backend for local inference.
//!
//! Requires the `local` feature and a running Ollama instance.

use crate::backend::{LlmBackend, LlmConfig, LlmError, LlmResult};
use crate::prompt::clean_response;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Ollama `/api/generate` request.
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

/// Ollama backend.
///
/// # Example
///
/// ```rust,ignore
/// use chemkg_llm::{LlmBackend, LlmConfig, OllamaBackend};
///
/// let backend = OllamaBackend::new(LlmConfig::ollama())?;
/// let answer = backend.complete("What is crystal field splitting?").await?;
/// ```
pub struct OllamaBackend {
    endpoint: String,
    config: LlmConfig,
    client: reqwest::Client,
}

impl OllamaBackend {
    /// Create a backend from config.
    pub fn new(config: LlmConfig) -> LlmResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::ConnectionFailed(format!("HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            config,
            client,
        })
    }

    /// Create with default localhost endpoint.
    pub fn localhost() -> LlmResult<Self> {
        Self::new(LlmConfig::ollama())
    }

    async fn request(&self, prompt: &str, json: bool) -> LlmResult<String> {
        let request = OllamaRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            format: json.then_some("json"),
            options: OllamaOptions {
                temperature: if json {
                    self.config.json_temperature
                } else {
                    self.config.temperature
                },
                num_predict: self.config.max_tokens,
            },
        };

        let url = format!("{}/api/generate", self.endpoint);
        tracing::debug!(model = %self.config.model, json, chars = prompt.len(), "ollama request");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 404 {
                return Err(LlmError::ModelNotFound(format!(
                    "Model '{}' not found. Run: ollama pull {}",
                    self.config.model, self.config.model
                )));
            }

            return Err(LlmError::ApiError(format!("Ollama error {}: {}", status, body)));
        }

        let resp: OllamaResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(clean_response(&resp.response))
    }

    fn map_transport(&self, e: reqwest::Error) -> LlmError {
        if e.is_connect() {
            LlmError::ConnectionFailed(format!(
                "Cannot connect to Ollama at {}. Is Ollama running?",
                self.endpoint
            ))
        } else if e.is_timeout() {
            LlmError::Timeout(self.config.timeout_secs)
        } else {
            LlmError::ApiError(e.to_string())
        }
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    fn config(&self) -> &LlmConfig {
        &self.config
    }

    async fn complete(&self, prompt: &str) -> LlmResult<String> {
        self.request(prompt, false).await
    }

    async fn complete_json(&self, prompt: &str) -> LlmResult<String> {
        self.request(prompt, true).await
    }

    async fn health_check(&self) -> LlmResult<bool> {
        let url = format!("{}/api/tags", self.endpoint);

        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}
