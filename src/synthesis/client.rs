//! Ollama chat client used as the answer synthesizer
//!
//! Built once at startup with [`OllamaSynthesizer::connect`], which checks
//! that the server answers before any question is accepted.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cli::config::OllamaConfig;
use crate::synthesis::types::{
    ChatMessage, ChatOptions, ChatRequest, ChatResponse, ErrorResponse, TagsResponse,
};
use crate::synthesis::{SynthesisError, SynthesisRequest, Synthesizer};

/// Timeout for the startup health check
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Long-lived Ollama chat client
#[derive(Debug, Clone)]
pub struct OllamaSynthesizer {
    client: Client,
    base_url: String,
    model: String,
    options: ChatOptions,
}

impl OllamaSynthesizer {
    /// Build a client without contacting the server
    pub fn new(base_url: &str, config: &OllamaConfig) -> Result<Self, SynthesisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SynthesisError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            options: ChatOptions {
                temperature: config.temperature,
                num_predict: config.num_predict,
            },
        })
    }

    /// Build a client and verify the server is reachable
    ///
    /// A missing model is only logged: the first question will then carry
    /// a "pull the model" message instead of failing the whole service.
    pub async fn connect(base_url: &str, config: &OllamaConfig) -> Result<Self, SynthesisError> {
        let synthesizer = Self::new(base_url, config)?;
        let models = synthesizer.list_models().await?;

        if synthesizer.has_model(&models) {
            info!(model = %synthesizer.model, url = %synthesizer.base_url, "connected to Ollama");
        } else {
            warn!(
                model = %synthesizer.model,
                available = ?models,
                "model not found in Ollama; run `ollama pull {}`",
                synthesizer.model
            );
        }

        Ok(synthesizer)
    }

    /// List installed model names via GET /api/tags
    pub async fn list_models(&self) -> Result<Vec<String>, SynthesisError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(CONNECT_TIMEOUT)
            .send()
            .await
            .map_err(|e| SynthesisError::Unavailable(format!("Failed to connect to Ollama: {}", e)))?;

        if !response.status().is_success() {
            return Err(SynthesisError::Unavailable(format!(
                "Ollama API error: {}",
                response.status()
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::Unavailable(format!("Failed to parse response: {}", e)))?;

        Ok(tags.models.iter().map(|m| m.label().to_string()).collect())
    }

    /// Whether the configured model (or its `:latest` tag) is installed
    pub fn has_model(&self, installed: &[String]) -> bool {
        let latest = format!("{}:latest", self.model);
        installed.iter().any(|m| *m == self.model || *m == latest)
    }

    /// Get current model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn generation_error(&self, detail: &str) -> SynthesisError {
        let lower = detail.to_lowercase();
        if lower.contains("model") && lower.contains("not found") {
            return SynthesisError::Generation(format!(
                "Error: Model '{}' not found. Please pull the model first: ollama pull {}",
                self.model, self.model
            ));
        }
        SynthesisError::Generation(format!("Error generating answer: {}", detail))
    }
}

#[async_trait]
impl Synthesizer for OllamaSynthesizer {
    fn name(&self) -> &str {
        &self.model
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<String, SynthesisError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(request.system.clone()),
                ChatMessage::user(request.user.clone()),
            ],
            stream: false,
            options: self.options.clone(),
        };

        debug!(model = %self.model, prompt_chars = request.user.len(), "sending chat request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.generation_error(&e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error)
                .unwrap_or_else(|_| format!("HTTP {}: {}", status, text));
            return Err(self.generation_error(&detail));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.generation_error(&format!("Failed to parse response: {}", e)))?;

        Ok(chat.message.content.trim().to_string())
    }
}
