//! LLM Provider Abstraction
//!
//! Defines the LlmProvider trait for chat-style generation over a message
//! history. All providers return `LlmResponse` with token usage metrics.
//!
//! ## Modules
//!
//! - `chain`: Fallback provider chain with retries and category routing
//! - `openai`: OpenAI-compatible chat completions
//! - `ollama`: Local Ollama chat endpoint

mod chain;
mod ollama;
mod openai;
mod prompt_utils;

pub use chain::{ChainConfig, ChainedProvider, ProviderChain, ProviderChainBuilder};
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

// Re-export error types from centralized location
pub use crate::types::{ErrorCategory, ErrorClassifier, LlmError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::config::LlmConfig;
use crate::types::{AnalystError, Message, Result};

// =============================================================================
// LLM Response with Usage Metrics
// =============================================================================

/// Complete LLM response including content and usage metrics
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated content: `Value::String` for text replies, JSON for structured ones
    pub content: Value,
    /// Token usage metrics
    pub usage: TokenUsage,
    /// Response timing
    pub timing: ResponseTiming,
    /// Provider and model info
    pub metadata: ResponseMetadata,
}

impl LlmResponse {
    /// Create response with content only (usage unknown)
    pub fn content_only(content: Value) -> Self {
        Self {
            content,
            usage: TokenUsage::default(),
            timing: ResponseTiming::default(),
            metadata: ResponseMetadata::default(),
        }
    }

    /// Create full response with all metrics
    pub fn with_metrics(
        content: Value,
        usage: TokenUsage,
        timing: ResponseTiming,
        metadata: ResponseMetadata,
    ) -> Self {
        Self {
            content,
            usage,
            timing,
            metadata,
        }
    }

    /// Reply text; structured content is rendered as JSON
    pub fn text(&self) -> String {
        match &self.content {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Token usage metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens (prompt)
    pub input_tokens: u32,
    /// Output tokens (response)
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used (input + output)
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    /// Create from OpenAI-style usage response
    pub fn from_openai(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            input_tokens: prompt_tokens,
            output_tokens: completion_tokens,
        }
    }

    /// Create from Ollama-style usage response
    pub fn from_ollama(prompt_eval_count: u32, eval_count: u32) -> Self {
        Self {
            input_tokens: prompt_eval_count,
            output_tokens: eval_count,
        }
    }
}

/// Response timing metrics
#[derive(Debug, Clone, Default)]
pub struct ResponseTiming {
    /// Total response time in milliseconds (wall clock)
    pub total_ms: u64,
}

impl ResponseTiming {
    pub fn from_duration(duration: std::time::Duration) -> Self {
        Self {
            total_ms: duration.as_millis() as u64,
        }
    }
}

/// Response metadata
#[derive(Debug, Clone, Default)]
pub struct ResponseMetadata {
    pub model: String,
    pub provider: String,
}

/// Shared LLM provider type
pub type SharedProvider = Arc<dyn LlmProvider + Send + Sync>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for a single LLM provider
///
/// API keys are never serialized and are redacted in debug output. Each
/// provider converts the key to `SecretString` internally.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider type: "openai" or "ollama"
    pub provider: String,
    /// Model name (provider-specific)
    pub model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    pub temperature: f32,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    pub max_tokens: usize,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::from(&LlmConfig::default())
    }
}

impl From<&LlmConfig> for ProviderConfig {
    fn from(llm: &LlmConfig) -> Self {
        Self {
            provider: llm.provider.clone(),
            model: Some(llm.model.clone()),
            timeout_secs: llm.timeout_secs,
            temperature: llm.temperature,
            api_key: llm.api_key.clone(),
            api_base: llm.api_base.clone(),
            max_tokens: llm.max_tokens,
        }
    }
}

impl ProviderConfig {
    /// Primary provider followed by the configured fallbacks
    pub fn chain_from(llm: &LlmConfig) -> Vec<Self> {
        let primary = Self::from(llm);
        let mut configs = vec![primary.clone()];

        for fallback in &llm.fallbacks {
            let config = Self {
                provider: fallback.provider.clone(),
                model: fallback.model.clone().or_else(|| {
                    // A different provider does not understand the primary's model name
                    (fallback.provider == primary.provider)
                        .then(|| primary.model.clone())
                        .flatten()
                }),
                api_key: fallback.api_key.clone(),
                api_base: fallback.api_base.clone(),
                ..primary.clone()
            };

            // Only add fallback if it's different from primary
            if config.provider != primary.provider || config.model != primary.model {
                configs.push(config);
            }
        }

        configs
    }
}

// =============================================================================
// LLM Provider Trait
// =============================================================================

/// Chat model provider
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a reply to `messages`.
    ///
    /// With a schema, the reply is a JSON value that the caller decodes;
    /// without one it is `Value::String`.
    async fn generate(&self, messages: &[Message], schema: Option<&Value>)
    -> Result<LlmResponse>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;

    /// Check if the provider is available
    async fn health_check(&self) -> Result<bool>;
}

/// Create a shared provider from configuration
pub fn create_provider(config: &ProviderConfig) -> Result<SharedProvider> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config.clone())?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config.clone())?)),
        _ => Err(AnalystError::Config(format!(
            "Unknown provider: {}. Supported: openai, ollama",
            config.provider
        ))),
    }
}

/// Create the configured provider, wrapped in a chain when fallbacks exist
pub fn create_provider_chain(llm: &LlmConfig) -> Result<SharedProvider> {
    let configs = ProviderConfig::chain_from(llm);
    if configs.len() == 1 {
        return create_provider(&configs[0]);
    }

    let mut builder = ProviderChainBuilder::new();
    for config in &configs {
        builder = builder.add_shared(create_provider(config)?);
    }
    let chain = builder.build();

    info!(
        providers = configs.len(),
        "Provider chain: {}",
        configs
            .iter()
            .map(|c| c.provider.as_str())
            .collect::<Vec<_>>()
            .join(" → ")
    );
    Ok(Arc::new(chain))
}
