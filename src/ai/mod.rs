//! AI Integration Layer
//!
//! Model providers, the invocation client used by the graphs, prompt
//! rendering, structured-output validation and usage metrics.

pub mod client;
pub mod metrics;
pub mod prompt;
pub mod provider;
pub mod validation;

pub use client::ModelClient;
pub use metrics::{MetricsCollector, MetricsSummary, NodeMetrics, SharedMetrics, create_shared_metrics};
pub use prompt::{PromptBuilder, PromptSection, RenderedPrompt};
pub use provider::{
    ChainConfig, ChainedProvider, LlmProvider, LlmResponse, OllamaProvider, OpenAiProvider,
    ProviderChain, ProviderChainBuilder, ProviderConfig, ResponseMetadata, ResponseTiming,
    SharedProvider, TokenUsage, create_provider, create_provider_chain,
};
pub use validation::{JsonRepairer, decode_structured, extract_json_from_response};
