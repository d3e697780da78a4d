//! Fallback Provider Chain
//!
//! Cascading provider attempts with error-category routing.
//!
//! ## Strategy
//!
//! 1. Try the provider, up to its retry budget
//! 2. On failure, classify the error
//! 3. Rate limits wait for the hinted delay, transient and network errors
//!    back off exponentially with random jitter
//! 4. Auth, token-limit and unavailable errors move on to the next provider
//! 5. Bad requests stop the chain: no provider will accept them
//! 6. Continue until success, exhaustion, or the global attempt cap

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::constants::chain as chain_constants;

use super::{LlmProvider, LlmResponse, SharedProvider};
use crate::types::{AnalystError, ErrorCategory, ErrorClassifier, Message, Result};

/// Provider with its retry budget
#[derive(Clone)]
pub struct ChainedProvider {
    pub provider: SharedProvider,
    pub max_retries: u8,
}

impl ChainedProvider {
    pub fn new(provider: SharedProvider) -> Self {
        Self {
            provider,
            max_retries: chain_constants::DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }
}

/// Configuration for the provider chain
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Maximum total attempts across all providers
    pub max_total_attempts: usize,
    /// Base delay for exponential backoff
    pub base_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    pub backoff_factor: f32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_total_attempts: chain_constants::MAX_TOTAL_ATTEMPTS,
            base_delay: Duration::from_millis(chain_constants::BASE_DELAY_MS),
            max_delay: Duration::from_secs(chain_constants::MAX_DELAY_SECS),
            backoff_factor: chain_constants::BACKOFF_FACTOR,
        }
    }
}

/// Execution statistics for the chain
#[derive(Debug, Default)]
pub struct ChainStats {
    pub total_attempts: usize,
    pub successful_provider: Option<String>,
    pub failures: Vec<(String, ErrorCategory)>,
    pub total_duration_ms: u64,
}

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NextStep {
    Retry(Duration),
    NextProvider,
    Stop,
}

/// Fallback provider chain
#[derive(Clone)]
pub struct ProviderChain {
    providers: Vec<ChainedProvider>,
    config: ChainConfig,
}

impl ProviderChain {
    pub fn new(config: ChainConfig) -> Self {
        Self {
            providers: Vec::new(),
            config,
        }
    }

    /// Execute with fallback chain
    #[instrument(skip(self, messages, schema), fields(providers = self.providers.len()))]
    pub async fn execute(
        &self,
        messages: &[Message],
        schema: Option<&Value>,
    ) -> Result<(LlmResponse, ChainStats)> {
        let mut stats = ChainStats::default();
        let start_time = Instant::now();

        if self.providers.is_empty() {
            return Err(AnalystError::Config(
                "No providers configured in chain".to_string(),
            ));
        }

        let mut last_error: Option<AnalystError> = None;

        'providers: for entry in &self.providers {
            let provider_name = entry.provider.name().to_string();
            let mut current_delay = self.config.base_delay;

            for attempt in 1..=entry.max_retries {
                if stats.total_attempts >= self.config.max_total_attempts {
                    break 'providers;
                }
                stats.total_attempts += 1;

                debug!(
                    total_attempt = stats.total_attempts,
                    provider = %provider_name,
                    attempt,
                    "Chain attempt"
                );

                let err = match entry.provider.generate(messages, schema).await {
                    Ok(response) => {
                        stats.successful_provider = Some(provider_name.clone());
                        stats.total_duration_ms = start_time.elapsed().as_millis() as u64;
                        if stats.total_attempts > 1 {
                            info!(
                                provider = %provider_name,
                                attempts = stats.total_attempts,
                                "Chain succeeded after failures"
                            );
                        }
                        return Ok((response, stats));
                    }
                    Err(err) => err,
                };

                let classified = ErrorClassifier::classify_error(&err, &provider_name);
                stats
                    .failures
                    .push((provider_name.clone(), classified.category));

                warn!(
                    provider = %provider_name,
                    attempt,
                    error = %err,
                    category = %classified.category,
                    "Provider failed"
                );
                last_error = Some(err);

                let is_last_try = attempt >= entry.max_retries;
                match self.next_step(classified.category, classified.retry_after, current_delay, is_last_try) {
                    NextStep::Retry(wait) => {
                        debug!(wait_ms = wait.as_millis() as u64, "Retrying after backoff");
                        sleep(wait).await;
                        current_delay = calculate_backoff(
                            current_delay,
                            self.config.backoff_factor,
                            self.config.max_delay,
                        );
                    }
                    NextStep::NextProvider => {
                        info!(provider = %provider_name, category = %classified.category, "Trying next provider");
                        continue 'providers;
                    }
                    NextStep::Stop => {
                        warn!("Bad request error, stopping chain");
                        break 'providers;
                    }
                }
            }
        }

        stats.total_duration_ms = start_time.elapsed().as_millis() as u64;

        Err(last_error
            .unwrap_or_else(|| AnalystError::LlmApi("All providers in chain failed".to_string())))
    }

    fn next_step(
        &self,
        category: ErrorCategory,
        retry_after: Option<Duration>,
        current_delay: Duration,
        is_last_try: bool,
    ) -> NextStep {
        match category {
            ErrorCategory::BadRequest => NextStep::Stop,
            ErrorCategory::Auth | ErrorCategory::TokenLimit | ErrorCategory::Unavailable => {
                NextStep::NextProvider
            }
            _ if is_last_try => NextStep::NextProvider,
            ErrorCategory::RateLimit => {
                NextStep::Retry(retry_after.unwrap_or(self.config.max_delay))
            }
            ErrorCategory::Network | ErrorCategory::Transient => {
                NextStep::Retry(current_delay + random_jitter(current_delay))
            }
            ErrorCategory::ParseError => {
                NextStep::Retry(retry_after.unwrap_or(self.config.base_delay))
            }
            ErrorCategory::Unknown => NextStep::Retry(current_delay),
        }
    }
}

#[async_trait]
impl LlmProvider for ProviderChain {
    async fn generate(
        &self,
        messages: &[Message],
        schema: Option<&Value>,
    ) -> Result<LlmResponse> {
        let (response, _stats) = self.execute(messages, schema).await?;
        Ok(response)
    }

    fn name(&self) -> &str {
        "provider-chain"
    }

    fn model(&self) -> &str {
        self.providers
            .first()
            .map(|p| p.provider.model())
            .unwrap_or("unknown")
    }

    async fn health_check(&self) -> Result<bool> {
        for entry in &self.providers {
            if entry.provider.health_check().await.unwrap_or(false) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Random jitter of up to a quarter of the base delay
fn random_jitter(base_delay: Duration) -> Duration {
    let max_jitter_ms = (base_delay.as_millis() as u64) / 4;
    if max_jitter_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..max_jitter_ms))
}

/// Exponential backoff with cap
fn calculate_backoff(current: Duration, factor: f32, max: Duration) -> Duration {
    let next = Duration::from_secs_f32(current.as_secs_f32() * factor);
    std::cmp::min(next, max)
}

/// Builder for creating provider chains
pub struct ProviderChainBuilder {
    providers: Vec<ChainedProvider>,
    config: ChainConfig,
}

impl ProviderChainBuilder {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            config: ChainConfig::default(),
        }
    }

    pub fn add_provider(self, provider: impl LlmProvider + 'static) -> Self {
        self.add_shared(Arc::new(provider))
    }

    pub fn add_shared(mut self, provider: SharedProvider) -> Self {
        self.providers.push(ChainedProvider::new(provider));
        self
    }

    pub fn add_with_config(mut self, provider: ChainedProvider) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_config(mut self, config: ChainConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> ProviderChain {
        ProviderChain {
            providers: self.providers,
            config: self.config,
        }
    }
}

impl Default for ProviderChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct MockProvider {
        name: String,
        error: Option<String>,
        calls: AtomicU32,
        max_failures: u32,
    }

    impl MockProvider {
        fn healthy(name: &str) -> Self {
            Self {
                name: name.to_string(),
                error: None,
                calls: AtomicU32::new(0),
                max_failures: 0,
            }
        }

        fn failing(name: &str, error: &str, failures: u32) -> Self {
            Self {
                name: name.to_string(),
                error: Some(error.to_string()),
                calls: AtomicU32::new(0),
                max_failures: failures,
            }
        }
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        async fn generate(
            &self,
            _messages: &[Message],
            _schema: Option<&Value>,
        ) -> Result<LlmResponse> {
            let count = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = &self.error
                && count < self.max_failures
            {
                return Err(AnalystError::LlmApi(error.clone()));
            }
            Ok(LlmResponse::content_only(
                serde_json::json!({"provider": self.name}),
            ))
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn model(&self) -> &str {
            "mock-model"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(self.error.is_none())
        }
    }

    fn fast_config() -> ChainConfig {
        ChainConfig {
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            ..Default::default()
        }
    }

    fn prompt() -> Vec<Message> {
        vec![Message::human("test")]
    }

    #[tokio::test]
    async fn test_chain_success_first_provider() {
        let chain = ProviderChainBuilder::new()
            .add_provider(MockProvider::healthy("primary"))
            .add_provider(MockProvider::healthy("fallback"))
            .build();

        let response = chain.generate(&prompt(), None).await.unwrap();
        assert_eq!(response.content["provider"], "primary");
    }

    #[tokio::test]
    async fn test_chain_fallback_on_auth_error() {
        let chain = ProviderChainBuilder::new()
            .add_provider(MockProvider::failing("primary", "401 unauthorized", 100))
            .add_provider(MockProvider::healthy("fallback"))
            .with_config(fast_config())
            .build();

        let (response, stats) = chain.execute(&prompt(), None).await.unwrap();
        assert_eq!(response.content["provider"], "fallback");
        // Auth errors are not retried on the same provider
        assert_eq!(stats.total_attempts, 2);
        assert_eq!(stats.failures[0].1, ErrorCategory::Auth);
    }

    #[tokio::test]
    async fn test_chain_retry_then_success() {
        let chain = ProviderChainBuilder::new()
            .add_provider(MockProvider::failing("flaky", "500 server overloaded", 2))
            .with_config(fast_config())
            .build();

        let (response, stats) = chain.execute(&prompt(), None).await.unwrap();
        assert_eq!(response.content["provider"], "flaky");
        assert_eq!(stats.total_attempts, 3);
    }

    #[tokio::test]
    async fn test_bad_request_stops_chain() {
        let chain = ProviderChainBuilder::new()
            .add_provider(MockProvider::failing("primary", "400 bad request", 100))
            .add_provider(MockProvider::healthy("fallback"))
            .with_config(fast_config())
            .build();

        assert!(chain.execute(&prompt(), None).await.is_err());
    }

    #[tokio::test]
    async fn test_total_attempt_cap() {
        let chain = ProviderChainBuilder::new()
            .add_with_config(
                ChainedProvider::new(Arc::new(MockProvider::failing("a", "weird", 100)))
                    .with_max_retries(10),
            )
            .with_config(ChainConfig {
                max_total_attempts: 4,
                ..fast_config()
            })
            .build();

        let err = chain.execute(&prompt(), None).await.unwrap_err();
        assert!(err.to_string().contains("weird"));
    }

    #[test]
    fn test_random_jitter() {
        let jitter = random_jitter(Duration::from_millis(1000));
        assert!(jitter <= Duration::from_millis(250));
        assert_eq!(random_jitter(Duration::from_millis(2)), Duration::ZERO);
    }

    #[test]
    fn test_calculate_backoff() {
        let next = calculate_backoff(Duration::from_millis(500), 1.5, Duration::from_secs(30));
        assert_eq!(next, Duration::from_millis(750));

        let capped = calculate_backoff(Duration::from_secs(25), 1.5, Duration::from_secs(30));
        assert_eq!(capped, Duration::from_secs(30));
    }
}
