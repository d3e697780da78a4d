//! Unified Error Type System
//!
//! Centralized error types for the analyst.
//! Model errors are classified so the provider chain can decide between
//! retrying, falling back to the next provider, or failing fast.
//!
//! ## Error Categories
//!
//! - **Transient**: Temporary issues that may resolve (retry)
//! - **RateLimit**: API rate limiting (wait and retry)
//! - **TokenLimit**: Context too large (fallback)
//! - **Auth**: Authentication failures (fail fast)
//! - **Network**: Connectivity issues (retry with backoff)
//! - **Unavailable**: Provider unavailable (fallback to next)
//!
//! Graph nodes never catch these: a failing model call propagates to the
//! caller of the graph, and only the report service retries whole attempts.

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Error categories for retry and fallback routing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited - wait then retry same provider
    RateLimit,
    /// Context/token limit exceeded - fallback
    TokenLimit,
    /// Authentication failed - fail fast, don't retry
    Auth,
    /// Network/connectivity issues - retry with backoff
    Network,
    /// Provider unavailable - fallback to next
    Unavailable,
    /// Invalid request - don't retry, fix request
    BadRequest,
    /// Parsing the model response failed - may succeed on retry
    ParseError,
    /// Temporary server issues - retry same provider
    Transient,
    /// Unknown error - conservative retry
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimit => "RATE_LIMIT",
            Self::TokenLimit => "TOKEN_LIMIT",
            Self::Auth => "AUTH",
            Self::Network => "NETWORK",
            Self::Unavailable => "UNAVAILABLE",
            Self::BadRequest => "BAD_REQUEST",
            Self::ParseError => "PARSE_ERROR",
            Self::Transient => "TRANSIENT",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Check if this category is retryable on the same provider
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Network | Self::Transient | Self::ParseError
        )
    }

    /// Check if this category should trigger fallback to next provider
    pub fn should_fallback(&self) -> bool {
        matches!(self, Self::TokenLimit | Self::Unavailable | Self::Auth)
    }

    /// Recommended retry delay for this category
    pub fn recommended_delay(&self) -> Duration {
        match self {
            Self::RateLimit => Duration::from_secs(30),
            Self::Network => Duration::from_secs(5),
            Self::Transient => Duration::from_secs(2),
            Self::ParseError => Duration::from_secs(1),
            _ => Duration::from_millis(500),
        }
    }
}

// =============================================================================
// LLM Error
// =============================================================================

/// Model-call error with category, provider and retry hint
#[derive(Debug, Clone)]
pub struct LlmError {
    pub category: ErrorCategory,
    pub message: String,
    pub provider: Option<String>,
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
            retry_after: None,
        }
    }

    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: Some(provider.into()),
            retry_after: None,
        }
    }

    /// Add suggested retry delay
    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }

    pub fn should_fallback(&self) -> bool {
        self.category.should_fallback()
    }

    pub fn recommended_delay(&self) -> Duration {
        self.retry_after
            .unwrap_or_else(|| self.category.recommended_delay())
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps raw provider failures onto an `ErrorCategory`
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an error message from any provider.
    ///
    /// Retryable categories carry their recommended delay as `retry_after`.
    pub fn classify(message: &str, provider: &str) -> LlmError {
        let category = Self::category_of(&message.to_lowercase());
        let err = LlmError::with_provider(category, message, provider);
        if category.is_retryable() {
            err.retry_after(category.recommended_delay())
        } else {
            err
        }
    }

    /// First matching rule wins
    fn category_of(lower: &str) -> ErrorCategory {
        let any = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if any(&["rate limit", "429", "too many requests", "quota exceeded"]) {
            ErrorCategory::RateLimit
        } else if (lower.contains("token") && any(&["limit", "exceed", "maximum"]))
            || any(&["context length", "too large"])
        {
            ErrorCategory::TokenLimit
        } else if any(&["401", "403", "api key", "unauthorized", "permission denied"]) {
            ErrorCategory::Auth
        } else if any(&["connection", "dns", "timeout", "timed out", "unreachable"]) {
            ErrorCategory::Network
        } else if any(&["503", "502", "service unavailable", "not found"]) {
            ErrorCategory::Unavailable
        } else if any(&["400", "bad request", "malformed"]) {
            ErrorCategory::BadRequest
        } else if any(&["parse", "json", "unexpected token"]) {
            ErrorCategory::ParseError
        } else if any(&["temporary", "overloaded", "500"]) {
            ErrorCategory::Transient
        } else {
            ErrorCategory::Unknown
        }
    }

    /// Classify an HTTP status code directly (more accurate than string matching)
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> LlmError {
        match status {
            429 => LlmError::with_provider(ErrorCategory::RateLimit, message, provider)
                .retry_after(Duration::from_secs(30)),
            401 | 403 => LlmError::with_provider(ErrorCategory::Auth, message, provider),
            400 => LlmError::with_provider(ErrorCategory::BadRequest, message, provider),
            500 | 502 | 503 | 504 => {
                LlmError::with_provider(ErrorCategory::Transient, message, provider)
                    .retry_after(Duration::from_secs(5))
            }
            404 => LlmError::with_provider(ErrorCategory::Unavailable, message, provider),
            _ => LlmError::with_provider(ErrorCategory::Unknown, message, provider),
        }
    }

    /// Classify an application error raised by a provider
    pub fn classify_error(err: &AnalystError, provider: &str) -> LlmError {
        match err {
            AnalystError::Llm(llm_err) => llm_err.clone(),
            AnalystError::LlmApi(msg) => Self::classify(msg, provider),
            AnalystError::Json(_) => {
                LlmError::with_provider(ErrorCategory::ParseError, err.to_string(), provider)
            }
            AnalystError::Config(_) => {
                LlmError::with_provider(ErrorCategory::BadRequest, err.to_string(), provider)
            }
            _ => LlmError::with_provider(ErrorCategory::Unknown, err.to_string(), provider),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Structured-output validation failure
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    /// Field that failed validation
    pub field: Option<String>,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(field) = &self.field {
            write!(f, "Validation failed for '{}': {}", field, self.message)
        } else {
            write!(f, "Validation failed: {}", self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: None,
            message: message.into(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Response did not match the requested schema
    Schema,
    /// Required field missing or blank
    MissingField,
    /// Value outside the allowed set
    Range,
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum AnalystError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Structured model error with category and retry hints
    #[error("LLM error: {0}")]
    Llm(LlmError),

    /// Plain model API error (classified lazily by the provider chain)
    #[error("LLM API error: {0}")]
    LlmApi(String),

    #[error("{0}")]
    Validation(ValidationError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Graph '{graph}' exceeded {limit} steps without reaching its end")]
    RecursionLimit { graph: String, limit: usize },

    #[error("Worker '{worker}' failed: {message}")]
    Worker { worker: String, message: String },

    #[error("Report generation failed for '{request}' after {attempts} attempts: {reason}")]
    ReportFailed {
        request: String,
        attempts: usize,
        reason: String,
    },
}

impl From<LlmError> for AnalystError {
    fn from(err: LlmError) -> Self {
        AnalystError::Llm(err)
    }
}

impl From<ValidationError> for AnalystError {
    fn from(err: ValidationError) -> Self {
        AnalystError::Validation(err)
    }
}

pub type Result<T> = std::result::Result<T, AnalystError>;

impl AnalystError {
    /// Create a worker error
    pub fn worker(worker: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Worker {
            worker: worker.into(),
            message: message.into(),
        }
    }

    /// Create a structured-output error for a specific field
    pub fn invalid_output(
        kind: ValidationErrorKind,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Validation(ValidationError::new(kind, message).with_field(field))
    }

    /// Check if this error is worth another attempt
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_retryable(),
            Self::Validation(_) | Self::Json(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorCategory::TokenLimit.to_string(), "TOKEN_LIMIT");
        assert_eq!(ErrorCategory::Auth.to_string(), "AUTH");
    }

    #[test]
    fn test_classify_rate_limit() {
        let err = ErrorClassifier::classify("Rate limit exceeded, please retry", "openai");
        assert_eq!(err.category, ErrorCategory::RateLimit);
        assert!(err.is_retryable());
        assert!(!err.should_fallback());
    }

    #[test]
    fn test_classify_token_limit() {
        let err = ErrorClassifier::classify("Token limit exceeded: 150000 > 128000", "openai");
        assert_eq!(err.category, ErrorCategory::TokenLimit);
        assert!(err.should_fallback());
    }

    #[test]
    fn test_classify_auth_falls_back() {
        let err = ErrorClassifier::classify("Invalid API key provided", "openai");
        assert_eq!(err.category, ErrorCategory::Auth);
        assert!(!err.is_retryable());
        assert!(err.should_fallback());
    }

    #[test]
    fn test_classify_network() {
        let err = ErrorClassifier::classify("Connection timed out after 30s", "ollama");
        assert_eq!(err.category, ErrorCategory::Network);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classify_unknown() {
        let err = ErrorClassifier::classify("Something weird happened", "test");
        assert_eq!(err.category, ErrorCategory::Unknown);
    }

    #[test]
    fn test_classify_http_status() {
        assert_eq!(
            ErrorClassifier::classify_http_status(429, "slow down", "t").category,
            ErrorCategory::RateLimit
        );
        assert_eq!(
            ErrorClassifier::classify_http_status(401, "nope", "t").category,
            ErrorCategory::Auth
        );
        assert_eq!(
            ErrorClassifier::classify_http_status(502, "gateway", "t").category,
            ErrorCategory::Transient
        );
    }

    #[test]
    fn test_validation_error_display() {
        let err = AnalystError::invalid_output(
            ValidationErrorKind::Range,
            "next_speaker",
            "not in roster",
        );
        assert_eq!(
            err.to_string(),
            "Validation failed for 'next_speaker': not in roster"
        );
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::with_provider(ErrorCategory::RateLimit, "Too many requests", "openai");
        assert_eq!(err.to_string(), "[openai:RATE_LIMIT] Too many requests");

        let err_no_provider = LlmError::new(ErrorCategory::Network, "Connection failed");
        assert_eq!(err_no_provider.to_string(), "[NETWORK] Connection failed");
    }
}
