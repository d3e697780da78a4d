//! Configuration Types
//!
//! All configuration structures with defaults taken from `crate::constants`.
//! Supports global (~/.config/kpi-analyst/) and project (.kpi-analyst/)
//! level configuration.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{editor, network, pipeline, research, worker};
use crate::types::{AnalystError, ReportRequest, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Task orchestrator limits
    pub research: ResearchConfig,

    /// Editorial supervisor limits
    pub editor: EditorConfig,

    /// Code-executing worker settings
    pub worker: WorkerConfig,

    /// Report driver settings
    pub pipeline: PipelineConfig,

    /// Delivery settings
    pub notification: NotificationConfig,

    /// Reports to generate on `run`
    pub requests: Vec<ReportRequest>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            research: ResearchConfig::default(),
            editor: EditorConfig::default(),
            worker: WorkerConfig::default(),
            pipeline: PipelineConfig::default(),
            notification: NotificationConfig::default(),
            requests: Vec::new(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `AnalystError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(AnalystError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(AnalystError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        let limits = [
            ("research.stall_count_limit", self.research.stall_count_limit),
            ("research.reset_count_limit", self.research.reset_count_limit),
            ("research.max_worker_turns", self.research.max_worker_turns),
            ("research.recursion_limit", self.research.recursion_limit),
            ("editor.max_writer_loops", self.editor.max_writer_loops),
            ("editor.max_visualization_loops", self.editor.max_visualization_loops),
            ("editor.max_supervisor_turns", self.editor.max_supervisor_turns),
            ("editor.recursion_limit", self.editor.recursion_limit),
            ("worker.max_iterations", self.worker.max_iterations),
            ("worker.max_errors", self.worker.max_errors),
            ("pipeline.max_attempts", self.pipeline.max_attempts),
        ];
        if let Some((name, _)) = limits.iter().find(|(_, value)| *value == 0) {
            return Err(AnalystError::Config(format!(
                "{} must be greater than 0",
                name
            )));
        }

        if self.worker.code_timeout_secs == 0 {
            return Err(AnalystError::Config(
                "worker.code_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if let Some(bad) = self
            .notification
            .recipients
            .iter()
            .chain(self.requests.iter().flat_map(|r| r.recipients.iter()))
            .find(|r| !r.contains('@'))
        {
            return Err(AnalystError::Config(format!(
                "Invalid recipient address '{}'",
                bad
            )));
        }

        for request in &self.requests {
            request.validate()?;
        }

        Ok(())
    }

    /// Date the reports are generated for
    pub fn analysis_date(&self) -> NaiveDate {
        self.pipeline
            .analysis_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "openai" or "ollama"
    pub provider: String,

    /// Model name
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Temperature for LLM generation (0.0 = deterministic, 1.0 = creative)
    pub temperature: f32,

    /// API key; falls back to the provider's env var. Never serialized.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Custom endpoint
    pub api_base: Option<String>,

    /// Maximum tokens to generate
    pub max_tokens: usize,

    /// Providers tried in order after the primary one fails
    pub fallbacks: Vec<FallbackConfig>,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("max_tokens", &self.max_tokens)
            .field("fallbacks", &self.fallbacks)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.0,
            api_key: None,
            api_base: None,
            max_tokens: network::DEFAULT_MAX_TOKENS,
            fallbacks: Vec::new(),
        }
    }
}

/// Additional provider in the fallback chain
///
/// Unset fields inherit from the primary `[llm]` section.
#[derive(Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for FallbackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// =============================================================================
// Graph Limits
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    pub stall_count_limit: usize,
    pub reset_count_limit: usize,
    pub max_worker_turns: usize,
    pub recursion_limit: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            stall_count_limit: research::STALL_COUNT_LIMIT,
            reset_count_limit: research::RESET_COUNT_LIMIT,
            max_worker_turns: research::MAX_WORKER_TURNS,
            recursion_limit: research::RECURSION_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub max_writer_loops: usize,
    pub max_visualization_loops: usize,
    pub max_supervisor_turns: usize,
    pub recursion_limit: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_writer_loops: editor::MAX_WRITER_LOOPS,
            max_visualization_loops: editor::MAX_VISUALIZATION_LOOPS,
            max_supervisor_turns: editor::MAX_SUPERVISOR_TURNS,
            recursion_limit: editor::RECURSION_LIMIT,
        }
    }
}

// =============================================================================
// Worker Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Let workers run the Python they write; plain model workers otherwise
    pub execute_code: bool,

    /// Interpreter used for code execution
    pub python: String,

    /// Model/tool rounds per worker run
    pub max_iterations: usize,

    /// Consecutive failed executions before the worker must answer
    pub max_errors: usize,

    /// Wall-clock limit per code execution
    pub code_timeout_secs: u64,

    /// Directory holding the source data extracts
    pub data_dir: Option<PathBuf>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            execute_code: true,
            python: "python3".to_string(),
            max_iterations: worker::MAX_ITERATIONS,
            max_errors: worker::MAX_ERRORS,
            code_timeout_secs: worker::CODE_TIMEOUT_SECS,
            data_dir: None,
        }
    }
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Attempts per report request
    pub max_attempts: usize,

    /// Constant delay between attempts
    pub retry_delay_secs: u64,

    /// Report date; today when unset
    pub analysis_date: Option<NaiveDate>,

    /// Root of the per-request artifact scopes
    pub temp_dir: PathBuf,

    /// Where finished reports are written
    pub outputs_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: pipeline::MAX_ATTEMPTS,
            retry_delay_secs: pipeline::RETRY_DELAY_SECS,
            analysis_date: None,
            temp_dir: std::env::temp_dir().join("kpi-analyst"),
            outputs_dir: PathBuf::from("outputs"),
        }
    }
}

// =============================================================================
// Notification Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Write one message file per delivery
    #[default]
    Outbox,
    /// Log deliveries only
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub sink: SinkKind,
    pub sender: String,
    pub recipients: Vec<String>,
    pub outbox_dir: PathBuf,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            sink: SinkKind::Outbox,
            sender: "kpi-analyst@localhost".to_string(),
            recipients: Vec::new(),
            outbox_dir: PathBuf::from("outbox"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Grouping, Period};

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.research.stall_count_limit, 3);
        assert_eq!(config.editor.max_writer_loops, 3);
        assert_eq!(config.editor.max_visualization_loops, 5);
    }

    #[test]
    fn test_rejects_bad_temperature() {
        let mut config = Config::default();
        config.llm.temperature = 2.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_limits() {
        let mut config = Config::default();
        config.editor.max_writer_loops = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("editor.max_writer_loops"));

        let mut config = Config::default();
        config.pipeline.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_requests_and_recipients() {
        let mut config = Config::default();
        let mut request = ReportRequest::grouped(Grouping::Country, "Spain", Period::Monthly);
        request.grouping_value = Some(String::new());
        config.requests.push(request);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.notification.recipients = vec!["not-an-address".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_redacted_and_not_serialized() {
        let mut config = LlmConfig::default();
        config.api_key = Some("sk-secret".to_string());
        assert!(!format!("{:?}", config).contains("sk-secret"));
        assert!(!toml::to_string(&config).unwrap().contains("sk-secret"));
    }

    #[test]
    fn test_analysis_date_override() {
        let mut config = Config::default();
        let date = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        config.pipeline.analysis_date = Some(date);
        assert_eq!(config.analysis_date(), date);
    }
}
