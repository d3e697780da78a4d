//! Workers
//!
//! A worker runs one bounded task against a model and reports the final text
//! together with the artifact files that text mentions. The graphs never see
//! what happens inside a worker; they only observe a [`WorkerOutput`].
//!
//! ## Implementations
//!
//! - [`LlmWorker`]: a role prompt plus a single model call
//! - [`CodeWorker`]: lets the model write Python, runs it in the request
//!   scope and feeds the output back until the model answers
//!
//! Workers are built per orchestrator run and injected through a
//! [`WorkerSet`]; there are no process-wide instances.

mod code;
mod llm;
pub mod prompts;

pub use code::CodeWorker;
pub use llm::LlmWorker;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use super::artifacts::ArtifactScope;
use super::team::WorkerId;
use crate::ai::ModelClient;
use crate::config::WorkerConfig;
use crate::types::{AnalystError, Message, Result};

// =============================================================================
// Worker Output
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Success,
    Error,
}

/// Final result of one worker run
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerOutput {
    pub content: String,
    pub artifacts: Vec<PathBuf>,
    pub status: WorkerStatus,
}

impl WorkerOutput {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            artifacts: Vec::new(),
            status: WorkerStatus::Success,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            artifacts: Vec::new(),
            status: WorkerStatus::Error,
        }
    }

    pub fn with_artifacts(mut self, artifacts: Vec<PathBuf>) -> Self {
        self.artifacts = artifacts;
        self
    }

    pub fn is_invalid(&self) -> bool {
        is_invalid_worker_result(self.status, &self.content)
    }

    /// Conversation turn carrying this output, tagged with the worker name
    pub fn to_message(&self, id: WorkerId) -> Message {
        Message::assistant(self.content.clone())
            .named(id.as_str())
            .with_attachments(self.artifacts.iter().cloned())
    }
}

/// Whether a worker or tool result signals trouble.
///
/// An error status, empty content, or the literal markers `Error` /
/// `Exception` in the content all count. Invalid results are fed back into
/// the conversation; they never abort a run.
pub fn is_invalid_worker_result(status: WorkerStatus, content: &str) -> bool {
    if status == WorkerStatus::Error {
        debug!("Worker result has error status");
        return true;
    }
    if content.is_empty() {
        debug!("Worker result is empty");
        return true;
    }
    if content.contains("Error") || content.contains("Exception") {
        debug!("Worker result mentions an error");
        return true;
    }
    false
}

// =============================================================================
// Worker Trait
// =============================================================================

#[async_trait]
pub trait Worker: Send + Sync {
    fn id(&self) -> WorkerId;

    /// Run one bounded task over `messages`
    async fn run(&self, messages: &[Message]) -> Result<WorkerOutput>;
}

pub type SharedWorker = Arc<dyn Worker>;

// =============================================================================
// Worker Set
// =============================================================================

/// Worker instances of one orchestrator run, keyed by id
#[derive(Clone, Default)]
pub struct WorkerSet {
    workers: BTreeMap<WorkerId, SharedWorker>,
}

impl std::fmt::Debug for WorkerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerSet")
            .field("workers", &self.workers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl WorkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a worker, replacing any previous one with the same id
    pub fn with(mut self, worker: SharedWorker) -> Self {
        self.workers.insert(worker.id(), worker);
        self
    }

    /// Default workers for one report request.
    ///
    /// Workers execute code when `config.execute_code` is set and answer
    /// from the model alone otherwise.
    pub fn standard(config: &WorkerConfig, client: &ModelClient, scope: &ArtifactScope) -> Self {
        WorkerId::ALL.into_iter().fold(Self::new(), |set, id| {
            let prompt = prompts::system_prompt(id, scope, config);
            let worker: SharedWorker = if config.execute_code {
                Arc::new(CodeWorker::new(id, prompt, client.clone(), scope.clone(), config))
            } else {
                Arc::new(LlmWorker::new(id, prompt, client.clone(), scope.clone()))
            };
            set.with(worker)
        })
    }

    pub fn get(&self, id: WorkerId) -> Result<&SharedWorker> {
        self.workers
            .get(&id)
            .ok_or_else(|| AnalystError::worker(id.as_str(), "no worker registered"))
    }

    pub fn ids(&self) -> impl Iterator<Item = WorkerId> + '_ {
        self.workers.keys().copied()
    }
}

/// Graph node name used for metrics attribution
pub(crate) fn node_name(id: WorkerId) -> String {
    format!("worker.{}", id)
}
