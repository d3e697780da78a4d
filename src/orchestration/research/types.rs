use std::collections::BTreeMap;

use crate::config::ResearchConfig;
use crate::constants::research;
use crate::orchestration::ledger::ProgressLedger;
use crate::orchestration::team::WorkerId;
use crate::types::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchNode {
    CreateOrUpdateTaskLedger,
    CreateOrUpdateTaskPlan,
    UpdateProgressLedger,
    EvaluateProgressLedger,
    Worker(WorkerId),
    SummarizeFindings,
}

impl std::fmt::Display for ResearchNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateOrUpdateTaskLedger => write!(f, "create_or_update_task_ledger"),
            Self::CreateOrUpdateTaskPlan => write!(f, "create_or_update_task_plan"),
            Self::UpdateProgressLedger => write!(f, "update_progress_ledger"),
            Self::EvaluateProgressLedger => write!(f, "evaluate_progress_ledger"),
            Self::Worker(id) => write!(f, "{}", id),
            Self::SummarizeFindings => write!(f, "summarize_findings"),
        }
    }
}

/// Counter ceilings of one research run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResearchLimits {
    pub stall_count_limit: usize,
    pub reset_count_limit: usize,
    pub max_worker_turns: usize,
}

impl Default for ResearchLimits {
    fn default() -> Self {
        Self {
            stall_count_limit: research::STALL_COUNT_LIMIT,
            reset_count_limit: research::RESET_COUNT_LIMIT,
            max_worker_turns: research::MAX_WORKER_TURNS,
        }
    }
}

impl From<&ResearchConfig> for ResearchLimits {
    fn from(config: &ResearchConfig) -> Self {
        Self {
            stall_count_limit: config.stall_count_limit,
            reset_count_limit: config.reset_count_limit,
            max_worker_turns: config.max_worker_turns,
        }
    }
}

/// Conversation state of one research run
#[derive(Debug, Clone)]
pub struct ResearchState {
    pub task: String,
    /// Main conversation, append-only
    pub messages: Vec<Message>,
    /// Narrow per-worker conversations, seeded with the task on first dispatch
    pub worker_contexts: BTreeMap<WorkerId, Vec<Message>>,
    pub task_facts: String,
    pub task_plan: String,
    pub progress_ledger: Option<ProgressLedger>,
    pub stall_count: usize,
    pub reset_count: usize,
    pub worker_turns: usize,
    pub limits: ResearchLimits,
    /// Final answer, set only by the summary step
    pub task_output: String,
}

impl ResearchState {
    pub fn new(task: impl Into<String>, limits: ResearchLimits) -> Self {
        Self {
            task: task.into(),
            messages: Vec::new(),
            worker_contexts: BTreeMap::new(),
            task_facts: String::new(),
            task_plan: String::new(),
            progress_ledger: None,
            stall_count: 0,
            reset_count: 0,
            worker_turns: 0,
            limits,
            task_output: String::new(),
        }
    }

    /// Context handed to `id`; starts from the task alone
    pub fn worker_context(&self, id: WorkerId) -> Vec<Message> {
        self.worker_contexts
            .get(&id)
            .cloned()
            .unwrap_or_else(|| vec![Message::human(self.task.clone())])
    }
}

/// Partial update returned by a research node.
///
/// `messages` are appended; `Some` fields replace the current value.
#[derive(Debug, Clone, Default)]
pub struct ResearchUpdate {
    pub messages: Vec<Message>,
    /// Full replacement of one worker's context
    pub worker_context: Option<(WorkerId, Vec<Message>)>,
    pub task_facts: Option<String>,
    pub task_plan: Option<String>,
    pub progress_ledger: Option<ProgressLedger>,
    pub stall_count: Option<usize>,
    pub reset_count: Option<usize>,
    pub worker_turns: Option<usize>,
    pub task_output: Option<String>,
}

impl ResearchState {
    pub(super) fn merge(mut self, update: ResearchUpdate) -> Self {
        self.messages.extend(update.messages);
        if let Some((id, context)) = update.worker_context {
            self.worker_contexts.insert(id, context);
        }
        if let Some(facts) = update.task_facts {
            self.task_facts = facts;
        }
        if let Some(plan) = update.task_plan {
            self.task_plan = plan;
        }
        if let Some(ledger) = update.progress_ledger {
            self.progress_ledger = Some(ledger);
        }
        if let Some(count) = update.stall_count {
            self.stall_count = count;
        }
        if let Some(count) = update.reset_count {
            self.reset_count = count;
        }
        if let Some(turns) = update.worker_turns {
            self.worker_turns = turns;
        }
        if let Some(output) = update.task_output {
            self.task_output = output;
        }
        self
    }
}
