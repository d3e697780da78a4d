//! Research Graph (task orchestrator)
//!
//! Open-ended investigation driven by a progress ledger:
//!
//! ```text
//! create_or_update_task_ledger → create_or_update_task_plan → update_progress_ledger
//!        ↑                                                          ↓
//!        └──── replan ──── evaluate_progress_ledger ──→ worker ─────┘
//!                                   ↓
//!                           summarize_findings → end
//! ```
//!
//! ## Termination
//!
//! `stall_count` grows on every cycle judged looping or unproductive and is
//! zeroed by the plan step. Sustained stalling forces a full replan and bumps
//! `reset_count`; once `reset_count` reaches its ceiling the graph summarizes
//! whatever it has. `max_worker_turns` bounds runs where the model keeps
//! reporting progress without ever declaring the request satisfied.

mod prompts;
mod types;

pub use prompts::{
    SUMMARIZE_FINDINGS, TASK_FACTS, TASK_FACTS_UPDATE, TASK_PLAN, TASK_PLAN_UPDATE,
};
pub use types::{ResearchLimits, ResearchNode, ResearchState, ResearchUpdate};

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::artifacts::ArtifactScope;
use super::graph::{Command, GraphRunner, StateGraph};
use super::ledger::{ProgressLedger, ProgressLedgerEvaluator};
use super::team::{Team, WorkerId};
use super::worker::WorkerSet;
use crate::ai::ModelClient;
use crate::config::ResearchConfig;
use crate::types::{AnalystError, Message, Result, ValidationErrorKind, transcript};

/// Name attached to messages the orchestrator itself contributes
const ORCHESTRATOR: &str = "orchestrator";

/// Outcome of evaluating a progress ledger against the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub stall_count: usize,
    pub reset_count: usize,
    pub next: ResearchNode,
}

/// Routing decision after a ledger update, in precedence order:
///
/// 1. a looping or unproductive cycle increments `stall_count`
/// 2. satisfied, or any ceiling reached, summarizes
/// 3. sustained stalling without progress replans and increments `reset_count`
/// 4. otherwise the named worker speaks
pub fn evaluate_progress(ledger: &ProgressLedger, state: &ResearchState) -> Transition {
    let limits = &state.limits;
    let mut stall_count = state.stall_count;
    let mut reset_count = state.reset_count;

    if ledger.is_stalled() {
        stall_count += 1;
    }

    let next = if ledger.is_request_satisfied.answer
        || reset_count >= limits.reset_count_limit
        || state.worker_turns >= limits.max_worker_turns
    {
        ResearchNode::SummarizeFindings
    } else if stall_count >= limits.stall_count_limit && !ledger.is_progress_being_made.answer {
        reset_count += 1;
        ResearchNode::CreateOrUpdateTaskLedger
    } else {
        ResearchNode::Worker(ledger.next_speaker.answer)
    };

    Transition {
        stall_count,
        reset_count,
        next,
    }
}

pub struct ResearchGraph {
    client: ModelClient,
    team: Team,
    workers: WorkerSet,
}

impl ResearchGraph {
    /// Every team member must have a worker in `workers`
    pub fn new(client: ModelClient, team: Team, workers: WorkerSet) -> Result<Self> {
        for id in team.ids() {
            workers.get(id)?;
        }
        Ok(Self {
            client,
            team,
            workers,
        })
    }

    /// Investigate `task` and return the final answer
    #[instrument(skip_all)]
    pub async fn run(&self, task: &str, config: &ResearchConfig) -> Result<String> {
        let state = ResearchState::new(task, ResearchLimits::from(config));
        let state = GraphRunner::new(config.recursion_limit)
            .run(self, state)
            .await?;
        info!(
            resets = state.reset_count,
            worker_turns = state.worker_turns,
            "Research finished"
        );
        Ok(state.task_output)
    }

    async fn create_or_update_task_ledger(&self, state: &ResearchState) -> Result<ResearchUpdate> {
        info!(update = !state.task_facts.is_empty(), "Creating or updating task facts");
        let prompt = prompts::task_facts(&state.task, &state.task_facts);

        let mut request = state.messages.clone();
        request.push(prompt.into_human());
        let reply = self
            .client
            .invoke("research.create_or_update_task_ledger", &request)
            .await?;

        Ok(ResearchUpdate {
            task_facts: Some(reply.content.clone()),
            messages: vec![reply.named(ORCHESTRATOR)],
            ..Default::default()
        })
    }

    async fn create_or_update_task_plan(&self, state: &ResearchState) -> Result<ResearchUpdate> {
        info!(update = !state.task_plan.is_empty(), "Creating or updating task plan");
        let prompt = prompts::task_plan(&self.team, &state.task_plan);

        let mut request = state.messages.clone();
        request.push(prompt.into_human());
        let reply = self
            .client
            .invoke("research.create_or_update_task_plan", &request)
            .await?;

        Ok(ResearchUpdate {
            task_plan: Some(reply.content.clone()),
            messages: vec![reply.named(ORCHESTRATOR)],
            stall_count: Some(0),
            ..Default::default()
        })
    }

    async fn dispatch(&self, id: WorkerId, state: &ResearchState) -> Result<ResearchUpdate> {
        let ledger = current_ledger(state)?;
        let instruction =
            Message::human(ledger.instruction_or_question.answer.clone()).named(ORCHESTRATOR);
        info!(worker = %id, turn = state.worker_turns + 1, "Handing over to worker");

        let mut context = state.worker_context(id);
        context.push(instruction.clone());
        let output = self.workers.get(id)?.run(&context).await?;
        let reply = output.to_message(id);
        context.push(reply.clone());

        let mut messages = vec![instruction, reply];
        if output.is_invalid() {
            warn!(worker = %id, "Worker result flagged as invalid");
            messages.push(
                Message::human(format!(
                    "The last result from {} signals a failure. Take this into account when \
                     assessing progress.",
                    id
                ))
                .named(ORCHESTRATOR),
            );
        }

        Ok(ResearchUpdate {
            messages,
            worker_context: Some((id, context)),
            worker_turns: Some(state.worker_turns + 1),
            ..Default::default()
        })
    }

    async fn summarize_findings(&self, state: &ResearchState) -> Result<ResearchUpdate> {
        info!("Summarizing findings");
        let mut request = state.messages.clone();
        request.push(prompts::summarize_findings(&state.task).into_human());
        let reply = self
            .client
            .invoke("research.summarize_findings", &request)
            .await?;

        let mut output = reply.content.clone();
        let omitted: Vec<String> = ArtifactScope::files_mentioned(&transcript(&state.messages))
            .into_iter()
            .filter(|name| !output.contains(name.as_str()))
            .collect();
        if !omitted.is_empty() {
            debug!(count = omitted.len(), "Appending files the summary left out");
            output.push_str("\n\nFiles referenced during the analysis: ");
            output.push_str(&omitted.join(", "));
        }

        Ok(ResearchUpdate {
            messages: vec![reply.named(ORCHESTRATOR)],
            task_output: Some(output),
            ..Default::default()
        })
    }
}

fn current_ledger(state: &ResearchState) -> Result<&ProgressLedger> {
    state.progress_ledger.as_ref().ok_or_else(|| {
        AnalystError::invalid_output(
            ValidationErrorKind::MissingField,
            "progress_ledger",
            "no ledger has been produced yet",
        )
    })
}

#[async_trait]
impl StateGraph for ResearchGraph {
    type State = ResearchState;
    type Update = ResearchUpdate;
    type Node = ResearchNode;

    fn name(&self) -> &'static str {
        "research"
    }

    fn entry(&self) -> ResearchNode {
        ResearchNode::CreateOrUpdateTaskLedger
    }

    async fn step(
        &self,
        node: ResearchNode,
        state: &ResearchState,
    ) -> Result<Command<ResearchUpdate, ResearchNode>> {
        match node {
            ResearchNode::CreateOrUpdateTaskLedger => Ok(Command::goto(
                self.create_or_update_task_ledger(state).await?,
                ResearchNode::CreateOrUpdateTaskPlan,
            )),
            ResearchNode::CreateOrUpdateTaskPlan => Ok(Command::goto(
                self.create_or_update_task_plan(state).await?,
                ResearchNode::UpdateProgressLedger,
            )),
            ResearchNode::UpdateProgressLedger => {
                let ledger = ProgressLedgerEvaluator::new(&self.client, &self.team)
                    .evaluate(&state.task, &state.messages)
                    .await?;
                Ok(Command::goto(
                    ResearchUpdate {
                        progress_ledger: Some(ledger),
                        ..Default::default()
                    },
                    ResearchNode::EvaluateProgressLedger,
                ))
            }
            ResearchNode::EvaluateProgressLedger => {
                let ledger = current_ledger(state)?;
                let transition = evaluate_progress(ledger, state);
                debug!(
                    stall_count = transition.stall_count,
                    reset_count = transition.reset_count,
                    worker_turns = state.worker_turns,
                    next = %transition.next,
                    "Progress evaluated"
                );
                if transition.next == ResearchNode::SummarizeFindings
                    && ledger.is_request_satisfied.answer
                    && state.worker_turns == 0
                {
                    info!("Request judged satisfied before any worker was consulted");
                }
                if transition.next == ResearchNode::CreateOrUpdateTaskLedger {
                    warn!(reset_count = transition.reset_count, "Stalled, replanning from scratch");
                }
                Ok(Command::goto(
                    ResearchUpdate {
                        stall_count: Some(transition.stall_count),
                        reset_count: Some(transition.reset_count),
                        ..Default::default()
                    },
                    transition.next,
                ))
            }
            ResearchNode::Worker(id) => Ok(Command::goto(
                self.dispatch(id, state).await?,
                ResearchNode::UpdateProgressLedger,
            )),
            ResearchNode::SummarizeFindings => {
                Ok(Command::end(self.summarize_findings(state).await?))
            }
        }
    }

    fn apply(&self, state: ResearchState, update: ResearchUpdate) -> ResearchState {
        state.merge(update)
    }
}
