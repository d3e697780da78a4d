//! Progress Ledger
//!
//! A structured self-assessment the model produces once per orchestration
//! cycle. Every answer is paired with the reason given in the same call, and
//! the ledger is rejected unless each reason is present.
//!
//! ## Roster constraint
//!
//! The JSON schema sent with the request limits `next_speaker.answer` to the
//! roster names. The decoded ledger is checked against the roster again, so a
//! model ignoring the schema still cannot name a worker outside the team.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use super::team::{Team, WorkerId};
use crate::ai::validation::require_text;
use crate::ai::{ModelClient, PromptBuilder, RenderedPrompt};
use crate::types::{AnalystError, Message, Result, ValidationErrorKind};

/// An answer with the reasoning that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerItem<T> {
    pub reason: String,
    pub answer: T,
}

impl<T> LedgerItem<T> {
    pub fn new(reason: impl Into<String>, answer: T) -> Self {
        Self {
            reason: reason.into(),
            answer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressLedger {
    /// True only when the request is fully and successfully addressed
    pub is_request_satisfied: LedgerItem<bool>,
    /// True when recent turns repeat earlier requests or responses
    pub is_in_loop: LedgerItem<bool>,
    /// True when recent turns added material value
    pub is_progress_being_made: LedgerItem<bool>,
    pub next_speaker: LedgerItem<WorkerId>,
    /// Instruction for `next_speaker`, phrased as direct address
    pub instruction_or_question: LedgerItem<String>,
}

impl ProgressLedger {
    /// Looping or not progressing
    pub fn is_stalled(&self) -> bool {
        self.is_in_loop.answer || !self.is_progress_being_made.answer
    }

    /// Structured-output schema with `next_speaker` limited to `team`
    pub fn schema(team: &Team) -> Value {
        let flag = |description: &str| item_schema(json!({"type": "boolean"}), description);
        json!({
            "type": "object",
            "properties": {
                "is_request_satisfied": flag(
                    "Is the request fully satisfied? True only if the original request has been SUCCESSFULLY and FULLY addressed"
                ),
                "is_in_loop": flag(
                    "Are we repeating the same requests or getting the same responses as before? Loops can span multiple turns"
                ),
                "is_progress_being_made": flag(
                    "Are we making forward progress? True if just starting or if recent messages add value; false if stuck or blocked"
                ),
                "next_speaker": item_schema(
                    json!({"type": "string", "enum": team.member_names()}),
                    "Who should speak next?"
                ),
                "instruction_or_question": item_schema(
                    json!({"type": "string"}),
                    "What instruction or question would you give this team member? Phrase it as if speaking directly to them"
                ),
            },
            "required": [
                "is_request_satisfied",
                "is_in_loop",
                "is_progress_being_made",
                "next_speaker",
                "instruction_or_question"
            ],
        })
    }

    /// Check reasons are present and the next speaker is on the roster
    pub fn validate(&self, team: &Team) -> Result<()> {
        require_text("is_request_satisfied.reason", &self.is_request_satisfied.reason)?;
        require_text("is_in_loop.reason", &self.is_in_loop.reason)?;
        require_text("is_progress_being_made.reason", &self.is_progress_being_made.reason)?;
        require_text("next_speaker.reason", &self.next_speaker.reason)?;
        require_text(
            "instruction_or_question.reason",
            &self.instruction_or_question.reason,
        )?;

        if !team.contains(self.next_speaker.answer) {
            return Err(AnalystError::invalid_output(
                ValidationErrorKind::Range,
                "next_speaker.answer",
                format!(
                    "'{}' is not on the team ({})",
                    self.next_speaker.answer,
                    team.member_names().join(", ")
                ),
            ));
        }
        Ok(())
    }
}

fn item_schema(answer: Value, description: &str) -> Value {
    json!({
        "type": "object",
        "description": description,
        "properties": {
            "reason": {"type": "string"},
            "answer": answer,
        },
        "required": ["reason", "answer"],
    })
}

/// Request for a ledger over the conversation so far
pub fn progress_ledger_prompt(task: &str, team: &Team) -> RenderedPrompt {
    PromptBuilder::new()
        .text(
            "Recall we are working on the following request. Review the conversation \
             above and assess where we stand.",
        )
        .section("Request", task)
        .section("Team", team.members_string())
        .rules([
            format!(
                "next_speaker must be one of: {}",
                team.member_names().join(", ")
            ),
            "Give a reason for every answer".to_string(),
            "Only count progress that adds material value; small additions are not progress"
                .to_string(),
            "Answer with a single JSON object and nothing else".to_string(),
        ])
        .render("research/progress_ledger")
}

/// Produces one [`ProgressLedger`] per call
pub struct ProgressLedgerEvaluator<'a> {
    client: &'a ModelClient,
    team: &'a Team,
}

impl<'a> ProgressLedgerEvaluator<'a> {
    pub fn new(client: &'a ModelClient, team: &'a Team) -> Self {
        Self { client, team }
    }

    /// Single structured call over `messages`; failures propagate
    #[instrument(skip_all)]
    pub async fn evaluate(&self, task: &str, messages: &[Message]) -> Result<ProgressLedger> {
        let mut request = messages.to_vec();
        request.push(progress_ledger_prompt(task, self.team).into_human());

        let ledger: ProgressLedger = self
            .client
            .invoke_structured(
                "research.update_progress_ledger",
                &request,
                &ProgressLedger::schema(self.team),
            )
            .await?;
        ledger.validate(self.team)?;

        debug!(
            satisfied = ledger.is_request_satisfied.answer,
            in_loop = ledger.is_in_loop.answer,
            progress = ledger.is_progress_being_made.answer,
            next_speaker = %ledger.next_speaker.answer,
            "Progress ledger"
        );
        Ok(ledger)
    }
}
