//! Editor Graph (editorial supervisor)
//!
//! A supervisor routes between a visualization worker and a writing step
//! until it declares the report complete:
//!
//! ```text
//! supervisor ─┬─→ data_visualization_agent ─→ supervisor
//!             ├─→ document_writing_agent ───→ supervisor
//!             └─→ end
//! ```
//!
//! ## Loop ceilings
//!
//! Choosing the same route as last time increments `loop_count`; any other
//! choice resets it. Each route has its own ceiling, higher for visualization
//! since every chart takes a separate pass. Reaching the ceiling ends the
//! graph whatever the supervisor asked for, and so does
//! `max_supervisor_turns`.

mod prompts;
mod types;

pub use types::{EditorLimits, EditorNode, EditorRoute, EditorState, EditorUpdate, Router};

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::artifacts::ArtifactScope;
use super::graph::{Command, Goto, GraphRunner, StateGraph};
use super::team::WorkerId;
use super::worker::WorkerSet;
use crate::ai::ModelClient;
use crate::ai::validation::require_text;
use crate::config::EditorConfig;
use crate::types::{AnalystError, Message, Result, ValidationErrorKind};

/// Loop bookkeeping for one supervisor decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDecision {
    pub loop_count: usize,
    pub goto: Goto<EditorNode>,
}

/// Apply the loop ceilings to the supervisor's `choice`
pub fn route(state: &EditorState, choice: EditorRoute) -> RouteDecision {
    let limits = &state.limits;
    let loop_count = if state.next_speaker == Some(choice) {
        state.loop_count + 1
    } else {
        0
    };

    let (node, max_loops) = match choice {
        EditorRoute::Complete => {
            return RouteDecision {
                loop_count,
                goto: Goto::End,
            };
        }
        EditorRoute::DataVisualization => {
            (EditorNode::DataVisualization, limits.max_visualization_loops)
        }
        EditorRoute::DocumentWriting => (EditorNode::DocumentWriting, limits.max_writer_loops),
    };

    let goto = if loop_count >= max_loops || state.supervisor_turns + 1 >= limits.max_supervisor_turns
    {
        Goto::End
    } else {
        Goto::Node(node)
    };
    RouteDecision { loop_count, goto }
}

pub struct EditorGraph {
    client: ModelClient,
    workers: WorkerSet,
    scope: ArtifactScope,
}

impl EditorGraph {
    /// `workers` must provide the visualization worker
    pub fn new(client: ModelClient, workers: WorkerSet, scope: ArtifactScope) -> Result<Self> {
        workers.get(WorkerId::DataVisualizationAgent)?;
        Ok(Self {
            client,
            workers,
            scope,
        })
    }

    /// Edit a report from `seed` and return its final text
    #[instrument(skip_all)]
    pub async fn run(&self, seed: Vec<Message>, config: &EditorConfig) -> Result<String> {
        let state = EditorState::new(seed, EditorLimits::from(config));
        let state = GraphRunner::new(config.recursion_limit)
            .run(self, state)
            .await?;

        if state.report.trim().is_empty() {
            return Err(AnalystError::invalid_output(
                ValidationErrorKind::MissingField,
                "report",
                "the editor finished without writing a report",
            ));
        }
        info!(
            supervisor_turns = state.supervisor_turns,
            chars = state.report.len(),
            "Report edited"
        );
        Ok(state.report)
    }

    fn snapshot(&self, state: &EditorState) -> Result<Message> {
        let files = self.scope.list()?;
        Ok(prompts::report_snapshot(&state.report, &files, state.next_speaker).into_human())
    }

    async fn supervisor(
        &self,
        state: &EditorState,
    ) -> Result<Command<EditorUpdate, EditorNode>> {
        let mut request = Vec::with_capacity(state.messages.len() + 2);
        request.push(prompts::supervisor_system().into_system());
        request.extend(state.messages.iter().cloned());
        request.push(self.snapshot(state)?);

        let router: Router = self
            .client
            .invoke_structured("editor.supervisor", &request, &Router::schema())
            .await?;
        require_text("reasoning", &router.reasoning)?;

        let decision = route(state, router.next_speaker);
        debug!(
            choice = %router.next_speaker,
            loop_count = decision.loop_count,
            turn = state.supervisor_turns + 1,
            "Supervisor decided"
        );
        if decision.goto == Goto::End && router.next_speaker != EditorRoute::Complete {
            warn!(choice = %router.next_speaker, "Loop ceiling reached, ending the edit");
        }

        Ok(Command {
            update: EditorUpdate {
                messages: vec![Message::human(router.next_speaker_task).named("supervisor")],
                next_speaker: Some(router.next_speaker),
                loop_count: Some(decision.loop_count),
                supervisor_turns: Some(state.supervisor_turns + 1),
                ..Default::default()
            },
            goto: decision.goto,
        })
    }

    async fn data_visualization(&self, state: &EditorState) -> Result<EditorUpdate> {
        info!("Generating charts");
        let id = WorkerId::DataVisualizationAgent;
        let output = self.workers.get(id)?.run(&state.messages).await?;
        if output.is_invalid() {
            warn!("Visualization result flagged as invalid");
        }

        let images: Vec<_> = output
            .artifacts
            .iter()
            .filter(|p| ArtifactScope::is_image(p))
            .cloned()
            .collect();
        debug!(images = images.len(), "Charts attached");

        Ok(EditorUpdate {
            messages: vec![
                Message::human(output.content)
                    .named(id.as_str())
                    .with_attachments(images),
            ],
            ..Default::default()
        })
    }

    async fn document_writing(&self, state: &EditorState) -> Result<EditorUpdate> {
        info!("Writing the report");
        let mut request = Vec::with_capacity(state.messages.len() + 2);
        request.push(prompts::writer_system().into_system());
        request.extend(state.messages.iter().cloned());
        request.push(self.snapshot(state)?);

        let reply = self
            .client
            .invoke("editor.document_writing_agent", &request)
            .await?;
        Ok(EditorUpdate {
            report: Some(reply.content),
            ..Default::default()
        })
    }
}

#[async_trait]
impl StateGraph for EditorGraph {
    type State = EditorState;
    type Update = EditorUpdate;
    type Node = EditorNode;

    fn name(&self) -> &'static str {
        "editor"
    }

    fn entry(&self) -> EditorNode {
        EditorNode::Supervisor
    }

    async fn step(
        &self,
        node: EditorNode,
        state: &EditorState,
    ) -> Result<Command<EditorUpdate, EditorNode>> {
        match node {
            EditorNode::Supervisor => self.supervisor(state).await,
            EditorNode::DataVisualization => Ok(Command::goto(
                self.data_visualization(state).await?,
                EditorNode::Supervisor,
            )),
            EditorNode::DocumentWriting => Ok(Command::goto(
                self.document_writing(state).await?,
                EditorNode::Supervisor,
            )),
        }
    }

    fn apply(&self, state: EditorState, update: EditorUpdate) -> EditorState {
        state.merge(update)
    }
}
