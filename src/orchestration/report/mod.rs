//! Report Pipeline
//!
//! Straight-line driver for one report request:
//!
//! ```text
//! retrieve_sales_history → process_sales_data → retrieve_operational_data
//!     → review_special_case ─┬─→ process_special_case ─→ generate_report → end
//!                            └──────────────────────────→ generate_report → end
//! ```
//!
//! The review is the only branch. A special case hands the gathered
//! artifacts to the research graph; every request ends in the editor graph,
//! seeded with all free-text artifacts in pipeline order.

mod prompts;
mod types;

pub use types::{ReportNode, ReportState, ReportUpdate, SpecialCaseReview};

use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

use super::artifacts::ArtifactScope;
use super::editor::EditorGraph;
use super::graph::{Command, GraphRunner, StateGraph};
use super::research::ResearchGraph;
use super::team::{Team, WorkerId};
use super::worker::{WorkerOutput, WorkerSet};
use crate::ai::ModelClient;
use crate::ai::validation::require_text;
use crate::config::{Config, EditorConfig, ResearchConfig};
use crate::constants::pipeline;
use crate::types::{Message, ReportRequest, Result};

/// Branch taken after the special-case review
pub fn special_case_gate(state: &ReportState) -> ReportNode {
    if state.is_special_case {
        ReportNode::ProcessSpecialCase
    } else {
        ReportNode::GenerateReport
    }
}

pub struct ReportPipeline {
    client: ModelClient,
    workers: WorkerSet,
    scope: ArtifactScope,
    research: ResearchConfig,
    editor: EditorConfig,
    analysis_date: NaiveDate,
    data_dir: Option<PathBuf>,
}

impl ReportPipeline {
    pub fn new(
        client: ModelClient,
        workers: WorkerSet,
        scope: ArtifactScope,
        config: &Config,
    ) -> Self {
        Self {
            client,
            workers,
            scope,
            research: config.research.clone(),
            editor: config.editor.clone(),
            analysis_date: config.analysis_date(),
            data_dir: config.worker.data_dir.clone(),
        }
    }

    /// Run every step for `request` and return the final state
    #[instrument(skip_all, fields(task_id = %request.task_id()))]
    pub async fn run(&self, request: &ReportRequest) -> Result<ReportState> {
        request.validate()?;
        self.scope.ensure_dir()?;
        info!(request = %request.name(), date = %self.analysis_date, "Starting report pipeline");

        let state = ReportState::new(request.clone(), self.analysis_date);
        GraphRunner::new(pipeline::RECURSION_LIMIT)
            .run(self, state)
            .await
    }

    async fn run_worker(&self, id: WorkerId, message: Message) -> Result<WorkerOutput> {
        let output = self.workers.get(id)?.run(&[message]).await?;
        if output.is_invalid() {
            warn!(worker = %id, "Worker result flagged as invalid");
        }
        Ok(output)
    }

    async fn retrieve_sales_history(&self, state: &ReportState) -> Result<ReportUpdate> {
        info!("Retrieving sales history");
        let prompt = prompts::retrieve_sales_history(
            &state.request,
            state.analysis_date,
            &self.scope.sales_history_location(),
        );
        let output = self
            .run_worker(WorkerId::InternalDataAgent, prompt.into_human())
            .await?;
        Ok(ReportUpdate {
            sales_history: Some(output.content),
            ..Default::default()
        })
    }

    async fn process_sales_data(&self, state: &ReportState) -> Result<ReportUpdate> {
        info!("Analysing sales data");
        let prompt = prompts::process_sales_data(
            &state.request,
            state.analysis_date,
            &self.scope.sales_history_location(),
        );
        let output = self
            .run_worker(WorkerId::QuantitativeAnalysisAgent, prompt.into_human())
            .await?;
        Ok(ReportUpdate {
            sales_analysis: Some(output.content),
            ..Default::default()
        })
    }

    async fn retrieve_operational_data(&self, state: &ReportState) -> Result<ReportUpdate> {
        info!("Retrieving operational data");
        let history = self.scope.sales_history_location();
        let prompt = prompts::retrieve_operational_data(
            &state.request,
            state.analysis_date,
            &history,
            self.data_dir.as_deref(),
        );

        let mut message = prompt.into_human();
        if history.is_file() {
            message = message.with_attachments([history]);
        } else {
            warn!(path = %history.display(), "Sales history extract missing, sending without it");
        }

        let output = self
            .run_worker(WorkerId::InternalDataAgent, message)
            .await?;
        Ok(ReportUpdate {
            sales_operational_data: Some(output.content),
            ..Default::default()
        })
    }

    async fn review_special_case(&self, state: &ReportState) -> Result<ReportUpdate> {
        let request = [prompts::review_special_case(&state.sales_analysis).into_human()];
        let review: SpecialCaseReview = self
            .client
            .invoke_structured(
                "pipeline.review_special_case",
                &request,
                &SpecialCaseReview::schema(),
            )
            .await?;
        if review.is_special_case {
            require_text("special_case_reason", &review.special_case_reason)?;
        }
        info!(special = review.is_special_case, "Special case reviewed");

        Ok(ReportUpdate {
            special_case: Some(review),
            ..Default::default()
        })
    }

    async fn process_special_case(&self, state: &ReportState) -> Result<ReportUpdate> {
        info!(reason = %state.special_case_reason, "Investigating special case");
        let task = prompts::research_task(state, self.data_dir.as_deref());
        let graph = ResearchGraph::new(
            self.client.clone(),
            Team::research_default(),
            self.workers.clone(),
        )?;
        let findings = graph.run(&task.text, &self.research).await?;
        Ok(ReportUpdate {
            sales_in_depth_analysis: Some(findings),
            ..Default::default()
        })
    }

    async fn generate_report(&self, state: &ReportState) -> Result<ReportUpdate> {
        let artifacts = state.artifacts();
        debug!(artifacts = artifacts.len(), "Seeding the editor");
        let seed = vec![Message::human(artifacts.join("\n\n"))];

        let graph = EditorGraph::new(self.client.clone(), self.workers.clone(), self.scope.clone())?;
        let report = graph.run(seed, &self.editor).await?;
        Ok(ReportUpdate {
            report: Some(report),
            ..Default::default()
        })
    }
}

#[async_trait]
impl StateGraph for ReportPipeline {
    type State = ReportState;
    type Update = ReportUpdate;
    type Node = ReportNode;

    fn name(&self) -> &'static str {
        "report"
    }

    fn entry(&self) -> ReportNode {
        ReportNode::RetrieveSalesHistory
    }

    async fn step(
        &self,
        node: ReportNode,
        state: &ReportState,
    ) -> Result<Command<ReportUpdate, ReportNode>> {
        match node {
            ReportNode::RetrieveSalesHistory => Ok(Command::goto(
                self.retrieve_sales_history(state).await?,
                ReportNode::ProcessSalesData,
            )),
            ReportNode::ProcessSalesData => Ok(Command::goto(
                self.process_sales_data(state).await?,
                ReportNode::RetrieveOperationalData,
            )),
            ReportNode::RetrieveOperationalData => Ok(Command::goto(
                self.retrieve_operational_data(state).await?,
                ReportNode::ReviewSpecialCase,
            )),
            ReportNode::ReviewSpecialCase => {
                let update = self.review_special_case(state).await?;
                // Gate on the state the update produces
                let next = special_case_gate(&state.clone().merge(update.clone()));
                Ok(Command::goto(update, next))
            }
            ReportNode::ProcessSpecialCase => Ok(Command::goto(
                self.process_special_case(state).await?,
                ReportNode::GenerateReport,
            )),
            ReportNode::GenerateReport => Ok(Command::end(self.generate_report(state).await?)),
        }
    }

    fn apply(&self, state: ReportState, update: ReportUpdate) -> ReportState {
        state.merge(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::create_shared_metrics;
    use crate::orchestration::editor::EditorRoute;
    use crate::orchestration::ledger::tests::ledger_json;
    use crate::testing::{ScriptedProvider, ScriptedWorker};
    use crate::types::{AnalystError, Grouping, Period};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        pipeline: ReportPipeline,
        provider: Arc<ScriptedProvider>,
        internal: Arc<ScriptedWorker>,
        quant: Arc<ScriptedWorker>,
        scope: ArtifactScope,
        _temp: TempDir,
    }

    fn router(route: EditorRoute) -> Value {
        json!({
            "reasoning": "decided",
            "next_speaker": route.as_str(),
            "next_speaker_task": "Write the report.",
        })
    }

    fn review(special: bool, reason: &str) -> Value {
        json!({"is_special_case": special, "special_case_reason": reason})
    }

    fn editor_replies() -> Vec<Value> {
        vec![
            router(EditorRoute::DocumentWriting),
            json!("# Sales Report"),
            router(EditorRoute::Complete),
        ]
    }

    fn fixture(replies: Vec<Value>) -> Fixture {
        let temp = TempDir::new().unwrap();
        let request = ReportRequest::grouped(Grouping::Country, "Spain", Period::Monthly);
        let scope = ArtifactScope::new(temp.path(), &request.task_id());
        scope.ensure_dir().unwrap();

        let internal = Arc::new(ScriptedWorker::new(
            WorkerId::InternalDataAgent,
            ["History saved to sales_history.csv", "Operational data: stock fell"],
        ));
        let quant = Arc::new(ScriptedWorker::new(
            WorkerId::QuantitativeAnalysisAgent,
            ["Sales are down 40% month over month"],
        ));
        let charts = Arc::new(ScriptedWorker::new(WorkerId::DataVisualizationAgent, ["chart"]));
        let workers = WorkerSet::new()
            .with(internal.clone())
            .with(quant.clone())
            .with(charts);

        let provider = Arc::new(ScriptedProvider::new(replies));
        let client = ModelClient::new(provider.clone(), create_shared_metrics("t1"));
        let mut config = Config::default();
        config.pipeline.analysis_date = NaiveDate::from_ymd_opt(2025, 3, 31);

        Fixture {
            pipeline: ReportPipeline::new(client, workers, scope.clone(), &config),
            provider,
            internal,
            quant,
            scope,
            _temp: temp,
        }
    }

    fn request() -> ReportRequest {
        ReportRequest::grouped(Grouping::Country, "Spain", Period::Monthly)
    }

    #[test]
    fn test_special_case_gate() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        let mut state = ReportState::new(request(), date);
        assert_eq!(special_case_gate(&state), ReportNode::GenerateReport);
        state.is_special_case = true;
        assert_eq!(special_case_gate(&state), ReportNode::ProcessSpecialCase);
    }

    #[tokio::test]
    async fn test_regular_case_skips_research() {
        let mut replies = vec![review(false, "Within the usual range")];
        replies.extend(editor_replies());
        let f = fixture(replies);
        std::fs::write(f.scope.sales_history_location(), "month,sales\n").unwrap();

        let state = f.pipeline.run(&request()).await.unwrap();
        assert!(!state.is_special_case);
        assert!(state.sales_in_depth_analysis.is_empty());
        assert_eq!(state.report, "# Sales Report");
        assert_eq!(f.internal.calls(), 2);
        assert_eq!(f.quant.calls(), 1);
        assert_eq!(f.provider.remaining(), 0);

        // The operational step carries the extract produced by the first step
        let received = f.internal.received();
        assert_eq!(
            received[1][0].attachments,
            vec![f.scope.sales_history_location()]
        );

        // The editor is seeded with every artifact in order
        let requests = f.provider.requests();
        let seed = &requests[1].messages[1].content;
        let history = seed.find("History saved").unwrap();
        let analysis = seed.find("Sales are down").unwrap();
        let operational = seed.find("Operational data").unwrap();
        assert!(history < analysis && analysis < operational);
        assert!(seed.contains("Within the usual range"));
    }

    #[tokio::test]
    async fn test_special_case_runs_research() {
        let mut replies = vec![
            review(true, "Sales dropped 40% in Spain"),
            json!("Facts gathered"),
            json!("Plan drafted"),
            ledger_json(true, false, true, "quantitative_analysis_agent"),
            json!("Root cause: a stockout in the main warehouse"),
        ];
        replies.extend(editor_replies());
        let f = fixture(replies);

        let state = f.pipeline.run(&request()).await.unwrap();
        assert!(state.is_special_case);
        assert!(
            state
                .sales_in_depth_analysis
                .starts_with("Root cause: a stockout")
        );
        assert_eq!(state.report, "# Sales Report");

        let requests = f.provider.requests();
        let research_task = &requests[1].messages[0].content;
        assert!(research_task.contains("Sales dropped 40% in Spain"));
        assert!(research_task.contains("History saved to sales_history.csv"));

        let seed = &requests[5].messages[1].content;
        assert!(seed.contains("Root cause: a stockout"));
    }

    #[tokio::test]
    async fn test_special_case_without_reason_fails() {
        let f = fixture(vec![review(true, "  ")]);
        let err = f.pipeline.run(&request()).await.unwrap_err();
        assert!(matches!(err, AnalystError::Validation(_)));
    }
}
