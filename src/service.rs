//! Report Service
//!
//! Runs the configured report requests one after another. Each attempt gets
//! a fresh artifact scope, client and metrics collector. A failed attempt is
//! retried after a constant delay; once the attempts are used up a failure
//! notice goes out instead of the report.

use backon::{ConstantBuilder, Retryable};
use chrono::Local;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::ai::{ModelClient, SharedProvider, create_shared_metrics};
use crate::config::Config;
use crate::delivery::{Notification, SharedSink};
use crate::orchestration::{ArtifactScope, ReportPipeline, WorkerSet};
use crate::types::{AnalystError, ReportRequest, Result};

/// A report written to disk
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub path: PathBuf,
    pub images: Vec<PathBuf>,
    pub api_calls: u32,
    pub total_tokens: u64,
}

/// What happened to one request
#[derive(Debug)]
pub struct ReportOutcome {
    pub request: String,
    pub attempts: usize,
    pub result: Result<GeneratedReport>,
    /// Whether the report or the failure notice was delivered
    pub delivered: bool,
}

impl ReportOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<ReportOutcome>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

pub struct ReportService {
    config: Config,
    provider: SharedProvider,
    sink: SharedSink,
    workers: Option<WorkerSet>,
}

impl ReportService {
    pub fn new(config: Config, provider: SharedProvider, sink: SharedSink) -> Self {
        Self {
            config,
            provider,
            sink,
            workers: None,
        }
    }

    /// Use `workers` for every request instead of the configured ones
    pub fn with_workers(mut self, workers: WorkerSet) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Generate every configured request, in order
    pub async fn run_all(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for request in &self.config.requests {
            summary.outcomes.push(self.run_request(request).await);
        }
        info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            "Run finished"
        );
        summary
    }

    #[instrument(skip_all, fields(request = %request.name()))]
    pub async fn run_request(&self, request: &ReportRequest) -> ReportOutcome {
        let max_attempts = self.config.pipeline.max_attempts.max(1);
        let counter = AtomicUsize::new(0);
        let backoff = ConstantBuilder::default()
            .with_delay(Duration::from_secs(self.config.pipeline.retry_delay_secs))
            .with_max_times(max_attempts - 1);

        let this = self;
        let attempts = &counter;
        let result = (move || async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            info!(attempt, max_attempts, "Generating report");
            this.attempt(request).await
        })
        .retry(backoff)
        .notify(|err: &AnalystError, delay: Duration| {
            warn!(error = %err, retry_in = ?delay, "Report attempt failed");
        })
        .await;
        let attempts = counter.load(Ordering::SeqCst);

        match result {
            Ok(report) => {
                let delivered = self.deliver(request, &report).await;
                ReportOutcome {
                    request: request.name(),
                    attempts,
                    result: Ok(report),
                    delivered,
                }
            }
            Err(e) => {
                let err = AnalystError::ReportFailed {
                    request: request.name(),
                    attempts,
                    reason: e.to_string(),
                };
                warn!(error = %err, "Giving up on report");
                let delivered = self.notify_failure(request, &err).await;
                ReportOutcome {
                    request: request.name(),
                    attempts,
                    result: Err(err),
                    delivered,
                }
            }
        }
    }

    async fn attempt(&self, request: &ReportRequest) -> Result<GeneratedReport> {
        let task_id = request.task_id();
        let scope = ArtifactScope::new(&self.config.pipeline.temp_dir, &task_id);
        if scope.root().exists() {
            tokio::fs::remove_dir_all(scope.root()).await?;
        }

        let metrics = create_shared_metrics(&task_id);
        let client = ModelClient::new(self.provider.clone(), metrics.clone());
        let workers = match &self.workers {
            Some(workers) => workers.clone(),
            None => WorkerSet::standard(&self.config.worker, &client, &scope),
        };

        let state = ReportPipeline::new(client, workers, scope.clone(), &self.config)
            .run(request)
            .await?;

        let outputs_dir = &self.config.pipeline.outputs_dir;
        tokio::fs::create_dir_all(outputs_dir).await?;
        let path = outputs_dir.join(format!(
            "{}-{}_report.md",
            Local::now().format("%y%m%d%H%M"),
            request.file_stem()
        ));
        tokio::fs::write(&path, &state.report).await?;

        let usage = metrics.summary();
        info!(
            path = %path.display(),
            api_calls = usage.api_calls,
            tokens = usage.total_tokens,
            "Report written"
        );
        Ok(GeneratedReport {
            path,
            images: scope.images()?,
            api_calls: usage.api_calls,
            total_tokens: usage.total_tokens,
        })
    }

    fn recipients(&self, request: &ReportRequest) -> Vec<String> {
        let mut recipients = self.config.notification.recipients.clone();
        for address in &request.recipients {
            if !recipients.contains(address) {
                recipients.push(address.clone());
            }
        }
        recipients
    }

    async fn deliver(&self, request: &ReportRequest, report: &GeneratedReport) -> bool {
        let body = match tokio::fs::read_to_string(&report.path).await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Could not read the written report back");
                return false;
            }
        };
        let notification = Notification::new(self.recipients(request), request.name(), body)
            .with_attachments(report.images.clone());
        self.sink.send(&notification).await
    }

    async fn notify_failure(&self, request: &ReportRequest, err: &AnalystError) -> bool {
        let notification = Notification::new(
            self.recipients(request),
            format!("Report generation failed: {}", request.name()),
            format!(
                "The report could not be generated.\n\n{}\n\nNo report is attached.",
                err
            ),
        );
        self.sink.send(&notification).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::OutboxSink;
    use crate::orchestration::WorkerId;
    use crate::testing::{ScriptedProvider, ScriptedWorker};
    use crate::types::{Grouping, Period};
    use chrono::NaiveDate;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn config(temp: &TempDir, max_attempts: usize) -> Config {
        let mut config = Config::default();
        config.pipeline.max_attempts = max_attempts;
        config.pipeline.retry_delay_secs = 0;
        config.pipeline.analysis_date = NaiveDate::from_ymd_opt(2025, 3, 31);
        config.pipeline.temp_dir = temp.path().join("tmp");
        config.pipeline.outputs_dir = temp.path().join("outputs");
        config.notification.recipients = vec!["cfo@example.com".to_string()];
        let mut request = ReportRequest::grouped(Grouping::Country, "Spain", Period::Monthly);
        request.recipients = vec!["sales@example.com".to_string()];
        config.requests = vec![request];
        config
    }

    fn workers() -> WorkerSet {
        WorkerSet::new()
            .with(Arc::new(ScriptedWorker::new(
                WorkerId::InternalDataAgent,
                ["Sales history extracted"],
            )))
            .with(Arc::new(ScriptedWorker::new(
                WorkerId::QuantitativeAnalysisAgent,
                ["Sales are stable"],
            )))
            .with(Arc::new(ScriptedWorker::new(
                WorkerId::DataVisualizationAgent,
                ["chart"],
            )))
    }

    fn service(temp: &TempDir, max_attempts: usize, replies: Vec<Value>) -> ReportService {
        let provider = Arc::new(ScriptedProvider::new(replies));
        let sink = Arc::new(OutboxSink::new("analyst@example.com", &temp.path().join("outbox")));
        ReportService::new(config(temp, max_attempts), provider, sink).with_workers(workers())
    }

    fn outbox(temp: &TempDir) -> Vec<String> {
        std::fs::read_dir(temp.path().join("outbox"))
            .unwrap()
            .map(|e| std::fs::read_to_string(e.unwrap().path()).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_retries_then_delivers() {
        let temp = TempDir::new().unwrap();
        let replies = vec![
            // First attempt: a special case with no reason is rejected
            json!({"is_special_case": true, "special_case_reason": ""}),
            json!({"is_special_case": false, "special_case_reason": "Stable"}),
            json!({"reasoning": "r", "next_speaker": "document_writing_agent", "next_speaker_task": "Write."}),
            json!("# Sales Report"),
            json!({"reasoning": "r", "next_speaker": "report_complete", "next_speaker_task": "Done."}),
        ];
        let summary = service(&temp, 3, replies).run_all().await;

        assert_eq!(summary.succeeded(), 1);
        let outcome = &summary.outcomes[0];
        assert_eq!(outcome.attempts, 2);
        assert!(outcome.delivered);

        let report = outcome.result.as_ref().unwrap();
        let file_name = report.path.file_name().unwrap().to_string_lossy().to_string();
        assert!(file_name.ends_with("-Sales Report - Country - Spain_report.md"));
        assert_eq!(std::fs::read_to_string(&report.path).unwrap(), "# Sales Report");

        let messages = outbox(&temp);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("cfo@example.com"));
        assert!(messages[0].contains("sales@example.com"));
        assert!(messages[0].contains("# Sales Report"));
    }

    #[tokio::test]
    async fn test_grouping_value_with_slash_writes_one_file() {
        let temp = TempDir::new().unwrap();
        let mut config = config(&temp, 1);
        config.requests = vec![ReportRequest::grouped(
            Grouping::ProductFamily,
            "Food/Beverage",
            Period::Monthly,
        )];
        let provider = Arc::new(ScriptedProvider::new([
            json!({"is_special_case": false, "special_case_reason": "Stable"}),
            json!({"reasoning": "r", "next_speaker": "document_writing_agent", "next_speaker_task": "Write."}),
            json!("# Food and Beverage"),
            json!({"reasoning": "r", "next_speaker": "report_complete", "next_speaker_task": "Done."}),
        ]));
        let sink = Arc::new(OutboxSink::new("analyst@example.com", &temp.path().join("outbox")));
        let summary = ReportService::new(config, provider, sink)
            .with_workers(workers())
            .run_all()
            .await;

        let outcome = &summary.outcomes[0];
        let report = outcome.result.as_ref().unwrap();
        assert_eq!(outcome.attempts, 1);
        assert_eq!(report.path.parent().unwrap(), temp.path().join("outputs"));
        let file_name = report.path.file_name().unwrap().to_string_lossy().to_string();
        assert!(file_name.ends_with("-Sales Report - Product Family - Food_Beverage_report.md"));
        assert!(outcome.delivered);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_send_failure_notice() {
        let temp = TempDir::new().unwrap();
        let summary = service(&temp, 2, Vec::new()).run_all().await;

        assert_eq!(summary.failed(), 1);
        let outcome = &summary.outcomes[0];
        assert_eq!(outcome.attempts, 2);
        assert!(matches!(
            outcome.result,
            Err(AnalystError::ReportFailed { attempts: 2, .. })
        ));
        assert!(outcome.delivered);

        let messages = outbox(&temp);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Report generation failed: Sales Report - Country - Spain"));
        assert!(!temp.path().join("outputs").exists());
    }
}
