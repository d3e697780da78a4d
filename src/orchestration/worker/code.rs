//! Code-executing worker
//!
//! The model answers either with a fenced Python block, which is executed in
//! the request scope, or with plain text, which ends the run. Failed
//! executions get a tool-error notice and a review turn. After `max_errors`
//! consecutive failures or `max_iterations` executions the model is told to
//! stop and answer.

use async_trait::async_trait;
use regex::Regex;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use super::{Worker, WorkerOutput, WorkerStatus, is_invalid_worker_result, node_name, prompts};
use crate::ai::{ModelClient, RenderedPrompt};
use crate::config::WorkerConfig;
use crate::constants::worker::{DATA_DIR_ENV, MAX_OUTPUT_CHARS};
use crate::orchestration::artifacts::ArtifactScope;
use crate::orchestration::team::WorkerId;
use crate::types::{AnalystError, Message, Result};

static PYTHON_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:python|py)[ \t]*\r?\n(.*?)```").expect("python block pattern is valid")
});

/// Python blocks in a model reply, joined in order
pub(crate) fn extract_code(reply: &str) -> Option<String> {
    let blocks: Vec<&str> = PYTHON_BLOCK
        .captures_iter(reply)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim_end())
        .filter(|code| !code.trim().is_empty())
        .collect();

    if blocks.is_empty() {
        None
    } else {
        Some(blocks.join("\n\n"))
    }
}

#[derive(Debug)]
struct Execution {
    status: WorkerStatus,
    output: String,
}

pub struct CodeWorker {
    id: WorkerId,
    system_prompt: Message,
    client: ModelClient,
    scope: ArtifactScope,
    python: String,
    data_dir: Option<std::path::PathBuf>,
    max_iterations: usize,
    max_errors: usize,
    code_timeout: Duration,
}

impl CodeWorker {
    pub fn new(
        id: WorkerId,
        system_prompt: RenderedPrompt,
        client: ModelClient,
        scope: ArtifactScope,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            id,
            system_prompt: system_prompt.into_system(),
            client,
            scope,
            python: config.python.clone(),
            data_dir: config.data_dir.clone(),
            max_iterations: config.max_iterations,
            max_errors: config.max_errors,
            code_timeout: Duration::from_secs(config.code_timeout_secs),
        }
    }

    async fn execute(&self, code: &str) -> Result<Execution> {
        let mut cmd = Command::new(&self.python);
        cmd.arg("-")
            .current_dir(self.scope.root())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.data_dir {
            cmd.env(DATA_DIR_ENV, dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            AnalystError::worker(
                self.id.as_str(),
                format!("failed to start '{}': {}", self.python, e),
            )
        })?;

        // Dropping stdin closes it so the interpreter sees end of input
        if let Some(mut stdin) = child.stdin.take()
            && let Err(e) = stdin.write_all(code.as_bytes()).await
            && e.kind() != std::io::ErrorKind::BrokenPipe
        {
            return Err(e.into());
        }

        let output = match timeout(self.code_timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Ok(Execution {
                    status: WorkerStatus::Error,
                    output: format!(
                        "TimeoutError: execution exceeded {}s",
                        self.code_timeout.as_secs()
                    ),
                });
            }
        };

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&stderr);
        }
        if text.chars().count() > MAX_OUTPUT_CHARS {
            text = text.chars().take(MAX_OUTPUT_CHARS).collect();
            text.push_str("\n[output truncated]");
        }

        Ok(Execution {
            status: if output.status.success() {
                WorkerStatus::Success
            } else {
                WorkerStatus::Error
            },
            output: text,
        })
    }

    /// Ask a reviewer why the last execution failed
    async fn review(&self, history: &[Message]) -> Result<Message> {
        let mut request = Vec::with_capacity(history.len() + 1);
        request.push(prompts::code_review().into_system());
        request.extend_from_slice(history);

        let node = format!("{}.review", node_name(self.id));
        let reply = self.client.invoke_allow_empty(&node, &request).await?;
        Ok(Message::human(format!("Code review:\n{}", reply.content)).named("code_review"))
    }

    fn finish(&self, content: String, status: WorkerStatus) -> WorkerOutput {
        let mentioned = ArtifactScope::files_mentioned(&content);
        let artifacts = self.scope.existing(&mentioned);
        let output = match status {
            WorkerStatus::Success => WorkerOutput::success(content),
            WorkerStatus::Error => WorkerOutput::error(content),
        };
        output.with_artifacts(artifacts)
    }
}

#[async_trait]
impl Worker for CodeWorker {
    fn id(&self) -> WorkerId {
        self.id
    }

    #[instrument(skip(self, messages), fields(worker = %self.id))]
    async fn run(&self, messages: &[Message]) -> Result<WorkerOutput> {
        let node = node_name(self.id);
        let mut conversation = messages.to_vec();
        let mut iterations = 0usize;
        let mut errors = 0usize;
        let mut forced: Option<WorkerStatus> = None;

        loop {
            let mut request = Vec::with_capacity(conversation.len() + 1);
            request.push(self.system_prompt.clone());
            request.extend(conversation.iter().cloned());
            let reply = self.client.invoke_allow_empty(&node, &request).await?;

            if let Some(status) = forced {
                return Ok(self.finish(reply.content, status));
            }
            let Some(code) = extract_code(&reply.content) else {
                return Ok(self.finish(reply.content, WorkerStatus::Success));
            };
            conversation.push(reply);

            let execution = self.execute(&code).await?;
            iterations += 1;
            let invalid = is_invalid_worker_result(execution.status, &execution.output);
            errors = if invalid { errors + 1 } else { 0 };
            debug!(iterations, errors, invalid, "Code executed");

            conversation.push(
                Message::human(format!("Execution output:\n{}", execution.output)).named("python"),
            );

            if errors >= self.max_errors || iterations >= self.max_iterations {
                warn!(
                    iterations,
                    errors, "Execution budget spent, asking for the final answer"
                );
                conversation.push(prompts::diagnose_progress().into_human());
                forced = Some(if errors >= self.max_errors {
                    WorkerStatus::Error
                } else {
                    WorkerStatus::Success
                });
            } else if invalid {
                conversation.push(prompts::tool_error().into_human());
                let review = self.review(&conversation[..conversation.len() - 1]).await?;
                conversation.push(review);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::create_shared_metrics;
    use crate::testing::ScriptedProvider;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tempfile::TempDir;

    // `sh -` reads its script from stdin, like `python3 -`
    fn worker(temp: &TempDir, replies: Vec<Value>, max_errors: usize) -> (CodeWorker, Arc<ScriptedProvider>) {
        let scope = ArtifactScope::new(temp.path(), "t1");
        scope.ensure_dir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(replies));
        let client = ModelClient::new(provider.clone(), create_shared_metrics("t1"));
        let config = WorkerConfig {
            python: "sh".to_string(),
            max_errors,
            max_iterations: 10,
            code_timeout_secs: 10,
            ..Default::default()
        };
        let prompt = prompts::system_prompt(WorkerId::QuantitativeAnalysisAgent, &scope, &config);
        (
            CodeWorker::new(WorkerId::QuantitativeAnalysisAgent, prompt, client, scope, &config),
            provider,
        )
    }

    #[test]
    fn test_extract_code() {
        let reply = "Let me check.\n```python\nprint(1)\n```\nand\n```py\nprint(2)\n```";
        assert_eq!(extract_code(reply).unwrap(), "print(1)\n\nprint(2)");
        assert!(extract_code("Total sales were 1.2M EUR.").is_none());
        assert!(extract_code("```sql\nselect 1\n```").is_none());
    }

    #[tokio::test]
    async fn test_runs_code_then_answers() {
        let temp = TempDir::new().unwrap();
        let (worker, provider) = worker(
            &temp,
            vec![
                json!("```python\necho 42 > result.csv\necho saved\n```"),
                json!("The result is in result.csv"),
            ],
            3,
        );

        let output = worker.run(&[Message::human("Compute")]).await.unwrap();
        assert_eq!(output.status, WorkerStatus::Success);
        assert_eq!(output.artifacts.len(), 1);
        assert!(output.artifacts[0].ends_with("result.csv"));

        let second = &provider.requests()[1].messages;
        let last = second.last().unwrap();
        assert_eq!(last.name.as_deref(), Some("python"));
        assert!(last.content.contains("saved"));
    }

    #[tokio::test]
    async fn test_failed_execution_gets_review() {
        let temp = TempDir::new().unwrap();
        let (worker, provider) = worker(
            &temp,
            vec![
                json!("```python\nexit 3\n```"),
                json!("The script exits early; remove the exit."),
                json!("Done, nothing to report."),
            ],
            3,
        );

        let output = worker.run(&[Message::human("Compute")]).await.unwrap();
        assert_eq!(output.status, WorkerStatus::Success);

        let requests = provider.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[1].messages[0].content.contains("senior Python reviewer"));
        let final_request = &requests[2].messages;
        assert_eq!(
            final_request.last().unwrap().name.as_deref(),
            Some("code_review")
        );
    }

    #[tokio::test]
    async fn test_error_budget_forces_answer() {
        let temp = TempDir::new().unwrap();
        let (worker, provider) = worker(
            &temp,
            vec![
                json!("```python\nexit 1\n```"),
                json!("Exit status 1 comes from the explicit exit."),
                json!("```python\nexit 1\n```"),
                json!("```python\necho still trying\n```"),
            ],
            2,
        );

        let output = worker.run(&[Message::human("Compute")]).await.unwrap();
        // The reply after the budget is spent is final even though it holds code
        assert_eq!(output.status, WorkerStatus::Error);
        assert!(output.content.contains("still trying"));

        let requests = provider.requests();
        let last_turn = requests.last().unwrap().messages.last().unwrap().clone();
        assert!(last_turn.content.starts_with("Stop running code"));
    }
}
