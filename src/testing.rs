//! Scripted collaborators for unit tests

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::ai::{LlmProvider, LlmResponse, ResponseMetadata, ResponseTiming, TokenUsage};
use crate::orchestration::team::WorkerId;
use crate::orchestration::worker::{Worker, WorkerOutput};
use crate::types::{AnalystError, Message, Result};

/// One call received by a [`ScriptedProvider`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub schema: Option<Value>,
    pub structured: bool,
}

/// Provider replaying queued replies in order and recording every request.
///
/// Fails with an API error once the queue is empty.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Value>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: impl IntoIterator<Item = Value>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate(&self, messages: &[Message], schema: Option<&Value>) -> Result<LlmResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages: messages.to_vec(),
            schema: schema.cloned(),
            structured: schema.is_some(),
        });

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AnalystError::LlmApi("scripted provider exhausted".to_string()))?;

        Ok(LlmResponse::with_metrics(
            reply,
            TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
            },
            ResponseTiming { total_ms: 1 },
            ResponseMetadata {
                model: "scripted".to_string(),
                provider: "scripted".to_string(),
            },
        ))
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Worker replaying queued outputs; the last output repeats once the queue
/// runs dry.
pub struct ScriptedWorker {
    id: WorkerId,
    outputs: Mutex<VecDeque<WorkerOutput>>,
    last: Mutex<Option<WorkerOutput>>,
    received: Mutex<Vec<Vec<Message>>>,
    calls: AtomicUsize,
}

impl ScriptedWorker {
    pub fn new<'a>(id: WorkerId, outputs: impl IntoIterator<Item = &'a str>) -> Self {
        Self::with_outputs(id, outputs.into_iter().map(WorkerOutput::success))
    }

    pub fn with_outputs(id: WorkerId, outputs: impl IntoIterator<Item = WorkerOutput>) -> Self {
        Self {
            id,
            outputs: Mutex::new(outputs.into_iter().collect()),
            last: Mutex::new(None),
            received: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Messages handed to each run, in call order
    pub fn received(&self) -> Vec<Vec<Message>> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl Worker for ScriptedWorker {
    fn id(&self) -> WorkerId {
        self.id
    }

    async fn run(&self, messages: &[Message]) -> Result<WorkerOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().unwrap().push(messages.to_vec());

        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.outputs.lock().unwrap().pop_front() {
            *last = Some(next);
        }
        last.clone()
            .ok_or_else(|| AnalystError::worker(self.id.as_str(), "no scripted output"))
    }
}
