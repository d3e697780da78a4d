use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{Worker, WorkerOutput, node_name};
use crate::ai::{ModelClient, RenderedPrompt};
use crate::orchestration::artifacts::ArtifactScope;
use crate::orchestration::team::WorkerId;
use crate::types::{Message, Result};

/// Worker answering with a single model call
pub struct LlmWorker {
    id: WorkerId,
    system_prompt: Message,
    client: ModelClient,
    scope: ArtifactScope,
}

impl LlmWorker {
    pub fn new(
        id: WorkerId,
        system_prompt: RenderedPrompt,
        client: ModelClient,
        scope: ArtifactScope,
    ) -> Self {
        Self {
            id,
            system_prompt: system_prompt.into_system(),
            client,
            scope,
        }
    }
}

#[async_trait]
impl Worker for LlmWorker {
    fn id(&self) -> WorkerId {
        self.id
    }

    #[instrument(skip(self, messages), fields(worker = %self.id))]
    async fn run(&self, messages: &[Message]) -> Result<WorkerOutput> {
        let mut request = Vec::with_capacity(messages.len() + 1);
        request.push(self.system_prompt.clone());
        request.extend_from_slice(messages);

        let reply = self
            .client
            .invoke_allow_empty(&node_name(self.id), &request)
            .await?;
        let mentioned = ArtifactScope::files_mentioned(&reply.content);
        let artifacts = self.scope.existing(&mentioned);
        debug!(mentioned = mentioned.len(), found = artifacts.len(), "Worker finished");

        Ok(WorkerOutput::success(reply.content).with_artifacts(artifacts))
    }
}
