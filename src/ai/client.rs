//! Model Client
//!
//! The invocation interface the graphs talk to. Wraps a provider (or a
//! provider chain) and attributes every call to the graph node that made it.
//! Calls carry no hidden state: everything the model sees is in `messages`.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use super::metrics::SharedMetrics;
use super::provider::SharedProvider;
use super::validation::decode_structured;
use crate::types::{AnalystError, Message, Result};

#[derive(Clone)]
pub struct ModelClient {
    provider: SharedProvider,
    metrics: SharedMetrics,
}

impl ModelClient {
    pub fn new(provider: SharedProvider, metrics: SharedMetrics) -> Self {
        Self { provider, metrics }
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    /// Free-text completion; the reply comes back as an assistant message
    pub async fn invoke(&self, node: &str, messages: &[Message]) -> Result<Message> {
        let reply = self.invoke_allow_empty(node, messages).await?;
        if reply.content.trim().is_empty() {
            return Err(AnalystError::LlmApi(format!(
                "{} returned an empty reply for {}",
                self.provider.name(),
                node
            )));
        }
        Ok(reply)
    }

    /// Like [`invoke`](Self::invoke), but an empty reply is returned as is.
    /// Workers use this so the caller can judge the result.
    #[instrument(skip(self, messages), fields(messages = messages.len()))]
    pub async fn invoke_allow_empty(&self, node: &str, messages: &[Message]) -> Result<Message> {
        let response = self.provider.generate(messages, None).await?;
        self.metrics.record_response(node, &response);

        let text = response.text();
        debug!(chars = text.len(), "Model replied");
        Ok(Message::assistant(text))
    }

    /// Structured completion decoded into `T`
    #[instrument(skip(self, messages, schema), fields(messages = messages.len()))]
    pub async fn invoke_structured<T: DeserializeOwned>(
        &self,
        node: &str,
        messages: &[Message],
        schema: &Value,
    ) -> Result<T> {
        let response = self.provider.generate(messages, Some(schema)).await?;
        self.metrics.record_response(node, &response);
        decode_structured(node, response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::metrics::create_shared_metrics;
    use crate::testing::ScriptedProvider;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Debug, Deserialize)]
    struct Flag {
        answer: bool,
    }

    #[tokio::test]
    async fn test_invoke_records_metrics() {
        let provider = Arc::new(ScriptedProvider::new([json!("hello there")]));
        let client = ModelClient::new(provider.clone(), create_shared_metrics("t"));

        let reply = client.invoke("node.a", &[Message::human("hi")]).await.unwrap();
        assert_eq!(reply.content, "hello there");
        assert_eq!(client.metrics().summary().nodes["node.a"].calls, 1);
        assert!(!provider.requests()[0].structured);
    }

    #[tokio::test]
    async fn test_invoke_structured_decodes() {
        let provider = Arc::new(ScriptedProvider::new([json!({"answer": true})]));
        let client = ModelClient::new(provider.clone(), create_shared_metrics("t"));

        let flag: Flag = client
            .invoke_structured("node.b", &[Message::human("?")], &json!({"type": "object"}))
            .await
            .unwrap();
        assert!(flag.answer);
        assert!(provider.requests()[0].structured);
    }

    #[tokio::test]
    async fn test_empty_reply_is_error() {
        let provider = Arc::new(ScriptedProvider::new([json!("   ")]));
        let client = ModelClient::new(provider, create_shared_metrics("t"));
        assert!(client.invoke("node.c", &[Message::human("hi")]).await.is_err());
    }

    #[tokio::test]
    async fn test_allow_empty_returns_blank_reply() {
        let provider = Arc::new(ScriptedProvider::new([json!("")]));
        let client = ModelClient::new(provider, create_shared_metrics("t"));
        let reply = client
            .invoke_allow_empty("node.e", &[Message::human("hi")])
            .await
            .unwrap();
        assert!(reply.content.is_empty());
        assert_eq!(client.metrics().summary().nodes["node.e"].calls, 1);
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<serde_json::Value>::new()));
        let client = ModelClient::new(provider, create_shared_metrics("t"));
        assert!(client.invoke("node.d", &[Message::human("hi")]).await.is_err());
    }
}
