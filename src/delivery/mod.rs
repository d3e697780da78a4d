//! Report Delivery
//!
//! Notification sinks for finished reports and failure notices. A sink
//! reports success as a boolean and never returns an error to the caller.

mod outbox;

pub use outbox::OutboxSink;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::{NotificationConfig, SinkKind};

/// One outgoing notification
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<PathBuf>,
}

impl Notification {
    pub fn new(
        recipients: Vec<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipients,
            subject: subject.into(),
            body: body.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<PathBuf>) -> Self {
        self.attachments = attachments;
        self
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver `notification`; `false` when delivery failed
    async fn send(&self, notification: &Notification) -> bool;
}

pub type SharedSink = Arc<dyn NotificationSink>;

/// Sink that only records deliveries in the log
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, notification: &Notification) -> bool {
        info!(
            recipients = %notification.recipients.join(", "),
            subject = %notification.subject,
            attachments = notification.attachments.len(),
            "Notification"
        );
        true
    }
}

pub fn create_sink(config: &NotificationConfig) -> SharedSink {
    match config.sink {
        SinkKind::Outbox => Arc::new(OutboxSink::new(&config.sender, &config.outbox_dir)),
        SinkKind::Log => Arc::new(LogSink),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_sink_always_succeeds() {
        let config = NotificationConfig {
            sink: SinkKind::Log,
            ..Default::default()
        };
        let sink = create_sink(&config);
        assert_eq!(sink.name(), "log");
        assert!(sink.send(&Notification::new(vec![], "s", "b")).await);
    }
}
