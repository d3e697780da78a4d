use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use super::{Notification, NotificationSink};

/// Front matter written above every outbox message
#[derive(Debug, Serialize)]
struct Envelope<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    date: String,
    attachments: Vec<String>,
}

/// Writes each notification as a Markdown file with TOML front matter
#[derive(Debug, Clone)]
pub struct OutboxSink {
    sender: String,
    dir: PathBuf,
}

impl OutboxSink {
    pub fn new(sender: &str, dir: &Path) -> Self {
        Self {
            sender: sender.to_string(),
            dir: dir.to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn render(&self, notification: &Notification) -> Result<String, toml::ser::Error> {
        let envelope = Envelope {
            from: &self.sender,
            to: &notification.recipients,
            subject: &notification.subject,
            date: Utc::now().to_rfc3339(),
            attachments: notification
                .attachments
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
        };
        Ok(format!(
            "+++\n{}+++\n\n{}\n",
            toml::to_string(&envelope)?,
            notification.body
        ))
    }

    async fn write(&self, notification: &Notification) -> std::io::Result<PathBuf> {
        let content = self
            .render(notification)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let id = Uuid::new_v4().simple().to_string();
        let path = self.dir.join(format!(
            "{}-{}.md",
            Utc::now().format("%Y%m%dT%H%M%S"),
            &id[..8]
        ));
        tokio::fs::write(&path, content).await?;
        Ok(path)
    }
}

#[async_trait]
impl NotificationSink for OutboxSink {
    fn name(&self) -> &str {
        "outbox"
    }

    async fn send(&self, notification: &Notification) -> bool {
        if notification.recipients.is_empty() {
            warn!(subject = %notification.subject, "No recipients, notification not sent");
            return false;
        }
        match self.write(notification).await {
            Ok(path) => {
                info!(path = %path.display(), subject = %notification.subject, "Notification queued");
                true
            }
            Err(e) => {
                warn!(error = %e, subject = %notification.subject, "Failed to queue notification");
                false
            }
        }
    }
}
