//! Conversation messages
//!
//! A message is one role-tagged turn in a conversation. Message order is the
//! dialogue history, so collections of messages are only ever appended to.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Speaker role of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Human,
    Assistant,
}

impl Role {
    /// Role name used on the chat-completions wire
    pub fn as_chat_role(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Human => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::Human => write!(f, "human"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A role-tagged content unit, optionally carrying file attachments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Files attached to this turn (charts, data extracts)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<PathBuf>,
    /// Name of the worker or node that produced this message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            attachments: Vec::new(),
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::new(Role::Human, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Tag the message with the name of its producer
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_attachments(mut self, attachments: impl IntoIterator<Item = PathBuf>) -> Self {
        self.attachments.extend(attachments);
        self
    }

    /// Content as sent to a chat model, with attachment paths listed inline
    pub fn rendered_content(&self) -> String {
        if self.attachments.is_empty() {
            return self.content.clone();
        }

        let listing = self
            .attachments
            .iter()
            .map(|p| format!("- {}", p.display()))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}\n\nAttached files:\n{}", self.content, listing)
    }
}

/// Concatenate message contents into a single transcript
pub fn transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| match &m.name {
            Some(name) => format!("[{} ({})]\n{}", m.role, name, m.content),
            None => format!("[{}]\n{}", m.role, m.content),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_role() {
        assert_eq!(Message::system("s").role, Role::System);
        assert_eq!(Message::human("h").role, Role::Human);
        assert_eq!(Message::assistant("a").role, Role::Assistant);
    }

    #[test]
    fn test_rendered_content_lists_attachments() {
        let msg = Message::human("See chart")
            .with_attachments([PathBuf::from("/tmp/t1/sales.png")]);
        let rendered = msg.rendered_content();
        assert!(rendered.starts_with("See chart"));
        assert!(rendered.contains("/tmp/t1/sales.png"));

        assert_eq!(Message::human("plain").rendered_content(), "plain");
    }

    #[test]
    fn test_chat_role_mapping() {
        assert_eq!(Role::Human.as_chat_role(), "user");
        assert_eq!(Role::Assistant.as_chat_role(), "assistant");
    }

    #[test]
    fn test_transcript_includes_names() {
        let messages = vec![
            Message::human("task"),
            Message::assistant("done").named("quantitative_analysis_agent"),
        ];
        let text = transcript(&messages);
        assert!(text.contains("[human]\ntask"));
        assert!(text.contains("[assistant (quantitative_analysis_agent)]\ndone"));
    }
}
