//! Message conversion shared by the chat providers.

use serde::Serialize;
use serde_json::Value;

use crate::types::Message;

/// Wire form of a chat message, common to OpenAI and Ollama
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// Instruction appended for structured replies
pub fn schema_instruction(schema: &Value) -> String {
    let schema_str = serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
    format!(
        "Respond with valid JSON matching this schema:\n```json\n{}\n```\n\nRespond ONLY with valid JSON, no explanation.",
        schema_str
    )
}

/// Convert a message history into chat wire messages.
///
/// When a schema is given, its instruction is appended as a trailing system
/// message so it is the last thing the model reads.
pub fn to_chat_messages(messages: &[Message], schema: Option<&Value>) -> Vec<ChatMessage> {
    let mut chat: Vec<ChatMessage> = messages
        .iter()
        .map(|m| ChatMessage {
            role: m.role.as_chat_role(),
            content: m.rendered_content(),
        })
        .collect();

    if let Some(schema) = schema {
        chat.push(ChatMessage {
            role: "system",
            content: schema_instruction(schema),
        });
    }

    chat
}
