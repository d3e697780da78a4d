//! JSON Repair
//!
//! Structured replies from chat models are often wrapped or damaged:
//! - Markdown code fences (```json ... ```)
//! - Prose before or after the object
//! - Trailing commas
//! - Truncated output with unclosed strings, arrays or objects

use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{AnalystError, Result};

/// Extract and parse JSON from a model reply
pub fn extract_json_from_response(content: &str) -> Result<Value> {
    JsonRepairer::new().parse_or_repair(content).map(|(value, _)| value)
}

/// Repair strategies applied in order until one parses
#[derive(Debug, Default)]
pub struct JsonRepairer;

impl JsonRepairer {
    pub fn new() -> Self {
        Self
    }

    /// Parse JSON, attempting repair if the plain parse fails.
    ///
    /// Returns `(value, was_repaired)`.
    pub fn parse_or_repair(&self, raw: &str) -> Result<(Value, bool)> {
        let cleaned = strip_code_fences(raw.trim().trim_start_matches('\u{feff}'));

        if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
            return Ok((value, false));
        }
        debug!("Initial JSON parse failed, attempting repair");

        let embedded = extract_embedded(&cleaned);
        let candidates = [
            embedded.clone(),
            Some(balance(&remove_trailing_commas(&cleaned))),
            embedded.map(|e| balance(&remove_trailing_commas(&e))),
        ];

        for candidate in candidates.into_iter().flatten() {
            if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
                warn!("Model reply needed JSON repair");
                return Ok((value, true));
            }
        }

        Err(AnalystError::LlmApi(format!(
            "Failed to parse JSON from model reply. Content preview: {}...",
            cleaned.chars().take(200).collect::<String>()
        )))
    }
}

fn strip_code_fences(s: &str) -> String {
    let mut body = s;
    if body.starts_with("```")
        && let Some(first_newline) = body.find('\n')
    {
        body = &body[first_newline + 1..];
    }
    if let Some(stripped) = body.trim_end().strip_suffix("```") {
        body = stripped;
    }
    body.trim().to_string()
}

/// Drop commas that directly precede a closing bracket
fn remove_trailing_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escape = false;

    for (i, &ch) in chars.iter().enumerate() {
        if in_string {
            match ch {
                _ if escape => escape = false,
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            out.push(ch);
            continue;
        }
        if ch == '"' {
            in_string = true;
        } else if ch == ','
            && chars[i + 1..]
                .iter()
                .find(|c| !c.is_whitespace())
                .is_some_and(|c| matches!(c, ']' | '}'))
        {
            continue;
        }
        out.push(ch);
    }
    out
}

/// Close an unterminated string and any open arrays/objects, innermost first
fn balance(s: &str) -> String {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escape = false;

    for ch in s.chars() {
        if in_string {
            match ch {
                _ if escape => escape = false,
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut out = s.trim_end().to_string();
    if in_string {
        out.push('"');
    }
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}

/// First complete top-level object or array embedded in prose
fn extract_embedded(s: &str) -> Option<String> {
    let start = s.find(['{', '['])?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;

    for (i, ch) in s[start..].char_indices() {
        if in_string {
            match ch {
                _ if escape => escape = false,
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(s[start..start + i + 1].to_string());
                }
            }
            _ => {}
        }
    }

    // Unterminated: hand back the tail so balancing can close it
    Some(s[start..].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_json() {
        let (_, repaired) = JsonRepairer::new()
            .parse_or_repair(r#"{"key": "value"}"#)
            .unwrap();
        assert!(!repaired);
    }

    #[test]
    fn test_strip_code_fences() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        let (value, repaired) = JsonRepairer::new().parse_or_repair(input).unwrap();
        assert_eq!(value["key"], "value");
        assert!(!repaired);
    }

    #[test]
    fn test_fix_trailing_comma() {
        let input = r#"{"items": [{"a": 1},], "b": "x,]"}"#;
        let (value, repaired) = JsonRepairer::new().parse_or_repair(input).unwrap();
        assert!(repaired);
        assert!(value["items"].is_array());
        assert_eq!(value["b"], "x,]");
    }

    #[test]
    fn test_balance_truncated() {
        let input = r#"{"is_in_loop": {"reason": "repeats the same quer"#;
        let (value, repaired) = JsonRepairer::new().parse_or_repair(input).unwrap();
        assert!(repaired);
        assert_eq!(value["is_in_loop"]["reason"], "repeats the same quer");
    }

    #[test]
    fn test_extract_from_prose() {
        let input = "Here is my decision:\n{\"next_speaker\": \"report_complete\"}\nThanks!";
        let (value, repaired) = JsonRepairer::new().parse_or_repair(input).unwrap();
        assert!(repaired);
        assert_eq!(value["next_speaker"], "report_complete");
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(extract_json_from_response("no json here").is_err());
    }
}
