//! Prompt Builder System
//!
//! Standardized prompt construction for every model call in the graphs.
//!
//! ## Design Principles
//!
//! 1. **Role Definition**: one paragraph saying who the model is
//! 2. **Structured Objectives**: numbered goals
//! 3. **Context Sections**: ordered key/value inputs
//! 4. **Rules**: hard constraints on the answer
//!
//! Every prompt is rendered into a [`RenderedPrompt`] that remembers which
//! template produced it, so callers can tell a create-path prompt from an
//! update-path one.

use crate::types::Message;

/// Prompt section types
#[derive(Debug, Clone)]
pub enum PromptSection {
    /// Free-text role definition
    Role(String),
    /// Numbered objectives
    Objectives(Vec<String>),
    /// Ordered key/value inputs
    Context(Vec<(String, String)>),
    /// Raw text section with optional header
    Text {
        header: Option<String>,
        content: String,
    },
    /// Bulleted list with header
    List { header: String, items: Vec<String> },
    /// Hard constraints on the answer
    Rules(Vec<String>),
}

/// Prompt builder for consistent prompt construction
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.sections.push(PromptSection::Role(role.into()));
        self
    }

    pub fn objectives<I, S>(mut self, objectives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sections.push(PromptSection::Objectives(
            objectives.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Add a context item, appending to the first context section
    pub fn context_item(mut self, key: &str, value: impl Into<String>) -> Self {
        let entry = (key.to_string(), value.into());
        if let Some(PromptSection::Context(items)) = self
            .sections
            .iter_mut()
            .find(|s| matches!(s, PromptSection::Context(_)))
        {
            items.push(entry);
        } else {
            self.sections.push(PromptSection::Context(vec![entry]));
        }
        self
    }

    pub fn text(mut self, content: impl Into<String>) -> Self {
        self.sections.push(PromptSection::Text {
            header: None,
            content: content.into(),
        });
        self
    }

    /// Add text section with header; skipped when `content` is blank
    pub fn section(mut self, header: &str, content: impl Into<String>) -> Self {
        let content = content.into();
        if content.trim().is_empty() {
            return self;
        }
        self.sections.push(PromptSection::Text {
            header: Some(header.to_string()),
            content,
        });
        self
    }

    pub fn list<I, S>(mut self, header: &str, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sections.push(PromptSection::List {
            header: header.to_string(),
            items: items.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sections.push(PromptSection::Rules(
            rules.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Build the final prompt string
    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Role(role) => {
                    prompt.push_str("<ROLE>\n");
                    prompt.push_str(role.trim());
                    prompt.push_str("\n</ROLE>\n\n");
                }
                PromptSection::Objectives(objectives) => {
                    prompt.push_str("<OBJECTIVES>\n");
                    for (i, obj) in objectives.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, obj));
                    }
                    prompt.push_str("</OBJECTIVES>\n\n");
                }
                PromptSection::Context(items) => {
                    prompt.push_str("# Context\n\n");
                    for (key, value) in items {
                        prompt.push_str(&format!("**{}**: {}\n", key, value));
                    }
                    prompt.push('\n');
                }
                PromptSection::Text { header, content } => {
                    if let Some(h) = header {
                        prompt.push_str(&format!("# {}\n\n", h));
                    }
                    prompt.push_str(content.trim_end());
                    prompt.push_str("\n\n");
                }
                PromptSection::List { header, items } => {
                    prompt.push_str(&format!("# {}\n\n", header));
                    for item in items {
                        prompt.push_str(&format!("- {}\n", item));
                    }
                    prompt.push('\n');
                }
                PromptSection::Rules(rules) => {
                    prompt.push_str("<RULES>\n");
                    for rule in rules {
                        prompt.push_str(&format!("- {}\n", rule));
                    }
                    prompt.push_str("</RULES>\n\n");
                }
            }
        }

        prompt.trim_end().to_string()
    }

    /// Build and tag with the template name
    pub fn render(self, template: &'static str) -> RenderedPrompt {
        RenderedPrompt {
            template,
            text: self.build(),
        }
    }
}

/// A prompt together with the template that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub template: &'static str,
    pub text: String,
}

impl RenderedPrompt {
    pub fn into_system(self) -> Message {
        Message::system(self.text)
    }

    pub fn into_human(self) -> Message {
        Message::human(self.text)
    }
}
