use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::EditorConfig;
use crate::constants::editor;
use crate::types::Message;

/// Destinations the supervisor may choose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditorRoute {
    #[serde(rename = "report_complete")]
    Complete,
    #[serde(rename = "data_visualization_agent")]
    DataVisualization,
    #[serde(rename = "document_writing_agent")]
    DocumentWriting,
}

impl EditorRoute {
    pub const ALL: [EditorRoute; 3] = [
        EditorRoute::Complete,
        EditorRoute::DataVisualization,
        EditorRoute::DocumentWriting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "report_complete",
            Self::DataVisualization => "data_visualization_agent",
            Self::DocumentWriting => "document_writing_agent",
        }
    }
}

impl std::fmt::Display for EditorRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supervisor decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Router {
    pub reasoning: String,
    pub next_speaker: EditorRoute,
    /// Task for `next_speaker`, phrased as direct address
    pub next_speaker_task: String,
}

impl Router {
    pub fn schema() -> Value {
        let routes: Vec<&str> = EditorRoute::ALL.iter().map(|r| r.as_str()).collect();
        json!({
            "type": "object",
            "properties": {
                "reasoning": {
                    "type": "string",
                    "description": "Why this speaker is next, including the report changes that trigger the choice"
                },
                "next_speaker": {
                    "type": "string",
                    "enum": routes,
                    "description": "The next speaker; use report_complete when the report is finished"
                },
                "next_speaker_task": {
                    "type": "string",
                    "description": "The task for the next speaker, stated as if talking directly to them"
                },
            },
            "required": ["reasoning", "next_speaker", "next_speaker_task"],
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorNode {
    Supervisor,
    DataVisualization,
    DocumentWriting,
}

impl std::fmt::Display for EditorNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Supervisor => write!(f, "supervisor"),
            Self::DataVisualization => write!(f, "data_visualization_agent"),
            Self::DocumentWriting => write!(f, "document_writing_agent"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorLimits {
    pub max_writer_loops: usize,
    pub max_visualization_loops: usize,
    pub max_supervisor_turns: usize,
}

impl Default for EditorLimits {
    fn default() -> Self {
        Self {
            max_writer_loops: editor::MAX_WRITER_LOOPS,
            max_visualization_loops: editor::MAX_VISUALIZATION_LOOPS,
            max_supervisor_turns: editor::MAX_SUPERVISOR_TURNS,
        }
    }
}

impl From<&EditorConfig> for EditorLimits {
    fn from(config: &EditorConfig) -> Self {
        Self {
            max_writer_loops: config.max_writer_loops,
            max_visualization_loops: config.max_visualization_loops,
            max_supervisor_turns: config.max_supervisor_turns,
        }
    }
}

/// Editorial state of one report
#[derive(Debug, Clone)]
pub struct EditorState {
    pub messages: Vec<Message>,
    /// Latest full report, replaced by every writing pass
    pub report: String,
    /// Route chosen by the previous supervisor decision
    pub next_speaker: Option<EditorRoute>,
    /// Consecutive re-selections of the same route
    pub loop_count: usize,
    pub supervisor_turns: usize,
    pub limits: EditorLimits,
}

impl EditorState {
    pub fn new(messages: Vec<Message>, limits: EditorLimits) -> Self {
        Self {
            messages,
            report: String::new(),
            next_speaker: None,
            loop_count: 0,
            supervisor_turns: 0,
            limits,
        }
    }
}

/// Partial update returned by an editor node
#[derive(Debug, Clone, Default)]
pub struct EditorUpdate {
    pub messages: Vec<Message>,
    pub report: Option<String>,
    pub next_speaker: Option<EditorRoute>,
    pub loop_count: Option<usize>,
    pub supervisor_turns: Option<usize>,
}

impl EditorState {
    pub(super) fn merge(mut self, update: EditorUpdate) -> Self {
        self.messages.extend(update.messages);
        if let Some(report) = update.report {
            self.report = report;
        }
        if let Some(route) = update.next_speaker {
            self.next_speaker = Some(route);
        }
        if let Some(count) = update.loop_count {
            self.loop_count = count;
        }
        if let Some(turns) = update.supervisor_turns {
            self.supervisor_turns = turns;
        }
        self
    }
}
