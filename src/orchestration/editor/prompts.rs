use crate::ai::{PromptBuilder, RenderedPrompt};
use crate::constants::editor::NO_REPORT_YET;

use super::types::EditorRoute;

pub fn supervisor_system() -> RenderedPrompt {
    PromptBuilder::new()
        .role(
            "You are the editor in chief of a business report. You decide who works \
             on the report next until it is ready to be sent to management.",
        )
        .list(
            "Team",
            [
                format!(
                    "{}: turns data files into charts saved as PNG files",
                    EditorRoute::DataVisualization
                ),
                format!(
                    "{}: writes and revises the full report text",
                    EditorRoute::DocumentWriting
                ),
            ],
        )
        .rules([
            "Ask for charts before asking for the text that presents them".to_string(),
            "Request one chart per visualization task".to_string(),
            format!(
                "Answer {} once the report is complete and every chart it needs is referenced",
                EditorRoute::Complete
            ),
            "Give the next speaker a concrete task with everything they need".to_string(),
        ])
        .render("editor/supervisor")
}

pub fn writer_system() -> RenderedPrompt {
    PromptBuilder::new()
        .role(
            "You are a business writer. You turn analysis notes into a concise \
             management report in Markdown.",
        )
        .objectives([
            "Open with a short executive summary",
            "Explain the figures and their drivers",
            "Reference every available chart by its file name",
        ])
        .rules([
            "Reply with the complete report, never with a partial diff",
            "Use only figures that appear in the conversation",
        ])
        .render("editor/writer")
}

/// Snapshot of the report, the available files and the previous route
pub fn report_snapshot(
    report: &str,
    files: &[String],
    last_speaker: Option<EditorRoute>,
) -> RenderedPrompt {
    let report_part = if report.trim().is_empty() {
        NO_REPORT_YET.to_string()
    } else {
        format!("This is the current report:\n\n{}", report)
    };
    let files_part = if files.is_empty() {
        "none".to_string()
    } else {
        files.join(", ")
    };
    let last = last_speaker.map_or("none", |r| r.as_str());

    PromptBuilder::new()
        .text(report_part)
        .text(format!("The following files are available: {}", files_part))
        .text(format!("Last speaker: {}", last))
        .render("editor/report_snapshot")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_without_report() {
        let text = report_snapshot("", &[], None).text;
        assert!(text.starts_with(NO_REPORT_YET));
        assert!(text.contains("The following files are available: none"));
        assert!(text.ends_with("Last speaker: none"));
    }

    #[test]
    fn test_snapshot_with_report() {
        let files = vec!["sales.png".to_string(), "sales_history.csv".to_string()];
        let text = report_snapshot(
            "# Sales Report",
            &files,
            Some(EditorRoute::DocumentWriting),
        )
        .text;
        assert!(text.contains("This is the current report:\n\n# Sales Report"));
        assert!(text.contains("sales.png, sales_history.csv"));
        assert!(text.contains("Last speaker: document_writing_agent"));
    }
}
