//! Worker prompts

use crate::ai::{PromptBuilder, RenderedPrompt};
use crate::config::WorkerConfig;
use crate::constants::worker::DATA_DIR_ENV;
use crate::orchestration::artifacts::ArtifactScope;
use crate::orchestration::team::WorkerId;

/// System prompt of a worker
pub fn system_prompt(id: WorkerId, scope: &ArtifactScope, config: &WorkerConfig) -> RenderedPrompt {
    let builder = match id {
        WorkerId::InternalDataAgent => PromptBuilder::new()
            .role(
                "You are the internal data analyst of the company. You retrieve sales \
                 and operational figures from the company's data extracts and hand \
                 them over as clean tables.",
            )
            .objectives([
                "Locate the data needed for the request",
                "Save every extract you produce as a CSV file",
                "Summarize what each extract contains",
            ]),
        WorkerId::QuantitativeAnalysisAgent => PromptBuilder::new()
            .role(
                "You are a quantitative analyst. You load data files, run calculations \
                 and report the figures that explain business performance.",
            )
            .objectives([
                "Compute the KPIs and trends the request asks for",
                "Quantify deviations against previous periods",
                "State every figure with its unit and period",
            ]),
        WorkerId::DataVisualizationAgent => PromptBuilder::new()
            .role(
                "You are a data visualization specialist. You turn data files into \
                 clear charts for a business report.",
            )
            .objectives([
                "Choose the chart that best shows the requested comparison",
                "Save each chart as a PNG file",
                "Describe what each chart shows in one sentence",
            ]),
    };

    let mut builder = builder.context_item("Working directory", scope.root().display().to_string());
    if let Some(data_dir) = &config.data_dir {
        builder = builder.context_item("Source data", data_dir.display().to_string());
    }

    let mut rules = vec![
        "Write files only inside the working directory".to_string(),
        "Mention every file you create by its file name".to_string(),
    ];
    if config.execute_code {
        rules.push(
            "To run code, reply with a single ```python fenced block; reply without code once you have the final answer"
                .to_string(),
        );
        rules.push(format!(
            "The source data directory is also available in the {} environment variable",
            DATA_DIR_ENV
        ));
    }

    builder.rules(rules).render(match id {
        WorkerId::InternalDataAgent => "worker/internal_data",
        WorkerId::QuantitativeAnalysisAgent => "worker/quantitative_analysis",
        WorkerId::DataVisualizationAgent => "worker/data_visualization",
    })
}

/// Human turn appended after a failed execution
pub fn tool_error() -> RenderedPrompt {
    PromptBuilder::new()
        .text(
            "The last execution failed. Read the error output, fix the code and run \
             it again. Do not repeat code that already failed.",
        )
        .render("worker/tool_error")
}

/// System prompt of the reviewer consulted after a failed execution
pub fn code_review() -> RenderedPrompt {
    PromptBuilder::new()
        .role(
            "You are a senior Python reviewer. You read a conversation in which an \
             analyst writes code and runs it, and you explain why the last execution failed.",
        )
        .rules([
            "Point at the exact line or call that caused the failure",
            "Propose the corrected code",
            "Keep the answer short",
        ])
        .render("worker/code_review")
}

/// Human turn that stops code execution and asks for the final answer
pub fn diagnose_progress() -> RenderedPrompt {
    PromptBuilder::new()
        .text(
            "Stop running code. Diagnose what has been achieved so far and what went \
             wrong, then give your final answer with every result and file you produced.",
        )
        .render("worker/diagnose_progress")
}
