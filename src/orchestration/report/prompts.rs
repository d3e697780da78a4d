//! Report pipeline prompts

use chrono::NaiveDate;
use std::path::Path;

use crate::ai::{PromptBuilder, RenderedPrompt};
use crate::types::ReportRequest;

use super::types::ReportState;

fn request_context(builder: PromptBuilder, request: &ReportRequest, date: NaiveDate) -> PromptBuilder {
    let builder = builder
        .context_item("Analysis date", date.format("%Y-%m-%d").to_string())
        .context_item("Periodicity", request.period.to_string());
    let builder = match (&request.grouping, &request.grouping_value) {
        (Some(grouping), Some(value)) => builder
            .context_item("Grouping", grouping.label())
            .context_item("Grouping value", value.clone()),
        _ => builder.context_item("Grouping", "Total sales"),
    };
    builder.context_item("Currency", request.currency.to_string())
}

pub fn retrieve_sales_history(
    request: &ReportRequest,
    date: NaiveDate,
    output_location: &Path,
) -> RenderedPrompt {
    request_context(PromptBuilder::new(), request, date)
        .context_item("Output location", output_location.display().to_string())
        .text(format!(
            "Retrieve the sales history of the last three years up to the analysis date \
             for this request: {}.",
            request.describe()
        ))
        .rules([
            "Aggregate the figures per period",
            "Save the result as a CSV file at the output location",
            "Describe the columns of the saved file",
        ])
        .render("report/retrieve_sales_history")
}

pub fn process_sales_data(
    request: &ReportRequest,
    date: NaiveDate,
    input_location: &Path,
) -> RenderedPrompt {
    request_context(PromptBuilder::new(), request, date)
        .context_item("Input location", input_location.display().to_string())
        .text(
            "Analyse the sales history in the input file. Compare the latest period \
             with the previous one and with the same period of the previous year.",
        )
        .rules([
            "Report absolute and relative changes",
            "Flag any period whose change is unusual compared with the history",
        ])
        .render("report/process_sales_data")
}

pub fn retrieve_operational_data(
    request: &ReportRequest,
    date: NaiveDate,
    sales_history_location: &Path,
    data_dir: Option<&Path>,
) -> RenderedPrompt {
    let subject = request
        .grouping_value
        .clone()
        .unwrap_or_else(|| "total sales".to_string());
    let builder = request_context(PromptBuilder::new(), request, date)
        .context_item(
            "Previous output location",
            sales_history_location.display().to_string(),
        );
    let builder = match data_dir {
        Some(dir) => builder.context_item("Input location", dir.display().to_string()),
        None => builder,
    };
    builder
        .text(format!(
            "Output the operational data for the sales history of {}. Look for order \
             volumes, prices, stock levels and customer counts that explain the sales \
             figures in the attached file.",
            subject
        ))
        .rules([
            "Use the same periods as the sales history",
            "Save every extract as a CSV file and mention it by name",
        ])
        .render("report/retrieve_operational_data")
}

pub fn review_special_case(sales_analysis: &str) -> RenderedPrompt {
    PromptBuilder::new()
        .text(
            "Review the sales analysis below and decide whether it shows a special case: \
             a change large or unusual enough to need an in-depth investigation before \
             the report is written.",
        )
        .section("Sales analysis", sales_analysis)
        .rules([
            "Answer with a JSON object holding is_special_case and special_case_reason",
            "Give the reason even when there is no special case",
        ])
        .render("report/review_special_case")
}

/// Task for the research graph, carrying every artifact gathered so far
pub fn research_task(state: &ReportState, data_dir: Option<&Path>) -> RenderedPrompt {
    let builder = request_context(PromptBuilder::new(), &state.request, state.analysis_date);
    let builder = match data_dir {
        Some(dir) => builder.context_item("Internal data", dir.display().to_string()),
        None => builder,
    };
    builder
        .text(format!(
            "Investigate the special case found in this request: {}. Find its root \
             cause in the data and quantify its impact.",
            state.request.describe()
        ))
        .section("Special case", state.special_case_reason.as_str())
        .section("Sales history", state.sales_history.as_str())
        .section("Sales analysis", state.sales_analysis.as_str())
        .section("Operational data", state.sales_operational_data.as_str())
        .render("report/research_task")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Grouping, Period};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()
    }

    #[test]
    fn test_request_context_for_grouped_request() {
        let request = ReportRequest::grouped(Grouping::Country, "Spain", Period::Monthly);
        let text =
            retrieve_sales_history(&request, date(), Path::new("/tmp/t/sales_history.csv")).text;
        assert!(text.contains("**Analysis date**: 2025-03-31"));
        assert!(text.contains("**Grouping value**: Spain"));
        assert!(text.contains("/tmp/t/sales_history.csv"));
    }

    #[test]
    fn test_request_context_for_total_sales() {
        let request = ReportRequest::total_sales(Period::Yearly);
        let text = process_sales_data(&request, date(), Path::new("in.csv")).text;
        assert!(text.contains("**Grouping**: Total sales"));
        assert!(!text.contains("Grouping value"));
    }
}
