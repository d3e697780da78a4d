use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::types::ReportRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportNode {
    RetrieveSalesHistory,
    ProcessSalesData,
    RetrieveOperationalData,
    ReviewSpecialCase,
    ProcessSpecialCase,
    GenerateReport,
}

impl std::fmt::Display for ReportNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RetrieveSalesHistory => write!(f, "retrieve_sales_history"),
            Self::ProcessSalesData => write!(f, "process_sales_data"),
            Self::RetrieveOperationalData => write!(f, "retrieve_operational_data"),
            Self::ReviewSpecialCase => write!(f, "review_special_case"),
            Self::ProcessSpecialCase => write!(f, "process_special_case"),
            Self::GenerateReport => write!(f, "generate_report"),
        }
    }
}

/// Verdict of the special-case review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialCaseReview {
    pub is_special_case: bool,
    pub special_case_reason: String,
}

impl SpecialCaseReview {
    pub fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "is_special_case": {
                    "type": "boolean",
                    "description": "Whether the analysis shows a special case to investigate"
                },
                "special_case_reason": {
                    "type": "string",
                    "description": "Reason for the verdict"
                },
            },
            "required": ["is_special_case", "special_case_reason"],
        })
    }
}

/// Artifacts gathered for one report request
#[derive(Debug, Clone)]
pub struct ReportState {
    pub request: ReportRequest,
    pub analysis_date: NaiveDate,
    pub sales_history: String,
    pub sales_analysis: String,
    pub sales_operational_data: String,
    pub is_special_case: bool,
    pub special_case_reason: String,
    pub sales_in_depth_analysis: String,
    pub report: String,
}

impl ReportState {
    pub fn new(request: ReportRequest, analysis_date: NaiveDate) -> Self {
        Self {
            request,
            analysis_date,
            sales_history: String::new(),
            sales_analysis: String::new(),
            sales_operational_data: String::new(),
            is_special_case: false,
            special_case_reason: String::new(),
            sales_in_depth_analysis: String::new(),
            report: String::new(),
        }
    }

    /// Free-text artifacts in pipeline order, blanks skipped
    pub fn artifacts(&self) -> Vec<&str> {
        [
            self.sales_history.as_str(),
            self.sales_analysis.as_str(),
            self.sales_operational_data.as_str(),
            self.special_case_reason.as_str(),
            self.sales_in_depth_analysis.as_str(),
        ]
        .into_iter()
        .filter(|text| !text.trim().is_empty())
        .collect()
    }
}

/// Partial update returned by a pipeline node; `Some` fields replace
#[derive(Debug, Clone, Default)]
pub struct ReportUpdate {
    pub sales_history: Option<String>,
    pub sales_analysis: Option<String>,
    pub sales_operational_data: Option<String>,
    pub special_case: Option<SpecialCaseReview>,
    pub sales_in_depth_analysis: Option<String>,
    pub report: Option<String>,
}

impl ReportState {
    pub(super) fn merge(mut self, update: ReportUpdate) -> Self {
        if let Some(text) = update.sales_history {
            self.sales_history = text;
        }
        if let Some(text) = update.sales_analysis {
            self.sales_analysis = text;
        }
        if let Some(text) = update.sales_operational_data {
            self.sales_operational_data = text;
        }
        if let Some(review) = update.special_case {
            self.is_special_case = review.is_special_case;
            self.special_case_reason = review.special_case_reason;
        }
        if let Some(text) = update.sales_in_depth_analysis {
            self.sales_in_depth_analysis = text;
        }
        if let Some(text) = update.report {
            self.report = text;
        }
        self
    }
}
