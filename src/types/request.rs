//! Report requests
//!
//! A request is read-only input to one pipeline run. Its `task_id` namespaces
//! the temp artifacts of the run.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::error::AnalystError;

/// Reporting period of a KPI request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Period {
    #[default]
    Monthly,
    Quarterly,
    Yearly,
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Monthly => write!(f, "Monthly"),
            Self::Quarterly => write!(f, "Quarterly"),
            Self::Yearly => write!(f, "Yearly"),
        }
    }
}

impl FromStr for Period {
    type Err = AnalystError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "yearly" => Ok(Self::Yearly),
            other => Err(AnalystError::Config(format!(
                "Unknown period '{}'. Expected monthly, quarterly or yearly",
                other
            ))),
        }
    }
}

/// Dimension a sales report is broken down by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grouping {
    Country,
    City,
    #[serde(rename = "Product Family")]
    ProductFamily,
}

impl Grouping {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Country => "Country",
            Self::City => "City",
            Self::ProductFamily => "Product Family",
        }
    }
}

impl std::fmt::Display for Grouping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Grouping {
    type Err = AnalystError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['_', '-'], " ").as_str() {
            "country" => Ok(Self::Country),
            "city" => Ok(Self::City),
            "product family" => Ok(Self::ProductFamily),
            other => Err(AnalystError::Config(format!(
                "Unknown grouping '{}'. Expected country, city or product_family",
                other
            ))),
        }
    }
}

/// Currency the figures are reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    #[serde(rename = "Functional currency")]
    Functional,
    #[serde(rename = "Reporting currency")]
    Reporting,
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Functional => write!(f, "Functional currency"),
            Self::Reporting => write!(f, "Reporting currency"),
        }
    }
}

impl FromStr for Currency {
    type Err = AnalystError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "functional" | "functional currency" => Ok(Self::Functional),
            "reporting" | "reporting currency" => Ok(Self::Reporting),
            other => Err(AnalystError::Config(format!(
                "Unknown currency '{}'. Expected functional or reporting",
                other
            ))),
        }
    }
}

/// A sales report request
///
/// `grouping` and `grouping_value` are either both set or both absent; the
/// absent form asks for total sales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grouping: Option<Grouping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grouping_value: Option<String>,
    #[serde(default)]
    pub period: Period,
    #[serde(default)]
    pub currency: Currency,
    /// Extra recipients for this report, on top of the global list
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipients: Vec<String>,
}

impl ReportRequest {
    pub fn total_sales(period: Period) -> Self {
        Self {
            grouping: None,
            grouping_value: None,
            period,
            currency: Currency::default(),
            recipients: Vec::new(),
        }
    }

    pub fn grouped(grouping: Grouping, value: impl Into<String>, period: Period) -> Self {
        Self {
            grouping: Some(grouping),
            grouping_value: Some(value.into()),
            period,
            currency: Currency::default(),
            recipients: Vec::new(),
        }
    }

    /// Display name, used as the notification subject
    pub fn name(&self) -> String {
        match (&self.grouping, &self.grouping_value) {
            (Some(grouping), Some(value)) => format!("Sales Report - {} - {}", grouping, value),
            _ => "Sales Report - Total Sales".to_string(),
        }
    }

    /// Display name made safe for use as a single path component
    pub fn file_stem(&self) -> String {
        self.name()
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect()
    }

    /// Scope key for temp artifacts
    pub fn task_id(&self) -> String {
        match (&self.grouping, &self.grouping_value) {
            (Some(grouping), Some(value)) => format!(
                "sales_report_{}_{}",
                slug(grouping.label()),
                slug(value)
            ),
            _ => "sales_report_total_sales".to_string(),
        }
    }

    /// Check the grouping pair invariant
    pub fn validate(&self) -> Result<(), AnalystError> {
        match (&self.grouping, &self.grouping_value) {
            (Some(_), Some(value)) if value.trim().is_empty() => Err(AnalystError::Config(
                format!("{}: grouping_value must not be empty", self.name()),
            )),
            (Some(_), None) | (None, Some(_)) => Err(AnalystError::Config(
                "grouping and grouping_value must both be provided or both be omitted"
                    .to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Human-readable description handed to the first pipeline step
    pub fn describe(&self) -> String {
        let scope = match (&self.grouping, &self.grouping_value) {
            (Some(grouping), Some(value)) => format!("{} = {}", grouping, value),
            _ => "total sales".to_string(),
        };
        format!(
            "Sales report for {} ({} period, figures in {})",
            scope,
            self.period.to_string().to_lowercase(),
            self.currency.to_string().to_lowercase()
        )
    }
}

fn slug(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
