//! Run Command
//!
//! Generates every configured report request and delivers the results.

use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::info;

use crate::ai::create_provider_chain;
use crate::cli::Output;
use crate::config::{Config, ConfigLoader};
use crate::delivery::create_sink;
use crate::service::{ReportService, RunSummary};
use crate::types::{AnalystError, Result};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config: Option<PathBuf>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub date: Option<NaiveDate>,
    /// Keep only requests whose name contains this text
    pub only: Option<String>,
    pub dry_run: bool,
}

/// Fold command-line overrides into `config`
pub fn apply_overrides(mut config: Config, options: &RunOptions) -> Result<Config> {
    if let Some(provider) = &options.provider {
        config.llm.provider = provider.clone();
    }
    if let Some(model) = &options.model {
        config.llm.model = model.clone();
    }
    if options.date.is_some() {
        config.pipeline.analysis_date = options.date;
    }
    if let Some(filter) = &options.only {
        let needle = filter.to_lowercase();
        config
            .requests
            .retain(|r| r.name().to_lowercase().contains(&needle));
        if config.requests.is_empty() {
            return Err(AnalystError::Config(format!(
                "No report request matches '{}'",
                filter
            )));
        }
    }
    config.validate()?;
    Ok(config)
}

pub async fn run(options: RunOptions) -> Result<RunSummary> {
    let config = ConfigLoader::load(options.config.as_deref())?;
    let config = apply_overrides(config, &options)?;
    let output = Output::new();

    if config.requests.is_empty() {
        return Err(AnalystError::Config(
            "No report requests configured. Add [[requests]] entries to the config.".to_string(),
        ));
    }

    output.heading(&format!(
        "{} report(s) for {}",
        config.requests.len(),
        config.analysis_date()
    ));
    for request in &config.requests {
        output.note(&request.describe());
    }
    if options.dry_run {
        output.note("Dry run, nothing generated");
        return Ok(RunSummary::default());
    }

    let provider = create_provider_chain(&config.llm)?;
    let sink = create_sink(&config.notification);
    info!(provider = provider.name(), sink = sink.name(), "Starting run");

    let summary = ReportService::new(config, provider, sink).run_all().await;
    output.summary(&summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Grouping, Period, ReportRequest};

    fn config() -> Config {
        let mut config = Config::default();
        config.requests = vec![
            ReportRequest::grouped(Grouping::Country, "Spain", Period::Monthly),
            ReportRequest::total_sales(Period::Yearly),
        ];
        config
    }

    #[test]
    fn test_overrides() {
        let options = RunOptions {
            model: Some("gpt-4o-mini".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 12, 31),
            only: Some("spain".to_string()),
            ..Default::default()
        };
        let config = apply_overrides(config(), &options).unwrap();
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.analysis_date(), NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(config.requests.len(), 1);
        assert_eq!(config.requests[0].name(), "Sales Report - Country - Spain");
    }

    #[test]
    fn test_filter_matching_nothing_fails() {
        let options = RunOptions {
            only: Some("Atlantis".to_string()),
            ..Default::default()
        };
        assert!(apply_overrides(config(), &options).is_err());
    }
}
