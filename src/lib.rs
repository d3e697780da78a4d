//! kpi-analyst - LLM-orchestrated sales KPI reports
//!
//! Turns report requests into finished Markdown reports by running model
//! calls and code-executing workers through three nested graphs.
//!
//! ## Flow
//!
//! 1. [`orchestration::report`]: retrieve, analyse and review the sales data
//! 2. [`orchestration::research`]: investigate special cases with a
//!    progress ledger that detects stalls and replans
//! 3. [`orchestration::editor`]: a supervisor routes charting and writing
//!    until the report is complete
//!
//! [`service::ReportService`] retries failed requests and hands finished
//! reports, or failure notices, to a [`delivery::NotificationSink`].
//!
//! ## Modules
//!
//! - [`ai`]: model providers, invocation client, prompts, validation, metrics
//! - [`config`]: layered TOML/env configuration
//! - [`orchestration`]: graph runner, graphs and workers
//! - [`delivery`]: notification sinks
//! - [`cli`]: command handlers

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod delivery;
pub mod orchestration;
pub mod service;
pub mod types;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};
pub use types::error::{AnalystError, Result};
pub use types::{Message, ReportRequest};

pub use ai::{LlmProvider, ModelClient, SharedMetrics, SharedProvider};
pub use delivery::{Notification, NotificationSink};
pub use orchestration::{EditorGraph, ReportPipeline, ResearchGraph};
pub use service::{ReportService, RunSummary};
