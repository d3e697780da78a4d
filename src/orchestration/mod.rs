//! Orchestration
//!
//! Directed graphs of model calls and workers that turn a report request into
//! a finished report.
//!
//! ## Layers
//!
//! - [`report`]: fixed pipeline per request, branching once on the
//!   special-case review
//! - [`research`]: ledger-driven investigation of special cases
//! - [`editor`]: supervisor-routed writing and charting
//!
//! All three run on the same [`graph::GraphRunner`], which bounds every run
//! by a step ceiling.

pub mod artifacts;
pub mod editor;
pub mod graph;
pub mod ledger;
pub mod report;
pub mod research;
pub mod team;
pub mod worker;

pub use artifacts::ArtifactScope;
pub use editor::{EditorGraph, EditorRoute, Router};
pub use graph::{Command, Goto, GraphRunner, StateGraph};
pub use ledger::{LedgerItem, ProgressLedger, ProgressLedgerEvaluator};
pub use report::{ReportPipeline, ReportState, SpecialCaseReview};
pub use research::{ResearchGraph, evaluate_progress};
pub use team::{Team, TeamMember, WorkerId};
pub use worker::{SharedWorker, Worker, WorkerOutput, WorkerSet, WorkerStatus};
