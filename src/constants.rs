//! Global Constants
//!
//! Centralized defaults for the graphs, the driver and the model client.
//! Configuration values fall back to these.

/// Research graph (task orchestrator) defaults
pub mod research {
    /// Consecutive stalled cycles tolerated before a full replan
    pub const STALL_COUNT_LIMIT: usize = 3;

    /// Full replans tolerated before bailing out to the summary
    pub const RESET_COUNT_LIMIT: usize = 3;

    /// Worker dispatches tolerated while progress keeps being reported
    pub const MAX_WORKER_TURNS: usize = 30;

    /// Step ceiling for the graph runner
    pub const RECURSION_LIMIT: usize = 10_000;

    /// Default roster description of the quantitative worker
    pub const QUANT_AGENT_ROLE: &str =
        "Can load files, run code, and perform quantitative analysis.";
}

/// Editorial graph defaults
pub mod editor {
    /// Consecutive writer selections before forcing completion
    pub const MAX_WRITER_LOOPS: usize = 3;

    /// Consecutive visualization selections before forcing completion
    pub const MAX_VISUALIZATION_LOOPS: usize = 5;

    /// Supervisor decisions tolerated in total
    pub const MAX_SUPERVISOR_TURNS: usize = 20;

    /// Step ceiling for the graph runner
    pub const RECURSION_LIMIT: usize = 100;

    /// Snapshot text when no report was written yet
    pub const NO_REPORT_YET: &str = "No report has been generated yet.";
}

/// Worker defaults
pub mod worker {
    /// Model/tool rounds per worker run
    pub const MAX_ITERATIONS: usize = 25;

    /// Consecutive failed executions before the worker must answer
    pub const MAX_ERRORS: usize = 5;

    /// Wall-clock limit per code execution (seconds)
    pub const CODE_TIMEOUT_SECS: u64 = 120;

    /// Execution output kept in the conversation (characters)
    pub const MAX_OUTPUT_CHARS: usize = 8_000;

    /// Environment variable pointing executed code at the source data
    pub const DATA_DIR_ENV: &str = "KPI_DATA_DIR";
}

/// Report driver defaults
pub mod pipeline {
    /// Attempts per report request
    pub const MAX_ATTEMPTS: usize = 3;

    /// Constant delay between attempts (seconds)
    pub const RETRY_DELAY_SECS: u64 = 5;

    /// Step ceiling for the straight-line report pipeline
    pub const RECURSION_LIMIT: usize = 25;

    /// Name of the sales history extract inside a request scope
    pub const SALES_HISTORY_FILE: &str = "sales_history.csv";

    /// Output file timestamp format
    pub const OUTPUT_TIMESTAMP_FORMAT: &str = "%y%m%d%H%M";
}

/// Provider chain constants
pub mod chain {
    /// Maximum total attempts across all providers
    pub const MAX_TOTAL_ATTEMPTS: usize = 10;

    /// Default maximum retries per provider
    pub const DEFAULT_MAX_RETRIES: u8 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECS: u64 = 30;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;
}

/// HTTP/Network constants
pub mod network {
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Default completion length (tokens)
    pub const DEFAULT_MAX_TOKENS: usize = 4096;
}
