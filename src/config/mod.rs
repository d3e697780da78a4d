//! Configuration Management
//!
//! Hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/kpi-analyst/config.toml)
//! 3. Project config (.kpi-analyst/config.toml) or `--config`
//! 4. Environment variables (KPI_ANALYST_*)
//! 5. CLI arguments (highest priority)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
