//! Init Command
//!
//! Writes a starter `.kpi-analyst/config.toml` in the current directory.

use crate::cli::Output;
use crate::config::ConfigLoader;
use crate::types::{AnalystError, Result};

pub fn run(force: bool) -> Result<()> {
    let existing = ConfigLoader::project_config_path();
    if existing.exists() && !force {
        return Err(AnalystError::Config(format!(
            "{} already exists. Use --force to overwrite.",
            existing.display()
        )));
    }

    let path = ConfigLoader::init_project(force)?;
    let output = Output::new();
    output.success(&format!("Created {}", path.display()));
    output.note("Set OPENAI_API_KEY, add your report requests, then run 'kpi-analyst run'");
    Ok(())
}
