//! Config Command
//!
//! Usage:
//!   kpi-analyst config show [-f toml|json]
//!   kpi-analyst config path

use std::path::Path;

use crate::config::ConfigLoader;
use crate::types::Result;

/// Print the effective configuration
pub fn show(config_path: Option<&Path>, format: &str) -> Result<()> {
    let config = ConfigLoader::load(config_path)?;
    println!("{}", ConfigLoader::render(&config, format == "json")?);
    Ok(())
}

pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}
