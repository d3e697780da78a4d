//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/kpi-analyst/config.toml)
//! 3. Project config (.kpi-analyst/config.toml) or an explicit `--config` file
//! 4. Environment variables (KPI_ANALYST_* prefix, `__` between sections)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{AnalystError, Result};

const ENV_PREFIX: &str = "KPI_ANALYST_";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain:
    /// defaults → global → project (or `explicit`) → env vars
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(AnalystError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                debug!("Loading config from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => {
                let project_path = Self::project_config_path();
                if project_path.exists() {
                    debug!("Loading project config from: {}", project_path.display());
                    figment = figment.merge(Toml::file(&project_path));
                }
            }
        }

        // KPI_ANALYST_LLM__MODEL -> llm.model
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true));

        Self::extract(figment)
    }

    /// Load configuration from a specific file only (no global, no env)
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Config> {
        let config: Config = figment
            .extract()
            .map_err(|e| AnalystError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/kpi-analyst/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("kpi-analyst"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    /// Get project data directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".kpi-analyst")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Print config file locations
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Render the effective configuration as TOML or JSON
    pub fn render(config: &Config, as_json: bool) -> Result<String> {
        if as_json {
            Ok(serde_json::to_string_pretty(config)?)
        } else {
            toml::to_string_pretty(config).map_err(|e| AnalystError::Config(e.to_string()))
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write a starter project config, returning its path
    pub fn init_project(force: bool) -> Result<PathBuf> {
        Self::init_in(&Self::project_dir(), force)
    }

    /// Write a starter config into `dir`
    pub fn init_in(dir: &Path, force: bool) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;

        let config_path = dir.join("config.toml");
        if config_path.exists() && !force {
            info!("Config exists: {}", config_path.display());
            return Ok(config_path);
        }

        fs::write(&config_path, Self::default_project_config())?;
        info!("Created config: {}", config_path.display());
        Ok(config_path)
    }

    /// Starter config content (TOML)
    fn default_project_config() -> &'static str {
        r#"# kpi-analyst configuration
# Environment variables override these, e.g. KPI_ANALYST_LLM__MODEL=gpt-4o-mini

version = "1.0"

[llm]
provider = "openai"
model = "gpt-4o"
timeout_secs = 300
temperature = 0.0

# [[llm.fallbacks]]
# provider = "ollama"
# model = "llama3:latest"

[research]
stall_count_limit = 3
reset_count_limit = 3
max_worker_turns = 30

[editor]
max_writer_loops = 3
max_visualization_loops = 5

[worker]
execute_code = true
python = "python3"
# data_dir = "data"

[pipeline]
max_attempts = 3
retry_delay_secs = 5
outputs_dir = "outputs"

[notification]
sink = "outbox"
sender = "kpi-analyst@localhost"
recipients = []
outbox_dir = "outbox"

[[requests]]
grouping = "Country"
grouping_value = "Spain"
period = "Monthly"
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Grouping, Period};
    use tempfile::TempDir;

    #[test]
    fn test_starter_config_loads() {
        let temp_dir = TempDir::new().unwrap();
        let path = ConfigLoader::init_in(temp_dir.path(), false).unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.requests.len(), 1);
        assert_eq!(config.requests[0].grouping, Some(Grouping::Country));
        assert_eq!(config.requests[0].period, Period::Monthly);
    }

    #[test]
    fn test_init_does_not_overwrite_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "version = \"custom\"\n").unwrap();

        ConfigLoader::init_in(temp_dir.path(), false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "version = \"custom\"\n");

        ConfigLoader::init_in(temp_dir.path(), true).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("[research]"));
    }

    #[test]
    fn test_file_values_override_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            "[editor]\nmax_writer_loops = 2\n\n[pipeline]\nanalysis_date = \"2024-06-30\"\n",
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.editor.max_writer_loops, 2);
        assert_eq!(config.editor.max_visualization_loops, 5);
        assert_eq!(
            config.pipeline.analysis_date,
            chrono::NaiveDate::from_ymd_opt(2024, 6, 30)
        );
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[research]\nstall_count_limit = 0\n").unwrap();

        assert!(ConfigLoader::load_from_file(&path).is_err());
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = ConfigLoader::load(Some(Path::new("/nonexistent/kpi.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_render_formats() {
        let config = Config::default();
        let toml_text = ConfigLoader::render(&config, false).unwrap();
        assert!(toml_text.contains("[research]"));
        let json_text = ConfigLoader::render(&config, true).unwrap();
        assert!(json_text.contains("\"max_writer_loops\": 3"));
    }
}
