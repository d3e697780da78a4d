//! Check Command
//!
//! Verifies the configuration loads and the model provider answers.

use std::path::Path;

use crate::ai::create_provider_chain;
use crate::cli::Output;
use crate::config::ConfigLoader;
use crate::types::{AnalystError, Result};

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let output = Output::new();
    let config = ConfigLoader::load(config_path)?;
    output.success(&format!(
        "Configuration valid ({} request(s))",
        config.requests.len()
    ));
    for request in &config.requests {
        request.validate()?;
    }

    let provider = create_provider_chain(&config.llm)?;
    if provider.health_check().await? {
        output.success(&format!("{} ({}) is reachable", provider.name(), provider.model()));
    } else {
        output.failure(&format!("{} ({}) is not reachable", provider.name(), provider.model()));
        return Err(AnalystError::LlmApi(format!(
            "health check failed for {}",
            provider.name()
        )));
    }

    if config.worker.execute_code {
        let status = tokio::process::Command::new(&config.worker.python)
            .arg("--version")
            .output()
            .await;
        match status {
            Ok(out) if out.status.success() => {
                output.success(&format!("{} is available", config.worker.python))
            }
            _ => {
                output.failure(&format!("{} could not be started", config.worker.python));
                return Err(AnalystError::Config(format!(
                    "worker.python '{}' is not runnable; set worker.execute_code = false to use plain model workers",
                    config.worker.python
                )));
            }
        }
    }
    Ok(())
}
