use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kpi_analyst::cli::commands::{self, run::RunOptions};

#[derive(Parser)]
#[command(name = "kpi-analyst")]
#[command(version, about = "LLM-orchestrated analyst that writes sales KPI reports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file used instead of .kpi-analyst/config.toml
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config in the current directory
    Init {
        #[arg(long, short, help = "Overwrite an existing config")]
        force: bool,
    },

    /// Generate and deliver the configured reports
    Run {
        #[arg(long, help = "LLM provider (openai, ollama)")]
        provider: Option<String>,
        #[arg(long, help = "Model to use")]
        model: Option<String>,
        #[arg(long, help = "Analysis date (YYYY-MM-DD), defaults to today")]
        date: Option<NaiveDate>,
        #[arg(long, help = "Only run requests whose name contains this text")]
        only: Option<String>,
        #[arg(long = "dry-run", help = "List the requests without generating them")]
        dry_run: bool,
    },

    /// Check the config, the model provider and the code interpreter
    Check,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show {
        #[arg(short = 'f', long, default_value = "toml", help = "Output format: toml, json")]
        format: String,
    },
    /// Show configuration file paths
    Path,
}

fn main() -> ExitCode {
    match run_cli() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "kpi_analyst=debug,info"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Init { force } => commands::init::run(force)?,
        Commands::Run {
            provider,
            model,
            date,
            only,
            dry_run,
        } => {
            let options = RunOptions {
                config: cli.config.clone(),
                provider,
                model,
                date,
                only,
                dry_run,
            };
            let summary = Runtime::new()?.block_on(commands::run::run(options))?;
            if summary.failed() > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Check => Runtime::new()?.block_on(commands::check::run(config))?,
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => commands::config::show(config, &format)?,
            ConfigAction::Path => commands::config::path()?,
        },
    }

    Ok(ExitCode::SUCCESS)
}
