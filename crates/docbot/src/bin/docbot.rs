//! docbot binary.
//!
//! Runs once per pull request event inside a CI job. Exits non-zero when the
//! checklist selection breaks policy so the check stays red until fixed.
//!
//! # Environment Variables
//!
//! - `GITHUB_REPOSITORY`, `GITHUB_TOKEN` - target repository and credentials (required)
//! - `GITHUB_EVENT_NAME`, `GITHUB_EVENT_PATH` - triggering event (required)
//! - `LABEL_WATCH_LIST` - comma separated labels to manage
//! - `LABEL_PATTERN`, `LABEL_MISSING`, `ENABLE_LABEL_MISSING`, `ENABLE_LABEL_MULTIPLE`
//! - `LOG_FORMAT` - `text` (default) or `json`; `RUST_LOG` overrides the filter

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use docbot::{Config, ConfigArgs, Dispatcher, EventContext, GitHubLabelClient, Outcome};

/// Keep pull request labels in sync with the checklist in its description.
#[derive(Parser)]
#[command(name = "docbot")]
#[command(about = "Sync pull request labels with a description checklist")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Name of the triggering event
    #[arg(long, env = "GITHUB_EVENT_NAME")]
    event_name: String,

    /// Path to the JSON event payload
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    event_path: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    match run(cli).await {
        Ok(outcome) if outcome.is_failure() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("docbot failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let default_directive = if verbose { "docbot=debug" } else { "docbot=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let (text, json) = match format {
        LogFormat::Text => (Some(fmt::layer().with_writer(std::io::stderr)), None),
        LogFormat::Json => (None, Some(fmt::layer().json().with_writer(std::io::stderr))),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .init();
}

async fn run(cli: Cli) -> Result<Outcome> {
    info!("Starting docbot");

    let config = Config::try_from(cli.config).context("Invalid configuration")?;
    info!(
        owner = %config.owner,
        repo = %config.repo,
        watch_list = ?config.policy.watch,
        missing_label = %config.policy.missing_label,
        enable_missing = config.policy.enable_missing,
        enable_multiple = config.policy.enable_multiple,
        "Loaded configuration"
    );

    let context = EventContext::load(&cli.event_name, &cli.event_path)
        .context("Failed to load event context")?;

    let Some(event) = context.pull_request else {
        info!(event = %context.name, "Not a pull request event, nothing to do");
        return Ok(Outcome::Skipped);
    };
    info!(
        event = %context.name,
        action = ?event.action,
        pr_number = event.number,
        author = %event.author(),
        "Handling pull request event"
    );

    let client = GitHubLabelClient::new(
        config.token.as_str(),
        config.owner.as_str(),
        config.repo.as_str(),
        config.api_url.as_str(),
    )
    .context("Failed to create GitHub client")?;

    let report = Dispatcher::new(&config, &client).run(&event).await?;

    if !report.failed_writes.is_empty() {
        warn!(failed = ?report.failed_writes, "Some updates could not be applied");
    }
    info!(outcome = %report.outcome, "Finished");

    Ok(report.outcome)
}
