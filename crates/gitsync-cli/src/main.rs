//! gitsync binary.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use gitsync_cli::{Cli, Settings, commands, metrics};
use gitsync_git::GitEngine;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("error: cannot load settings: {e}");
            return ExitCode::FAILURE;
        },
    };

    // Logs go to stderr; stdout carries command output.
    let filter = cli.log_level.as_deref().unwrap_or(&settings.log_level);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli, &settings).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli, settings: &Settings) -> anyhow::Result<ExitCode> {
    let handle = if settings.metrics {
        Some(metrics::init_metrics().context("installing metrics recorder")?)
    } else {
        None
    };

    let engine = GitEngine::new(settings.engine_config()?)?;
    tracing::debug!(version = gitsync_cli::version(), "engine ready");

    let result = commands::run(cli.command, &engine, settings).await;

    if let Some(handle) = handle {
        eprint!("{}", handle.render());
    }
    result
}
