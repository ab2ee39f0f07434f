use std::{io, process::ExitCode};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bas_balance::{
    config::{CliArgs, Config, LoggingConfig},
    connector::connector_for,
    render::Renderer,
    run, AppError,
};

fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(&LoggingConfig::default());
            tracing::error!(error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.logging);
    tracing::debug!(path = %cli.config.display(), backend = ?config.store.backend, "configuration loaded");

    match list_transactions(&config) {
        Ok(count) => {
            tracing::debug!(count, "listing complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "aborting");
            ExitCode::FAILURE
        }
    }
}

fn list_transactions(config: &Config) -> Result<usize, AppError> {
    let query = config.list_query()?;
    let connector = connector_for(&config.store);
    let renderer = Renderer::new(config.output.format);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(connector.as_ref(), &query, &renderer, &mut out)
}

/// Logs go to stderr so stdout carries nothing but the listing.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
