//! Agro-climatic command-line front end.
//!
//! Ingests NetCDF climate projections into the point store, queries
//! stored series and computes agro-climatic indicators. Results are
//! printed as JSON; logs go to stderr.

mod args;
mod commands;

use anyhow::Result;
use clap::Parser;
use climate_common::{ClimateError, ErrorCategory};
use ingestion::{IngestConfig, IngestionError};
use netcdf_parser::NetCdfError;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use args::{Cli, Command};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(err) = init_tracing(&cli.log_level) {
        eprintln!("failed to initialize logging: {}", err);
    }

    if let Err(err) = run(cli).await {
        let category = category_of(&err);
        error!(category = category.as_str(), error = %err, "Command failed");
        eprintln!("error [{}]: {:#}", category.as_str(), err);
        std::process::exit(1);
    }
}

fn init_tracing(log_level: &str) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = IngestConfig::from_env()?;
    if cli.points_file.is_some() {
        config.points_file = cli.points_file.clone();
    }
    if cli.aliases_file.is_some() {
        config.aliases_file = cli.aliases_file.clone();
    }
    let registry = config.load_points()?;
    info!(db = %cli.db.display(), points = registry.all().len(), "Starting agroclim");

    match &cli.command {
        Command::Ingest(args) => commands::ingest(&cli.db, &config, &registry, args).await,
        Command::Stats => commands::stats(&cli.db).await,
        Command::Series(args) => commands::series(&cli.db, &registry, args).await,
        Command::Aggregate(args) => commands::aggregate(&cli.db, &registry, args).await,
        Command::Indicators(args) => commands::indicators(&cli.db, &registry, args).await,
    }
}

/// Error category of whichever library error ended the command.
fn category_of(err: &anyhow::Error) -> ErrorCategory {
    if let Some(e) = err.downcast_ref::<ClimateError>() {
        e.category()
    } else if let Some(e) = err.downcast_ref::<IngestionError>() {
        e.category()
    } else if let Some(e) = err.downcast_ref::<NetCdfError>() {
        e.category()
    } else {
        ErrorCategory::Internal
    }
}
