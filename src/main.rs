//! Main entry point for mutkit application.

// #![deny(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
// #![warn(missing_docs)]

use clap::{Parser, Subcommand};

pub mod cluster;
pub mod common;
pub mod metrics;
pub mod varmat;

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "mutkit - mutation tables to feature matrices",
    long_about = "This tool converts mutation annotation tables into sparse binary feature matrices"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Subcommand)]
enum Commands {
    /// Build a gene feature by sample matrix from a mutation table.
    Varmat(varmat::Args),
    /// Evaluate binary predictions.
    Metrics(metrics::Args),
    /// Order samples by clustering within groups.
    ClusterOrder(cluster::Args),
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();
    tracing::subscriber::set_global_default(collector)?;

    tracing::info!("Starting mutkit...");

    match &cli.command {
        Commands::Varmat(args) => varmat::run(&cli.common, args)?,
        Commands::Metrics(args) => metrics::run(&cli.common, args)?,
        Commands::ClusterOrder(args) => cluster::run(&cli.common, args)?,
    }

    tracing::info!("All done. Have a nice day!");

    Ok(())
}
