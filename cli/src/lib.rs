//! Rankscope command-line application shell
//!
//! This is the thin shell that parses arguments, wires providers from
//! configuration and environment credentials, and renders reports.
//! Core logic lives in the `crates/` directory.

pub mod args;
pub mod commands;
pub mod output;
pub mod providers;

use args::{Cli, Commands};
use clap::Parser;
use commands::{load_config, EXIT_ERROR};
use std::process::ExitCode;
use tracing::info;

/// Initialize tracing subscriber for logging
///
/// Logs go to stderr so reports on stdout stay machine-readable.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rankscope=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Parse the command line and run the requested command.
pub async fn run() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    info!("Starting Rankscope v{}", env!("CARGO_PKG_VERSION"));

    match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<ExitCode> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Analyze(args) => {
            let config = load_config(config_path)?;
            commands::analyze::run(args, &config).await
        }
        Commands::Config { init: true, force } => {
            let path = commands::config::init(config_path, force)?;
            println!("Wrote default configuration to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { init: false, .. } => {
            print!("{}", commands::config::show(config_path)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
