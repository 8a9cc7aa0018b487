//! `rankscope analyze`

use super::{EXIT_CANCELLED, EXIT_FAILED};
use crate::args::AnalyzeArgs;
use crate::output::render;
use crate::providers::{build_engine, Credentials, Wiring};
use anyhow::{Context, Result};
use rankscope_core::{AnalysisOptions, AnalysisRequest, AppConfig, Device};
use rankscope_engine::OrchestrationError;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Options from the config file, overridden by command-line flags.
#[must_use]
pub fn options_from(args: &AnalyzeArgs, config: &AppConfig) -> AnalysisOptions {
    let mut options = config.analysis.to_options();
    if let Some(count) = args.competitors {
        options = options.with_competitor_count(count);
    }
    if !args.device.is_empty() {
        options = options.with_devices(args.device.iter().copied().map(Device::from));
    }
    if let Some(secs) = args.timeout {
        options = options.with_run_timeout(Duration::from_secs(secs));
    }
    if let Some(attempts) = args.max_retries {
        options = options.with_max_retries(attempts);
    }
    if args.no_cache {
        options = options.with_cache_window(Duration::ZERO);
    }
    if args.no_narratives {
        options = options.with_narratives(false);
    }
    options
}

/// Run one analysis and write the report.
pub async fn run(args: AnalyzeArgs, config: &AppConfig) -> Result<ExitCode> {
    let request = AnalysisRequest::new(
        args.url.as_str(),
        args.keyword.as_str(),
        options_from(&args, config),
    )
    .context("Invalid analysis request")?;

    let wiring = build_engine(config, &Credentials::from_env()).await?;

    let cancel = CancellationToken::new();
    let interrupt = {
        let token = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling analysis");
                token.cancel();
            }
        })
    };

    info!("Analyzing {} for '{}'", request.url(), request.keyword());
    let outcome = wiring.engine.run(&request, cancel).await;
    interrupt.abort();
    shutdown(wiring).await;

    match outcome {
        Ok(report) => {
            let rendered = render(&report, args.format)?;
            write_output(&rendered, args.output.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Err(OrchestrationError::FatalDataUnavailable { url, failures }) => {
            eprintln!("Analysis failed: no usable data for {url}");
            for failure in failures {
                eprintln!(
                    "  - {} [{} / {:?}]: {}",
                    failure.url, failure.source, failure.reason, failure.detail
                );
            }
            Ok(ExitCode::from(EXIT_FAILED))
        }
        Err(err @ OrchestrationError::Cancelled { .. }) => {
            eprintln!("{err}");
            Ok(ExitCode::from(EXIT_CANCELLED))
        }
    }
}

/// Release the browser once the engine no longer holds it.
async fn shutdown(wiring: Wiring) {
    let Wiring { engine, browser } = wiring;
    drop(engine);
    if let Some(browser) = browser.and_then(|b| Arc::try_unwrap(b).ok()) {
        if let Err(e) = browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
    }
}

fn write_output(rendered: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}
