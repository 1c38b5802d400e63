use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

mod cli;
mod config;
mod error;
mod executor;
mod metrics;
mod scenarios;
mod thresholds;

use cli::Cli;
use scenarios::constant_request_rate;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse command line arguments (environment fallbacks included)
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = cli.run_config();

    tracing::info!("Rate Probe Starting...");
    tracing::info!("Target: {}", config.target_url());
    tracing::info!("Target Rate: {}/min", config.target_rate);
    tracing::info!("Duration: {}", humantime::format_duration(config.duration));

    let options = cli.run_options()?;
    let summary = constant_request_rate::run(config, options).await?;

    if let Some(path) = &cli.summary_export {
        summary.write_json(path)?;
        tracing::info!("Summary written to {}", path.display());
    }

    if !summary.thresholds_passed() {
        tracing::error!("Some thresholds have failed");
    }

    tracing::info!("Load test complete");
    Ok(ExitCode::from(summary.exit_code()))
}
