use anyhow::Result;
use clap::Parser;
use release_bot::cli::{run, Cli};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing for the CLI; logs go to stderr so stdout carries only the outcome.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    let cli = Cli::parse();
    tracing::info!("CLI arguments parsed, invoking run");
    let outcome = match run(cli).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "CLI exited with error");
            return Err(e);
        }
    };

    println!("{}", serde_json::to_string(&outcome)?);
    if outcome.is_error() {
        tracing::error!("CLI completed with error outcome");
        Ok(ExitCode::FAILURE)
    } else {
        tracing::info!("CLI completed successfully");
        Ok(ExitCode::SUCCESS)
    }
}
