mod backends;
mod batch;
mod cli;
mod config;
mod error;
mod model;
mod parser;
mod transport;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // Progress goes to stdout, so diagnostics stay on stderr.
    // RUST_LOG=linear_issue_maker=debug shows every remote call.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("linear_issue_maker=warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = cli::Cli::parse();
    cli.execute().await
}
