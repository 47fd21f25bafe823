//! wmictl - Windows Management Instrumentation CLI.

use clap::Parser;
use tracing_subscriber::EnvFilter;
use wmictl::cli::Cli;
use wmictl::commands;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = commands::run(cli).await;
    std::process::exit(exit_code);
}
