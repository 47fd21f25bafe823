//! wmi-agent - Ask about this machine in plain language.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use wmi_agent::{AgentConfig, AgentSession, ChatClient, Provider, ToolRouter};
use wmi_common::platform::PowershellCimExecutor;
use wmi_common::{builtin_registry, Dispatcher, PrivilegeLevel, QueryConfig};

#[derive(Parser, Debug)]
#[command(name = "wmi-agent", about = "Natural-language WMI assistant", version)]
struct Args {
    /// LLM provider: ollama or azure
    #[arg(long)]
    provider: Option<Provider>,

    /// Model name (Ollama) or deployment name (Azure)
    #[arg(long)]
    model: Option<String>,

    /// API endpoint override
    #[arg(long)]
    endpoint: Option<String>,

    /// Ask a single question and exit instead of starting the REPL
    #[arg(long, short)]
    query: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = AgentConfig::resolve(args.provider, args.model, args.endpoint)?;
    let client = ChatClient::new(config).map_err(|e| anyhow!(e.to_string()))?;

    let dispatcher = build_dispatcher().context("cannot start the agent")?;
    let mut session = AgentSession::new(client, ToolRouter::new(dispatcher));

    match args.query {
        Some(question) => session
            .run_once(&question)
            .await
            .map_err(|e| anyhow!(e.to_string())),
        None => session.run().await.map_err(|e| anyhow!(e.to_string())),
    }
}

fn build_dispatcher() -> Result<Dispatcher> {
    let level = PrivilegeLevel::detect();
    let config = QueryConfig::from_env();
    let registry = builtin_registry().map_err(|e| anyhow!("command catalog is broken: {}", e))?;
    let executor =
        PowershellCimExecutor::new(&config).map_err(|e| anyhow!("cannot query WMI: {}", e))?;
    Ok(Dispatcher::new(
        Box::new(registry),
        Arc::new(executor),
        level,
        config.timeout(),
    ))
}
