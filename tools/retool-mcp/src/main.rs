use anyhow::{Context, Result};
use clap::Parser;
use retool_mcp::{
    adapters::server::RetoolServer,
    app::{dispatch::Dispatcher, registry::ToolRegistry},
    infra::{client::HttpPlatformApi, config::AppConfig, metrics},
};
use rmcp::{ServiceExt, transport::stdio};
use std::{path::PathBuf, sync::Arc};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "MCP server exposing the Retool management API over stdio."
)]
struct Cli {
    /// Config directory; overrides APP_CONFIG_DIR
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Hide and refuse every tool that modifies data
    #[arg(long)]
    read_only: bool,

    /// Print the tool catalogue as JSON and exit
    #[arg(long)]
    print_tools: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
    // IMPORTANT: write logs to stderr; stdout must remain clear for MCP JSON-RPC
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = match &cli.config_dir {
        Some(dir) => AppConfig::load_from_dir(dir)?,
        None => AppConfig::load()?,
    };
    let read_only = cli.read_only || config.read_only();
    let registry = ToolRegistry::new(read_only);

    if cli.print_tools {
        let tools = registry.list();
        println!(
            "{}",
            serde_json::to_string_pretty(&tools).context("serialize tool catalogue")?
        );
        return Ok(());
    }

    if let Some(metrics_cfg) = config.metrics_server_config()? {
        if metrics_cfg.allow_insecure && metrics_cfg.tls.is_none() {
            tracing::warn!(
                addr = %metrics_cfg.addr,
                "metrics server running without TLS (dev override)"
            );
        } else if metrics_cfg.auth_token.is_none() {
            tracing::warn!(
                addr = %metrics_cfg.addr,
                "metrics auth token missing; set METRICS_AUTH_TOKEN for production"
            );
        }
        metrics::spawn_metrics_server(metrics_cfg).await;
    }

    let api = HttpPlatformApi::new(config.api_settings()?)?;
    if !api.is_configured() {
        tracing::warn!("RETOOL_BASE_URL or RETOOL_API_TOKEN missing; remote tools will fail");
    }
    tracing::info!(read_only, tools = registry.visible().count(), "starting retool-mcp");

    let handler = RetoolServer::new(Dispatcher::new(registry, Arc::new(api)));
    let server = handler.serve(stdio()).await?;
    server.waiting().await?;
    Ok(())
}
