use std::{env, net::SocketAddr};

use anyhow::{Context, Result};
use mock_retool_api::{DEFAULT_ADDR, spawn};
use tokio::signal;
use tracing_subscriber::EnvFilter;

const DEFAULT_TOKEN: &str = "retool_mock_token";

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let addr: SocketAddr = env::var("MOCK_API_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.into())
        .parse()
        .context("parse MOCK_API_ADDR")?;
    let token = env::var("MOCK_API_TOKEN").unwrap_or_else(|_| {
        tracing::warn!("MOCK_API_TOKEN not set; using {DEFAULT_TOKEN}");
        DEFAULT_TOKEN.into()
    });

    let handle = spawn(addr, token).await?;
    tracing::info!(base_url = %handle.base_url(), "mock server ready");
    let _ = signal::ctrl_c().await;
    tracing::info!("shutting down");
    handle.shutdown().await;
    Ok(())
}
