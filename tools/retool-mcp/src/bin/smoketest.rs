//! Launches the built server binary, lists tools and calls `help` plus one
//! read tool. Point `RETOOL_BASE_URL`/`RETOOL_API_TOKEN` at a real instance or
//! at `mock-retool-api` to exercise the remote path.

use anyhow::{Context, Result};
use rmcp::{
    ServiceExt,
    model::CallToolRequestParam,
    transport::child_process::{ConfigureCommandExt, TokioChildProcess},
};
use serde_json::json;
use tokio::process::Command;

#[tokio::main]
async fn main() -> Result<()> {
    let target_dir = std::env::var("CARGO_TARGET_DIR").unwrap_or_else(|_| "target".into());
    let profile = if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    };
    let server_bin = format!("{}/{}/retool-mcp", target_dir, profile);

    let service = ()
        .serve(TokioChildProcess::new(
            Command::new(&server_bin).configure(|c| {
                c.env("RUST_LOG", "debug");
            }),
        )?)
        .await
        .with_context(|| format!("start {server_bin}"))?;

    let tools = service.list_tools(Default::default()).await?.tools;
    println!(
        "tools_count={} names={:?}",
        tools.len(),
        tools.iter().map(|t| t.name.to_string()).collect::<Vec<_>>()
    );

    let help = service
        .call_tool(CallToolRequestParam {
            name: "help".into(),
            arguments: None,
        })
        .await?;
    let lines = help
        .structured_content
        .as_ref()
        .and_then(|json| json.get("lines"))
        .and_then(|lines| lines.as_array())
        .map(Vec::len)
        .unwrap_or_default();
    println!("help_lines={lines}");

    let apps = service
        .call_tool(CallToolRequestParam {
            name: "list_apps".into(),
            arguments: json!({"limit": 5}).as_object().cloned(),
        })
        .await?;
    println!(
        "list_apps is_error={} payload={}",
        apps.is_error.unwrap_or(false),
        apps.structured_content
            .map(|v| v.to_string())
            .unwrap_or_default()
    );

    service.cancel().await?;
    Ok(())
}
