#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::cargo::cargo_bin;
use rmcp::{
    RoleClient, ServiceExt,
    model::{CallToolRequestParam, CallToolResult},
    service::RunningService,
    transport::child_process::{ConfigureCommandExt, TokioChildProcess},
};
use serde_json::Value;
use tempfile::TempDir;
use tokio::process::Command;

const SCRUBBED_ENV: [&str; 5] = [
    "RETOOL_BASE_URL",
    "RETOOL_API_TOKEN",
    "RETOOL_TIMEOUT_MS",
    "RETOOL_READ_ONLY",
    "METRICS_ADDR",
];

/// A running `retool-mcp` child process with an isolated, empty config dir.
pub struct Server {
    pub service: RunningService<RoleClient, ()>,
    _config: TempDir,
}

pub async fn start(env: &[(&str, &str)], args: &[&str]) -> Result<Server> {
    let config = tempfile::tempdir()?;
    let bin = cargo_bin("retool-mcp");
    let service = ()
        .serve(TokioChildProcess::new(Command::new(&bin).configure(|cmd| {
            for key in SCRUBBED_ENV {
                cmd.env_remove(key);
            }
            cmd.env("APP_CONFIG_DIR", config.path())
                .env("RUST_LOG", "info")
                .args(args);
            for (key, value) in env {
                cmd.env(key, value);
            }
        }))?)
        .await?;
    Ok(Server {
        service,
        _config: config,
    })
}

impl Server {
    pub async fn call(&self, name: &str, args: Value) -> Result<CallToolResult> {
        Ok(self
            .service
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments: args.as_object().cloned(),
            })
            .await?)
    }

    pub async fn tool_names(&self) -> Result<Vec<String>> {
        Ok(self
            .service
            .list_tools(Default::default())
            .await?
            .tools
            .into_iter()
            .map(|t| t.name.to_string())
            .collect())
    }
}

pub fn payload(result: &CallToolResult) -> Value {
    result
        .structured_content
        .clone()
        .expect("structured content")
}

pub fn trace(result: &CallToolResult) -> Value {
    result
        .meta
        .as_ref()
        .and_then(|meta| meta.get("trace"))
        .cloned()
        .expect("trace meta")
}
