use rmcp::{ErrorData as McpError, ServerHandler, model::*};
use std::time::Instant;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    app::dispatch::Dispatcher,
    domain::port::PlatformApi,
    infra::metrics::{self, InflightGuard},
    shared::types::CallTrace,
};

const INSTRUCTIONS: &str = "Manage a Retool organization: apps, folders, workflows, resources, \
users, groups and audit logs. Call `help` for the full tool reference.";

pub struct RetoolServer<A> {
    dispatcher: Dispatcher<A>,
}

impl<A> Clone for RetoolServer<A> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<A: PlatformApi> RetoolServer<A> {
    pub fn new(dispatcher: Dispatcher<A>) -> Self {
        Self { dispatcher }
    }

    fn server_info(protocol_version: ProtocolVersion) -> ServerInfo {
        let capabilities = ServerCapabilities::builder().enable_tools().build();
        ServerInfo {
            protocol_version,
            capabilities,
            server_info: Implementation {
                name: "retool-mcp".into(),
                title: Some("Retool Management MCP".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            instructions: Some(INSTRUCTIONS.into()),
        }
    }

    fn attach_trace(result: &mut CallToolResult, trace: &CallTrace) {
        match serde_json::to_value(trace) {
            Ok(value) => {
                let mut meta = result.meta.take().unwrap_or_else(Meta::new);
                meta.insert("trace".into(), value);
                result.meta = Some(meta);
            }
            Err(err) => {
                tracing::error!(%err, "failed to serialize call trace");
            }
        }
    }

    /// Runs one tool call end to end. Never fails at the protocol level.
    pub async fn handle_call(&self, request: CallToolRequestParam) -> CallToolResult {
        let _inflight = InflightGuard::new();
        let call_id = uuid::Uuid::new_v4();
        let started_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".into());
        let clock = Instant::now();
        let name = request.name.to_string();
        tracing::info!(%call_id, tool = %name, "call_tool received");

        let outcome = self.dispatcher.call(&name, request.arguments).await;
        let elapsed = clock.elapsed();
        let label = outcome.code.unwrap_or("ok");

        // Unknown names are collapsed so clients cannot grow label cardinality.
        let metric_tool = if outcome.code == Some("UNKNOWN_TOOL") {
            "unknown"
        } else {
            name.as_str()
        };
        metrics::record_tool_call(metric_tool, label, elapsed);

        let trace = CallTrace {
            call_id,
            tool: name.clone(),
            started_at,
            duration_ms: elapsed.as_millis() as u64,
            outcome: label.to_string(),
            request: outcome.request.as_ref().map(|r| r.describe()),
        };
        match outcome.code {
            None => tracing::info!(
                %call_id,
                tool = %name,
                latency_ms = trace.duration_ms,
                "call_tool success"
            ),
            Some(code) => tracing::warn!(
                %call_id,
                tool = %name,
                code,
                latency_ms = trace.duration_ms,
                "call_tool returned tool error"
            ),
        }

        let mut result = outcome.result;
        Self::attach_trace(&mut result, &trace);
        result
    }
}

impl<A: PlatformApi> ServerHandler for RetoolServer<A> {
    fn initialize(
        &self,
        request: InitializeRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<InitializeResult, McpError>> + Send + '_ {
        tracing::info!(?request.client_info, %request.protocol_version, "initialize received");
        // echo back the protocol requested by client for compatibility
        let info = Self::server_info(request.protocol_version);
        async move { Ok(info) }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools = self.dispatcher.list_tools();
        tracing::debug!(count = tools.len(), "list_tools called");
        async move {
            Ok(ListToolsResult {
                tools,
                next_cursor: None,
            })
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move { Ok(self.handle_call(request).await) }
    }

    fn get_info(&self) -> ServerInfo {
        Self::server_info(ProtocolVersion::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        app::registry::ToolRegistry,
        domain::{
            error::ToolError,
            request::{ApiRequest, ApiResponse},
        },
    };
    use serde_json::json;
    use std::sync::Arc;

    struct NotFoundApi;

    impl PlatformApi for NotFoundApi {
        async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ToolError> {
            Err(ToolError::Upstream {
                status: 404,
                message: format!("{} not found", request.path()),
                body: None,
            })
        }
    }

    fn server(read_only: bool) -> RetoolServer<NotFoundApi> {
        RetoolServer::new(Dispatcher::new(
            ToolRegistry::new(read_only),
            Arc::new(NotFoundApi),
        ))
    }

    fn call(name: &str, args: serde_json::Value) -> CallToolRequestParam {
        CallToolRequestParam {
            name: name.to_string().into(),
            arguments: args.as_object().cloned(),
        }
    }

    fn trace_of(result: &CallToolResult) -> serde_json::Value {
        result
            .meta
            .as_ref()
            .and_then(|meta| meta.get("trace"))
            .cloned()
            .expect("trace attached")
    }

    #[tokio::test]
    async fn every_result_carries_a_trace() {
        let result = server(false)
            .handle_call(call("get_app", json!({"app_id": "a-1"})))
            .await;
        assert!(result.is_error.unwrap_or(false));
        let trace = trace_of(&result);
        assert_eq!(trace["tool"], "get_app");
        assert_eq!(trace["outcome"], "UPSTREAM_CLIENT_ERROR");
        assert_eq!(trace["request"], "GET /apps/a-1");
        assert!(uuid::Uuid::parse_str(trace["call_id"].as_str().unwrap()).is_ok());
        assert!(OffsetDateTime::parse(trace["started_at"].as_str().unwrap(), &Rfc3339).is_ok());
    }

    #[tokio::test]
    async fn help_trace_has_no_request() {
        let result = server(true).handle_call(call("help", json!({}))).await;
        let trace = trace_of(&result);
        assert_eq!(trace["outcome"], "ok");
        assert!(trace.get("request").is_none());
    }

    #[tokio::test]
    async fn call_ids_are_unique() {
        let srv = server(false);
        let a = trace_of(&srv.handle_call(call("help", json!({}))).await);
        let b = trace_of(&srv.handle_call(call("help", json!({}))).await);
        assert_ne!(a["call_id"], b["call_id"]);
    }

    #[tokio::test]
    async fn unknown_tool_is_counted_under_one_label() {
        let before = metrics::TOOL_CALLS
            .with_label_values(&["unknown", "UNKNOWN_TOOL"])
            .get();
        let result = server(false).handle_call(call("rm_rf", json!({}))).await;
        assert_eq!(result.structured_content.unwrap()["code"], "UNKNOWN_TOOL");
        assert!(
            metrics::TOOL_CALLS
                .with_label_values(&["unknown", "UNKNOWN_TOOL"])
                .get()
                > before
        );
    }

    #[test]
    fn info_advertises_tools() {
        let info = server(false).get_info();
        assert!(info.capabilities.tools.is_some());
        assert_eq!(info.server_info.name, "retool-mcp");
    }
}
