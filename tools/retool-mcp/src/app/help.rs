use rmcp::model::CallToolResult;
use serde_json::{Value, json};

use crate::app::{registry::ToolRegistry, tools::Resource};

const ERROR_CODES: [&str; 10] = [
    "UNKNOWN_TOOL",
    "INVALID_ARGUMENTS",
    "READ_ONLY_MODE",
    "NOT_CONFIGURED",
    "UPSTREAM_CLIENT_ERROR",
    "UPSTREAM_SERVER_ERROR",
    "UPSTREAM_ERROR",
    "UPSTREAM_TIMEOUT",
    "UPSTREAM_UNAVAILABLE",
    "UPSTREAM_DECODE",
];

pub fn render(registry: &ToolRegistry) -> CallToolResult {
    let mut lines = vec![json!({
        "section": "summary",
        "server": "retool-mcp",
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "MCP",
        "read_only": registry.read_only(),
        "tools": registry.visible().count(),
    })];

    for resource in Resource::ALL {
        for def in registry.visible().filter(|def| def.resource == resource) {
            lines.push(json!({
                "section": "tool",
                "resource": resource.as_str(),
                "name": def.name,
                "method": def.method.as_str(),
                "route": def.route,
                "mutating": def.is_mutating(),
                "summary": def.description,
            }));
        }
    }

    lines.push(json!({
        "section": "envelope",
        "success": "{status, data}",
        "error": "{error, code, status?, details?}",
        "codes": ERROR_CODES,
    }));
    lines.push(json!({
        "section": "environment",
        "RETOOL_BASE_URL": "instance origin, e.g. https://acme.retool.com",
        "RETOOL_API_TOKEN": "management API access token",
        "RETOOL_TIMEOUT_MS": "per-request timeout, default 30000",
        "RETOOL_READ_ONLY": "true hides tools that modify data",
        "RUST_LOG": "default off; logs go to stderr"
    }));
    if registry.read_only() {
        lines.push(json!({
            "section": "notice",
            "code": "read_only_mode",
            "message": "Mutating tools are disabled; unset RETOOL_READ_ONLY to enable them."
        }));
    }

    let payload = json!({
        "format": "jsonl",
        "lines": lines.iter().map(Value::to_string).collect::<Vec<_>>(),
    });
    CallToolResult::structured(payload)
}
