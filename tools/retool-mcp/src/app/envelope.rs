//! Normalized payloads returned to the client.
//!
//! Success: `{"status": 200, "data": <upstream body or null>}`.
//! Failure: `{"error": "...", "code": "...", "status"?: 404, "details"?: <upstream body>}`
//! with `is_error = true`. Tool failures never become JSON-RPC errors.

use rmcp::model::CallToolResult;
use serde_json::{Map, Value, json};

use crate::domain::{error::ToolError, request::ApiResponse};

pub fn success(response: ApiResponse) -> CallToolResult {
    CallToolResult::structured(json!({
        "status": response.status,
        "data": response.body.unwrap_or(Value::Null),
    }))
}

pub fn failure(error: &ToolError) -> CallToolResult {
    let mut payload = Map::new();
    payload.insert("error".into(), Value::String(error.to_string()));
    payload.insert("code".into(), Value::String(error.code().into()));
    if let Some(status) = error.status() {
        payload.insert("status".into(), json!(status));
    }
    if let Some(details) = error.details() {
        payload.insert("details".into(), details.clone());
    }
    CallToolResult::structured_error(Value::Object(payload))
}

pub fn render(outcome: Result<ApiResponse, ToolError>) -> CallToolResult {
    match outcome {
        Ok(response) => success(response),
        Err(error) => failure(&error),
    }
}
