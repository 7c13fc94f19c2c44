use rmcp::schemars::JsonSchema;
use serde::Deserialize;
use time::format_description::well_known::Rfc3339;

use super::{Resource, ToolDef, check_email, check_limit, check_timestamp, define, non_empty};
use crate::domain::{
    error::ToolError,
    request::{ApiRequest, HttpMethod},
};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListAuditLogsArgs {
    /// Only events at or after this RFC 3339 timestamp.
    pub start_time: Option<String>,
    /// Only events at or before this RFC 3339 timestamp.
    pub end_time: Option<String>,
    /// Only events triggered by this user.
    pub user_email: Option<String>,
    /// Only events of this action type, e.g. `LOGIN` or `APP_SAVE`.
    pub action_type: Option<String>,
    /// Maximum number of events to return (1-100).
    pub limit: Option<u32>,
    /// Pagination token returned by a previous call.
    pub next_token: Option<String>,
}

pub(super) fn tools() -> Vec<ToolDef> {
    vec![define(
        "list_audit_logs",
        Resource::AuditLogs,
        HttpMethod::Get,
        "/audit_logs",
        "Search the organization audit log by time window, user or action type.",
        list,
    )]
}

fn list(args: ListAuditLogsArgs) -> Result<ApiRequest, ToolError> {
    let start = check_timestamp("start_time", args.start_time.as_deref())?;
    let end = check_timestamp("end_time", args.end_time.as_deref())?;
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(ToolError::invalid("'start_time' must not be after 'end_time'"));
        }
    }
    let user_email = args
        .user_email
        .as_deref()
        .map(|email| check_email("user_email", email))
        .transpose()?;
    Ok(ApiRequest::get(["audit_logs"])
        .query_opt("start_time", start.map(format_timestamp).transpose()?)
        .query_opt("end_time", end.map(format_timestamp).transpose()?)
        .query_opt("user_email", user_email)
        .query_opt("action_type", non_empty(args.action_type))
        .query_opt("limit", check_limit(args.limit)?)
        .query_opt("next_token", non_empty(args.next_token)))
}

fn format_timestamp(at: time::OffsetDateTime) -> Result<String, ToolError> {
    at.format(&Rfc3339)
        .map_err(|e| ToolError::invalid(format!("timestamp cannot be formatted: {e}")))
}
