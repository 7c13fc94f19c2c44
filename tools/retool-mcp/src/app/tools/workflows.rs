use rmcp::schemars::JsonSchema;
use serde::Deserialize;

use super::{Resource, ToolDef, check_limit, define, non_empty, require_id};
use crate::domain::{
    error::ToolError,
    request::{ApiRequest, HttpMethod},
};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListWorkflowsArgs {
    /// Maximum number of workflows to return (1-100).
    pub limit: Option<u32>,
    /// Pagination token returned by a previous call.
    pub next_token: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct WorkflowIdArgs {
    pub workflow_id: String,
}

pub(super) fn tools() -> Vec<ToolDef> {
    vec![
        define(
            "list_workflows",
            Resource::Workflows,
            HttpMethod::Get,
            "/workflows",
            "List workflows in the organization.",
            list,
        ),
        define(
            "get_workflow",
            Resource::Workflows,
            HttpMethod::Get,
            "/workflows/{workflow_id}",
            "Fetch a single workflow by id.",
            get,
        ),
    ]
}

fn list(args: ListWorkflowsArgs) -> Result<ApiRequest, ToolError> {
    Ok(ApiRequest::get(["workflows"])
        .query_opt("limit", check_limit(args.limit)?)
        .query_opt("next_token", non_empty(args.next_token)))
}

fn get(args: WorkflowIdArgs) -> Result<ApiRequest, ToolError> {
    let id = require_id("workflow_id", &args.workflow_id)?;
    Ok(ApiRequest::get(["workflows".to_string(), id]))
}
