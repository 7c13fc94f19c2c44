use rmcp::schemars::JsonSchema;
use serde::Deserialize;

use super::{Resource, ToolDef, check_limit, define, non_empty, require_id};
use crate::domain::{
    error::ToolError,
    request::{ApiRequest, HttpMethod},
};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListResourcesArgs {
    /// Only return resources of this type, e.g. `postgresql` or `restapi`.
    pub resource_type: Option<String>,
    /// Maximum number of resources to return (1-100).
    pub limit: Option<u32>,
    /// Pagination token returned by a previous call.
    pub next_token: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ResourceIdArgs {
    pub resource_id: String,
}

pub(super) fn tools() -> Vec<ToolDef> {
    vec![
        define(
            "list_resources",
            Resource::Resources,
            HttpMethod::Get,
            "/resources",
            "List data resources (databases, APIs) configured in the organization.",
            list,
        ),
        define(
            "get_resource",
            Resource::Resources,
            HttpMethod::Get,
            "/resources/{resource_id}",
            "Fetch a single resource by id. Credentials are never returned by the API.",
            get,
        ),
    ]
}

fn list(args: ListResourcesArgs) -> Result<ApiRequest, ToolError> {
    Ok(ApiRequest::get(["resources"])
        .query_opt("resource_type", non_empty(args.resource_type))
        .query_opt("limit", check_limit(args.limit)?)
        .query_opt("next_token", non_empty(args.next_token)))
}

fn get(args: ResourceIdArgs) -> Result<ApiRequest, ToolError> {
    let id = require_id("resource_id", &args.resource_id)?;
    Ok(ApiRequest::get(["resources".to_string(), id]))
}
