use rmcp::schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use super::{Resource, ToolDef, check_limit, define, non_empty, require_id, require_name};
use crate::domain::{
    error::ToolError,
    request::{ApiRequest, HttpMethod},
};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListAppsArgs {
    /// Maximum number of apps to return (1-100).
    pub limit: Option<u32>,
    /// Pagination token returned by a previous call.
    pub next_token: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AppIdArgs {
    /// App id.
    pub app_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateAppArgs {
    /// Display name of the new app.
    pub name: String,
    /// Folder to create the app in; the root folder when omitted.
    pub folder_id: Option<String>,
}

pub(super) fn tools() -> Vec<ToolDef> {
    vec![
        define(
            "list_apps",
            Resource::Apps,
            HttpMethod::Get,
            "/apps",
            "List apps in the organization, one page at a time.",
            list,
        ),
        define(
            "get_app",
            Resource::Apps,
            HttpMethod::Get,
            "/apps/{app_id}",
            "Fetch a single app by id.",
            get,
        ),
        define(
            "create_app",
            Resource::Apps,
            HttpMethod::Post,
            "/apps",
            "Create an empty app, optionally inside a folder.",
            create,
        ),
        define(
            "delete_app",
            Resource::Apps,
            HttpMethod::Delete,
            "/apps/{app_id}",
            "Delete an app permanently.",
            delete,
        ),
    ]
}

fn list(args: ListAppsArgs) -> Result<ApiRequest, ToolError> {
    Ok(ApiRequest::get(["apps"])
        .query_opt("limit", check_limit(args.limit)?)
        .query_opt("next_token", non_empty(args.next_token)))
}

fn get(args: AppIdArgs) -> Result<ApiRequest, ToolError> {
    let id = require_id("app_id", &args.app_id)?;
    Ok(ApiRequest::get(["apps".to_string(), id]))
}

fn create(args: CreateAppArgs) -> Result<ApiRequest, ToolError> {
    let name = require_name("name", &args.name)?;
    let mut body = json!({ "name": name });
    if let Some(folder) = args.folder_id.as_deref() {
        body["folder_id"] = json!(require_id("folder_id", folder)?);
    }
    Ok(ApiRequest::post(["apps"]).body(body))
}

fn delete(args: AppIdArgs) -> Result<ApiRequest, ToolError> {
    let id = require_id("app_id", &args.app_id)?;
    Ok(ApiRequest::delete(["apps".to_string(), id]))
}
