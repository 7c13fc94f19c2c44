use rmcp::schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{
    Changes, Resource, ToolDef, check_limit, define, non_empty, require_id, require_name,
};
use crate::{
    domain::{
        error::ToolError,
        request::{ApiRequest, HttpMethod},
    },
    shared::types::{AccessLevel, GroupMember},
};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListGroupsArgs {
    /// Exact group name match.
    pub name: Option<String>,
    /// Maximum number of groups to return (1-100).
    pub limit: Option<u32>,
    /// Pagination token returned by a previous call.
    pub next_token: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GroupIdArgs {
    /// Numeric group id.
    pub group_id: u64,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateGroupArgs {
    pub name: String,
    pub universal_app_access: Option<AccessLevel>,
    pub universal_resource_access: Option<AccessLevel>,
    pub universal_workflow_access: Option<AccessLevel>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateGroupArgs {
    pub group_id: u64,
    pub name: Option<String>,
    pub universal_app_access: Option<AccessLevel>,
    pub universal_resource_access: Option<AccessLevel>,
    pub universal_workflow_access: Option<AccessLevel>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AddGroupMembersArgs {
    pub group_id: u64,
    /// Users to add. Existing members are left untouched.
    pub members: Vec<GroupMember>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RemoveGroupMemberArgs {
    pub group_id: u64,
    pub user_id: String,
}

pub(super) fn tools() -> Vec<ToolDef> {
    vec![
        define(
            "list_groups",
            Resource::Groups,
            HttpMethod::Get,
            "/groups",
            "List permission groups.",
            list,
        ),
        define(
            "get_group",
            Resource::Groups,
            HttpMethod::Get,
            "/groups/{group_id}",
            "Fetch a single group with its members.",
            get,
        ),
        define(
            "create_group",
            Resource::Groups,
            HttpMethod::Post,
            "/groups",
            "Create a permission group with optional universal access levels.",
            create,
        ),
        define(
            "update_group",
            Resource::Groups,
            HttpMethod::Patch,
            "/groups/{group_id}",
            "Rename a group or change its universal access levels.",
            update,
        ),
        define(
            "delete_group",
            Resource::Groups,
            HttpMethod::Delete,
            "/groups/{group_id}",
            "Delete a permission group.",
            delete,
        ),
        define(
            "add_group_members",
            Resource::Groups,
            HttpMethod::Post,
            "/groups/{group_id}/members",
            "Add users to a group, optionally as group admins.",
            add_members,
        ),
        define(
            "remove_group_member",
            Resource::Groups,
            HttpMethod::Delete,
            "/groups/{group_id}/members/{user_id}",
            "Remove one user from a group.",
            remove_member,
        ),
    ]
}

fn group_path(group_id: u64) -> Vec<String> {
    vec!["groups".to_string(), group_id.to_string()]
}

fn list(args: ListGroupsArgs) -> Result<ApiRequest, ToolError> {
    Ok(ApiRequest::get(["groups"])
        .query_opt("name", non_empty(args.name))
        .query_opt("limit", check_limit(args.limit)?)
        .query_opt("next_token", non_empty(args.next_token)))
}

fn get(args: GroupIdArgs) -> Result<ApiRequest, ToolError> {
    Ok(ApiRequest::get(group_path(args.group_id)))
}

fn create(args: CreateGroupArgs) -> Result<ApiRequest, ToolError> {
    let mut body = json!({ "name": require_name("name", &args.name)? });
    let levels = [
        ("universal_app_access", args.universal_app_access),
        ("universal_resource_access", args.universal_resource_access),
        ("universal_workflow_access", args.universal_workflow_access),
    ];
    for (key, level) in levels {
        if let Some(level) = level {
            body[key] = Value::from(level);
        }
    }
    Ok(ApiRequest::post(["groups"]).body(body))
}

fn update(args: UpdateGroupArgs) -> Result<ApiRequest, ToolError> {
    let name = args
        .name
        .as_deref()
        .map(|name| require_name("name", name))
        .transpose()?;
    let body = Changes::new()
        .replace("/name", name)
        .replace("/universal_app_access", args.universal_app_access)
        .replace("/universal_resource_access", args.universal_resource_access)
        .replace("/universal_workflow_access", args.universal_workflow_access)
        .into_body()?;
    Ok(ApiRequest::patch(group_path(args.group_id)).body(body))
}

fn delete(args: GroupIdArgs) -> Result<ApiRequest, ToolError> {
    Ok(ApiRequest::delete(group_path(args.group_id)))
}

fn add_members(args: AddGroupMembersArgs) -> Result<ApiRequest, ToolError> {
    if args.members.is_empty() {
        return Err(ToolError::invalid("'members' must list at least one user"));
    }
    let members = args
        .members
        .into_iter()
        .map(|member| {
            Ok(GroupMember {
                id: require_id("members[].id", &member.id)?,
                is_group_admin: member.is_group_admin,
            })
        })
        .collect::<Result<Vec<_>, ToolError>>()?;
    let mut segments = group_path(args.group_id);
    segments.push("members".into());
    Ok(ApiRequest::post(segments).body(json!({ "members": members })))
}

fn remove_member(args: RemoveGroupMemberArgs) -> Result<ApiRequest, ToolError> {
    let user_id = require_id("user_id", &args.user_id)?;
    let mut segments = group_path(args.group_id);
    segments.extend(["members".to_string(), user_id]);
    Ok(ApiRequest::delete(segments))
}
