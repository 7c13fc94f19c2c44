use rmcp::schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{
    Changes, Resource, ToolDef, check_email, check_limit, define, non_empty, require_id,
    require_name,
};
use crate::domain::{
    error::ToolError,
    request::{ApiRequest, HttpMethod},
};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListUsersArgs {
    /// Exact email match.
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Maximum number of users to return (1-100).
    pub limit: Option<u32>,
    /// Pagination token returned by a previous call.
    pub next_token: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UserIdArgs {
    pub user_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateUserArgs {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Create the user enabled (default true).
    pub active: Option<bool>,
    /// Free-form metadata object stored on the user.
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserArgs {
    pub user_id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Set false to disable the user without deleting it.
    pub active: Option<bool>,
    /// Replaces the whole metadata object.
    pub metadata: Option<Map<String, Value>>,
}

pub(super) fn tools() -> Vec<ToolDef> {
    vec![
        define(
            "list_users",
            Resource::Users,
            HttpMethod::Get,
            "/users",
            "List users, optionally filtered by email or name.",
            list,
        ),
        define(
            "get_user",
            Resource::Users,
            HttpMethod::Get,
            "/users/{user_id}",
            "Fetch a single user by id.",
            get,
        ),
        define(
            "create_user",
            Resource::Users,
            HttpMethod::Post,
            "/users",
            "Create a user account.",
            create,
        ),
        define(
            "update_user",
            Resource::Users,
            HttpMethod::Patch,
            "/users/{user_id}",
            "Change a user's email, name, active flag or metadata.",
            update,
        ),
        define(
            "delete_user",
            Resource::Users,
            HttpMethod::Delete,
            "/users/{user_id}",
            "Delete a user account.",
            delete,
        ),
    ]
}

fn list(args: ListUsersArgs) -> Result<ApiRequest, ToolError> {
    let email = args
        .email
        .as_deref()
        .map(|email| check_email("email", email))
        .transpose()?;
    Ok(ApiRequest::get(["users"])
        .query_opt("email", email)
        .query_opt("first_name", non_empty(args.first_name))
        .query_opt("last_name", non_empty(args.last_name))
        .query_opt("limit", check_limit(args.limit)?)
        .query_opt("next_token", non_empty(args.next_token)))
}

fn get(args: UserIdArgs) -> Result<ApiRequest, ToolError> {
    let id = require_id("user_id", &args.user_id)?;
    Ok(ApiRequest::get(["users".to_string(), id]))
}

fn create(args: CreateUserArgs) -> Result<ApiRequest, ToolError> {
    let mut body = json!({
        "email": check_email("email", &args.email)?,
        "first_name": require_name("first_name", &args.first_name)?,
        "last_name": require_name("last_name", &args.last_name)?,
        "active": args.active.unwrap_or(true),
    });
    if let Some(metadata) = args.metadata {
        body["metadata"] = Value::Object(metadata);
    }
    Ok(ApiRequest::post(["users"]).body(body))
}

fn update(args: UpdateUserArgs) -> Result<ApiRequest, ToolError> {
    let id = require_id("user_id", &args.user_id)?;
    let email = args
        .email
        .as_deref()
        .map(|email| check_email("email", email))
        .transpose()?;
    let first_name = args
        .first_name
        .as_deref()
        .map(|name| require_name("first_name", name))
        .transpose()?;
    let last_name = args
        .last_name
        .as_deref()
        .map(|name| require_name("last_name", name))
        .transpose()?;
    let body = Changes::new()
        .replace("/email", email)
        .replace("/first_name", first_name)
        .replace("/last_name", last_name)
        .replace("/active", args.active)
        .replace("/metadata", args.metadata)
        .into_body()?;
    Ok(ApiRequest::patch(["users".to_string(), id]).body(body))
}

fn delete(args: UserIdArgs) -> Result<ApiRequest, ToolError> {
    let id = require_id("user_id", &args.user_id)?;
    Ok(ApiRequest::delete(["users".to_string(), id]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_defaults_to_active() {
        let req = create(CreateUserArgs {
            email: "grace@example.com".into(),
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            active: None,
            metadata: None,
        })
        .unwrap();
        assert_eq!(req.describe(), "POST /users");
        assert_eq!(req.body.as_ref().unwrap()["active"], json!(true));
        assert!(req.body.as_ref().unwrap().get("metadata").is_none());
    }

    #[test]
    fn create_checks_email() {
        let err = create(CreateUserArgs {
            email: "grace".into(),
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            active: None,
            metadata: None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("email"));
    }

    #[test]
    fn update_keeps_field_order() {
        let mut metadata = Map::new();
        metadata.insert("team".into(), json!("infra"));
        let req = update(UpdateUserArgs {
            user_id: "u_1".into(),
            email: None,
            first_name: Some("Ada".into()),
            last_name: None,
            active: Some(false),
            metadata: Some(metadata),
        })
        .unwrap();
        let ops = req.body.unwrap()["operations"].clone();
        let paths: Vec<_> = ops
            .as_array()
            .unwrap()
            .iter()
            .map(|op| op["path"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(paths, vec!["/first_name", "/active", "/metadata"]);
    }

    #[test]
    fn list_validates_email_filter() {
        let err = list(ListUsersArgs {
            email: Some("not-an-email".into()),
            first_name: None,
            last_name: None,
            limit: None,
            next_token: None,
        })
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENTS");
    }
}
