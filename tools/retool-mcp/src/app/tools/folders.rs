use rmcp::schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use super::{
    Changes, Resource, ToolDef, check_limit, define, non_empty, require_id, require_name,
};
use crate::{
    domain::{
        error::ToolError,
        request::{ApiRequest, HttpMethod},
    },
    shared::types::FolderType,
};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListFoldersArgs {
    /// Only return folders holding this kind of object.
    pub folder_type: Option<FolderType>,
    /// Maximum number of folders to return (1-100).
    pub limit: Option<u32>,
    /// Pagination token returned by a previous call.
    pub next_token: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FolderIdArgs {
    /// Folder id.
    pub folder_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateFolderArgs {
    pub name: String,
    /// Kind of object the folder holds.
    pub folder_type: FolderType,
    /// Parent folder; the root folder of that type when omitted.
    pub parent_folder_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateFolderArgs {
    pub folder_id: String,
    /// New folder name.
    pub name: Option<String>,
    /// Move the folder under this parent.
    pub parent_folder_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DeleteFolderArgs {
    pub folder_id: String,
    /// Also delete everything inside the folder. Without it a non-empty
    /// folder is refused by the API.
    pub recursive: Option<bool>,
}

pub(super) fn tools() -> Vec<ToolDef> {
    vec![
        define(
            "list_folders",
            Resource::Folders,
            HttpMethod::Get,
            "/folders",
            "List folders, optionally filtered by folder type.",
            list,
        ),
        define(
            "get_folder",
            Resource::Folders,
            HttpMethod::Get,
            "/folders/{folder_id}",
            "Fetch a single folder by id.",
            get,
        ),
        define(
            "create_folder",
            Resource::Folders,
            HttpMethod::Post,
            "/folders",
            "Create a folder for apps, files, resources or workflows.",
            create,
        ),
        define(
            "update_folder",
            Resource::Folders,
            HttpMethod::Patch,
            "/folders/{folder_id}",
            "Rename a folder or move it under another parent.",
            update,
        ),
        define(
            "delete_folder",
            Resource::Folders,
            HttpMethod::Delete,
            "/folders/{folder_id}",
            "Delete a folder; set recursive to delete its contents too.",
            delete,
        ),
    ]
}

fn list(args: ListFoldersArgs) -> Result<ApiRequest, ToolError> {
    Ok(ApiRequest::get(["folders"])
        .query_opt("folder_type", args.folder_type.map(folder_type_str))
        .query_opt("limit", check_limit(args.limit)?)
        .query_opt("next_token", non_empty(args.next_token)))
}

fn get(args: FolderIdArgs) -> Result<ApiRequest, ToolError> {
    let id = require_id("folder_id", &args.folder_id)?;
    Ok(ApiRequest::get(["folders".to_string(), id]))
}

fn create(args: CreateFolderArgs) -> Result<ApiRequest, ToolError> {
    let mut body = json!({
        "name": require_name("name", &args.name)?,
        "folder_type": folder_type_str(args.folder_type),
    });
    if let Some(parent) = args.parent_folder_id.as_deref() {
        body["parent_folder_id"] = json!(require_id("parent_folder_id", parent)?);
    }
    Ok(ApiRequest::post(["folders"]).body(body))
}

fn update(args: UpdateFolderArgs) -> Result<ApiRequest, ToolError> {
    let id = require_id("folder_id", &args.folder_id)?;
    let name = args
        .name
        .as_deref()
        .map(|name| require_name("name", name))
        .transpose()?;
    let parent = args
        .parent_folder_id
        .as_deref()
        .map(|parent| require_id("parent_folder_id", parent))
        .transpose()?;
    let body = Changes::new()
        .replace("/name", name)
        .replace("/parent_folder_id", parent)
        .into_body()?;
    Ok(ApiRequest::patch(["folders".to_string(), id]).body(body))
}

fn delete(args: DeleteFolderArgs) -> Result<ApiRequest, ToolError> {
    let id = require_id("folder_id", &args.folder_id)?;
    Ok(ApiRequest::delete(["folders".to_string(), id]).query_opt("recursive", args.recursive))
}

fn folder_type_str(kind: FolderType) -> &'static str {
    match kind {
        FolderType::App => "app",
        FolderType::File => "file",
        FolderType::Resource => "resource",
        FolderType::Workflow => "workflow",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_builds_patch_operations() {
        let req = update(UpdateFolderArgs {
            folder_id: "f-9".into(),
            name: Some("Finance".into()),
            parent_folder_id: None,
        })
        .unwrap();
        assert_eq!(req.describe(), "PATCH /folders/f-9");
        assert_eq!(
            req.body,
            Some(json!({"operations": [
                {"op": "replace", "path": "/name", "value": "Finance"}
            ]}))
        );
    }

    #[test]
    fn update_without_changes_is_rejected() {
        let err = update(UpdateFolderArgs {
            folder_id: "f-9".into(),
            name: None,
            parent_folder_id: None,
        })
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENTS");
    }

    #[test]
    fn recursive_delete_is_a_query_flag() {
        let req = delete(DeleteFolderArgs {
            folder_id: "f-1".into(),
            recursive: Some(true),
        })
        .unwrap();
        assert_eq!(req.query, vec![("recursive".to_string(), "true".to_string())]);
    }

    #[test]
    fn list_filters_by_type() {
        let req = list(ListFoldersArgs {
            folder_type: Some(FolderType::Workflow),
            limit: None,
            next_token: None,
        })
        .unwrap();
        assert_eq!(
            req.query,
            vec![("folder_type".to_string(), "workflow".to_string())]
        );
    }
}
