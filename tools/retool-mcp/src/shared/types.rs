use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(deny_unknown_fields)]
pub struct EmptyArgs {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FolderType {
    App,
    File,
    Resource,
    Workflow,
}

/// Group-wide permission level applied to every app, resource or workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    None,
    Use,
    Edit,
    Own,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::None => "none",
            AccessLevel::Use => "use",
            AccessLevel::Edit => "edit",
            AccessLevel::Own => "own",
        }
    }
}

impl From<AccessLevel> for Value {
    fn from(level: AccessLevel) -> Self {
        Value::String(level.as_str().to_string())
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GroupMember {
    /// User id to add to the group.
    pub id: String,
    /// Grant group admin rights to this member.
    pub is_group_admin: Option<bool>,
}

/// Update tools only ever overwrite fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Replace,
}

/// One JSON-Patch style change sent in PATCH bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOperation {
    pub fn replace(path: &str, value: impl Into<Value>) -> Self {
        Self {
            op: PatchOp::Replace,
            path: path.to_string(),
            value: Some(value.into()),
        }
    }
}

/// Attached to every tool result under `_meta.trace`.
#[derive(Debug, Clone, Serialize)]
pub struct CallTrace {
    pub call_id: uuid::Uuid,
    pub tool: String,
    pub started_at: String,
    pub duration_ms: u64,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
}
