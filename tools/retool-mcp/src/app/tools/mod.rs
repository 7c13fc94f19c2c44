//! Tool catalogue: one module per remote resource. Each tool pairs a typed
//! argument struct (its JSON Schema is what clients see) with a builder that
//! turns validated arguments into exactly one [`ApiRequest`].

use rmcp::model::{JsonObject, Tool, ToolAnnotations};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    domain::{
        error::ToolError,
        request::{ApiRequest, HttpMethod},
    },
    shared::types::PatchOperation,
};

pub mod apps;
pub mod audit;
pub mod folders;
pub mod groups;
pub mod resources;
pub mod users;
pub mod workflows;

const MAX_ID_LEN: usize = 256;
const MAX_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Apps,
    Folders,
    Workflows,
    Resources,
    Users,
    Groups,
    AuditLogs,
}

impl Resource {
    pub const ALL: [Resource; 7] = [
        Resource::Apps,
        Resource::Folders,
        Resource::Workflows,
        Resource::Resources,
        Resource::Users,
        Resource::Groups,
        Resource::AuditLogs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Apps => "apps",
            Resource::Folders => "folders",
            Resource::Workflows => "workflows",
            Resource::Resources => "resources",
            Resource::Users => "users",
            Resource::Groups => "groups",
            Resource::AuditLogs => "audit_logs",
        }
    }
}

type BuildFn = dyn Fn(JsonObject) -> Result<ApiRequest, ToolError> + Send + Sync;

pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    pub resource: Resource,
    pub method: HttpMethod,
    /// Route template shown in `help`, e.g. `/users/{user_id}`.
    pub route: &'static str,
    pub schema: Arc<JsonObject>,
    build: Box<BuildFn>,
}

impl std::fmt::Debug for ToolDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDef")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("route", &self.route)
            .finish()
    }
}

impl ToolDef {
    pub fn is_mutating(&self) -> bool {
        self.method.is_mutating()
    }

    pub fn build(&self, arguments: JsonObject) -> Result<ApiRequest, ToolError> {
        (self.build)(arguments)
    }

    pub fn to_tool(&self) -> Tool {
        let mut tool = Tool::new(self.name, self.description, self.schema.clone());
        tool.annotations = Some(ToolAnnotations {
            read_only_hint: Some(!self.is_mutating()),
            destructive_hint: Some(self.method == HttpMethod::Delete),
            idempotent_hint: Some(self.method != HttpMethod::Post),
            open_world_hint: Some(true),
            ..Default::default()
        });
        tool
    }
}

pub(crate) fn schema_for<T: rmcp::schemars::JsonSchema + 'static>() -> Arc<JsonObject> {
    rmcp::handler::server::common::cached_schema_for_type::<T>()
}

pub(crate) fn define<T>(
    name: &'static str,
    resource: Resource,
    method: HttpMethod,
    route: &'static str,
    description: &'static str,
    build: fn(T) -> Result<ApiRequest, ToolError>,
) -> ToolDef
where
    T: DeserializeOwned + rmcp::schemars::JsonSchema + 'static,
{
    ToolDef {
        name,
        description,
        resource,
        method,
        route,
        schema: schema_for::<T>(),
        build: Box::new(move |arguments| build(parse_args::<T>(arguments)?)),
    }
}

pub fn catalogue() -> Vec<ToolDef> {
    let mut defs = Vec::new();
    defs.extend(apps::tools());
    defs.extend(folders::tools());
    defs.extend(workflows::tools());
    defs.extend(resources::tools());
    defs.extend(users::tools());
    defs.extend(groups::tools());
    defs.extend(audit::tools());
    defs
}

pub(crate) fn parse_args<T: DeserializeOwned>(arguments: JsonObject) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(arguments)).map_err(|e| ToolError::invalid(e.to_string()))
}

pub(crate) fn require_id(field: &str, value: &str) -> Result<String, ToolError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ToolError::invalid(format!("'{field}' must not be empty")));
    }
    if trimmed.chars().count() > MAX_ID_LEN {
        return Err(ToolError::invalid(format!(
            "'{field}' exceeds {MAX_ID_LEN} characters"
        )));
    }
    if trimmed == "." || trimmed == ".." {
        return Err(ToolError::invalid(format!("'{field}' is not a valid id")));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(ToolError::invalid(format!(
            "'{field}' contains control characters"
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn require_name(field: &str, value: &str) -> Result<String, ToolError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ToolError::invalid(format!("'{field}' must not be empty")));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn check_limit(limit: Option<u32>) -> Result<Option<u32>, ToolError> {
    match limit {
        Some(value) if value == 0 || value > MAX_LIMIT => Err(ToolError::invalid(format!(
            "'limit' must be between 1 and {MAX_LIMIT}"
        ))),
        other => Ok(other),
    }
}

pub(crate) fn check_email(field: &str, value: &str) -> Result<String, ToolError> {
    let trimmed = value.trim();
    let valid = match trimmed.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@')
        }
        None => false,
    };
    if !valid || trimmed.chars().any(char::is_whitespace) {
        return Err(ToolError::invalid(format!(
            "'{field}' must be an email address"
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn check_timestamp(
    field: &str,
    value: Option<&str>,
) -> Result<Option<OffsetDateTime>, ToolError> {
    value
        .map(|raw| {
            OffsetDateTime::parse(raw.trim(), &Rfc3339).map_err(|e| {
                ToolError::invalid(format!("'{field}' must be an RFC 3339 timestamp: {e}"))
            })
        })
        .transpose()
}

/// Empty strings count as "not provided" for optional text filters.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Collects replace operations for PATCH bodies, in the order fields are offered.
#[derive(Debug, Default)]
pub(crate) struct Changes {
    operations: Vec<PatchOperation>,
}

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace<V: Into<Value>>(mut self, path: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.operations.push(PatchOperation::replace(path, value));
        }
        self
    }

    pub fn into_body(self) -> Result<Value, ToolError> {
        if self.operations.is_empty() {
            return Err(ToolError::invalid("provide at least one field to change"));
        }
        Ok(serde_json::json!({ "operations": self.operations }))
    }
}
