use rmcp::model::Tool;
use std::sync::Arc;

use crate::{
    app::tools::{self, ToolDef, schema_for},
    shared::types::EmptyArgs,
};

pub const HELP_TOOL: &str = "help";

#[derive(Clone)]
pub struct ToolRegistry {
    defs: Arc<Vec<ToolDef>>,
    read_only: bool,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ToolRegistry {
    pub fn new(read_only: bool) -> Self {
        Self {
            defs: Arc::new(tools::catalogue()),
            read_only,
        }
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// Tools visible to clients; mutating tools are hidden in read-only mode.
    pub fn visible(&self) -> impl Iterator<Item = &ToolDef> {
        self.defs
            .iter()
            .filter(move |def| !(self.read_only && def.is_mutating()))
    }

    /// Lookup ignores read-only mode so callers can tell "hidden" from "unknown".
    pub fn find(&self, name: &str) -> Option<&ToolDef> {
        self.defs.iter().find(|def| def.name == name)
    }

    pub fn list(&self) -> Vec<Tool> {
        let mut tools = vec![Tool::new(
            HELP_TOOL,
            "Reference card for every tool exposed by this server: method, route \
             and whether it modifies data.",
            // Some clients expect input_schema to be an object rather than null
            schema_for::<EmptyArgs>(),
        )];
        tools.extend(self.visible().map(ToolDef::to_tool));
        tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_is_listed_first() {
        let tools = ToolRegistry::default().list();
        assert_eq!(tools[0].name.as_ref(), HELP_TOOL);
        assert!(tools.iter().any(|t| t.name.as_ref() == "create_user"));
    }

    #[test]
    fn read_only_hides_mutating_tools() {
        let registry = ToolRegistry::new(true);
        let names: Vec<String> = registry
            .list()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        assert!(names.contains(&"list_users".to_string()));
        assert!(!names.contains(&"create_user".to_string()));
        assert!(!names.contains(&"remove_group_member".to_string()));
        assert!(registry.find("delete_app").is_some());
    }

    #[test]
    fn listing_is_stable() {
        let first: Vec<String> = ToolRegistry::default()
            .list()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        let second: Vec<String> = ToolRegistry::default()
            .list()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        assert_eq!(first, second);
    }
}
