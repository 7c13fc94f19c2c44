use rmcp::model::{CallToolResult, JsonObject, Tool};
use std::sync::Arc;

use crate::{
    app::{
        envelope, help,
        registry::{HELP_TOOL, ToolRegistry},
    },
    domain::{error::ToolError, port::PlatformApi, request::ApiRequest},
};

/// Result of one tool call plus what the adapter needs for tracing.
pub struct CallOutcome {
    pub result: CallToolResult,
    /// The outbound request, when arguments were valid enough to build one.
    pub request: Option<ApiRequest>,
    /// Error code on failure, `None` on success.
    pub code: Option<&'static str>,
}

pub struct Dispatcher<A> {
    registry: ToolRegistry,
    api: Arc<A>,
}

impl<A> Clone for Dispatcher<A> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            api: Arc::clone(&self.api),
        }
    }
}

impl<A: PlatformApi> Dispatcher<A> {
    pub fn new(registry: ToolRegistry, api: Arc<A>) -> Self {
        Self { registry, api }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn list_tools(&self) -> Vec<Tool> {
        self.registry.list()
    }

    pub async fn call(&self, name: &str, arguments: Option<JsonObject>) -> CallOutcome {
        if name == HELP_TOOL {
            return CallOutcome {
                result: help::render(&self.registry),
                request: None,
                code: None,
            };
        }
        let Some(def) = self.registry.find(name) else {
            return rejected(ToolError::UnknownTool(name.to_string()));
        };
        if self.registry.read_only() && def.is_mutating() {
            return rejected(ToolError::ReadOnly(name.to_string()));
        }
        let request = match def.build(arguments.unwrap_or_default()) {
            Ok(request) => request,
            Err(error) => return rejected(error),
        };

        tracing::debug!(tool = name, request = %request.describe(), "dispatching");
        let outcome = self.api.execute(request.clone()).await;
        let code = outcome.as_ref().err().map(ToolError::code);
        CallOutcome {
            result: envelope::render(outcome),
            request: Some(request),
            code,
        }
    }
}

fn rejected(error: ToolError) -> CallOutcome {
    CallOutcome {
        result: envelope::failure(&error),
        request: None,
        code: Some(error.code()),
    }
}
