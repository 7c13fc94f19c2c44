use serde_json::Value;
use thiserror::Error;

/// Every way a tool call can fail. Rendered to the client as a structured
/// error payload, never as a protocol error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("tool '{0}' modifies data and the server is running in read-only mode")]
    ReadOnly(String),

    #[error("{0}")]
    NotConfigured(String),

    #[error("upstream returned {status}: {message}")]
    Upstream {
        status: u16,
        message: String,
        body: Option<Value>,
    },

    #[error("upstream request timed out after {0} ms")]
    Timeout(u64),

    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    #[error("failed to decode upstream response: {0}")]
    Decode(String),
}

impl ToolError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ToolError::InvalidArguments(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            ToolError::UnknownTool(_) => "UNKNOWN_TOOL",
            ToolError::InvalidArguments(_) => "INVALID_ARGUMENTS",
            ToolError::ReadOnly(_) => "READ_ONLY_MODE",
            ToolError::NotConfigured(_) => "NOT_CONFIGURED",
            ToolError::Upstream { status, .. } => match status {
                400..=499 => "UPSTREAM_CLIENT_ERROR",
                500..=599 => "UPSTREAM_SERVER_ERROR",
                _ => "UPSTREAM_ERROR",
            },
            ToolError::Timeout(_) => "UPSTREAM_TIMEOUT",
            ToolError::Unavailable(_) => "UPSTREAM_UNAVAILABLE",
            ToolError::Decode(_) => "UPSTREAM_DECODE",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ToolError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn details(&self) -> Option<&Value> {
        match self {
            ToolError::Upstream { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(400, "UPSTREAM_CLIENT_ERROR")]
    #[case(404, "UPSTREAM_CLIENT_ERROR")]
    #[case(503, "UPSTREAM_SERVER_ERROR")]
    #[case(302, "UPSTREAM_ERROR")]
    fn upstream_code_follows_status_class(#[case] status: u16, #[case] code: &str) {
        let err = ToolError::Upstream {
            status,
            message: "nope".into(),
            body: None,
        };
        assert_eq!(err.code(), code);
        assert_eq!(err.status(), Some(status));
    }

    #[test]
    fn messages_are_human_readable() {
        assert_eq!(
            ToolError::Timeout(250).to_string(),
            "upstream request timed out after 250 ms"
        );
        assert_eq!(
            ToolError::UnknownTool("nope".into()).to_string(),
            "unknown tool 'nope'"
        );
    }
}
