//! Error types for the Hatena MCP server with MCP error code mapping

use rmcp::model::{ErrorCode, ErrorData};
use thiserror::Error;

/// Errors that can occur in the MCP server
#[derive(Debug, Error)]
pub enum McpError {
    /// Blog, cache or configuration operation failed
    #[error(transparent)]
    Core(#[from] hatena_core::Error),

    /// JSON serialization/deserialization error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protocol error
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Invalid parameter provided
    #[error("invalid parameter: {0}")]
    InvalidParams(String),

    /// Tool name not in the catalog
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

impl McpError {
    /// Map error to MCP error code
    pub const fn error_code(&self) -> i32 {
        match self {
            Self::Core(_) => -32603,          // Internal error
            Self::Json(_) => -32700,          // Parse error
            Self::Protocol(_) => -32600,      // Invalid request
            Self::UnknownTool(_) => -32601,   // Method not found
            Self::InvalidParams(_) => -32602, // Invalid params
        }
    }

    /// Whether the failure belongs in a tool result rather than a protocol error.
    pub const fn is_tool_failure(&self) -> bool {
        matches!(self, Self::Core(_))
    }
}

impl From<McpError> for ErrorData {
    fn from(err: McpError) -> Self {
        Self::new(ErrorCode(err.error_code()), err.to_string(), None)
    }
}

/// Result type alias for MCP operations
pub type McpResult<T> = Result<T, McpError>;
