//! MCP server implementation for Hatena Blog

use std::sync::Arc;

use hatena_core::{BlogService, Config, HttpTransport, Transport};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, ErrorData, Implementation, JsonObject,
    ListToolsResult, PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler};
use serde_json::json;

use crate::error::{McpError, McpResult};
use crate::tools;

const INSTRUCTIONS: &str = "Tools for reading one Hatena Blog. Use list_entries and get_entry to \
browse, search_entries for live keyword search, or sync_all_entries_to_cache once and then \
search_cached_entries for fast offline search.";

/// MCP server for Hatena Blog
///
/// The blog service is built once at startup. When that fails (typically
/// missing credentials) the server still starts and every tool call reports
/// the startup error.
pub struct BlogServer<T = HttpTransport> {
    service: Arc<Result<BlogService<T>, hatena_core::Error>>,
}

impl<T> Clone for BlogServer<T> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

impl BlogServer<HttpTransport> {
    /// Create a server talking to the blog described by `config`
    pub fn from_config(config: &Config) -> Self {
        let service = BlogService::from_config(config);
        if let Err(err) = &service {
            tracing::warn!(error = %err, "blog service unavailable, tool calls will fail");
        }
        Self {
            service: Arc::new(service),
        }
    }
}

impl<T: Transport + 'static> BlogServer<T> {
    /// Create a server around an existing service
    pub fn new(service: BlogService<T>) -> Self {
        Self {
            service: Arc::new(Ok(service)),
        }
    }

    /// Serve the MCP protocol over stdio
    pub async fn serve_stdio(&self) -> McpResult<()> {
        tracing::info!("hatena MCP server starting");

        let stdin = tokio::io::stdin();
        let stdout = tokio::io::stdout();

        let service = rmcp::serve_server(self.clone(), (stdin, stdout))
            .await
            .map_err(|e| {
                tracing::error!("server initialization error: {}", e);
                McpError::Protocol(e.to_string())
            })?;

        service.waiting().await.map_err(|e| {
            tracing::error!("server runtime error: {}", e);
            McpError::Protocol(e.to_string())
        })?;

        tracing::info!("hatena MCP server stopped");
        Ok(())
    }

    /// Run one tool call.
    ///
    /// Unknown tools and undecodable arguments are protocol errors. Failures
    /// of the operation itself come back as a tool result flagged as an
    /// error whose text is `{"error": "<message>"}`.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, ErrorData> {
        if !tools::is_known(name) {
            return Err(McpError::UnknownTool(name.to_string()).into());
        }

        let service = match self.service.as_ref() {
            Ok(service) => service,
            Err(err) => return Ok(error_result(&err.to_string())),
        };

        match tools::dispatch(service, name, arguments).await {
            Ok(payload) => Ok(CallToolResult::success(vec![Content::text(
                payload.to_string(),
            )])),
            Err(err) if err.is_tool_failure() => {
                tracing::warn!(tool = name, error = %err, "tool call failed");
                Ok(error_result(&err.to_string()))
            },
            Err(err) => Err(err.into()),
        }
    }
}

fn error_result(message: &str) -> CallToolResult {
    CallToolResult::error(vec![Content::text(json!({ "error": message }).to_string())])
}

impl<T: Transport + 'static> ServerHandler for BlogServer<T> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "hatena-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(tools::catalog()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        self.invoke(&request.name, request.arguments).await
    }
}
