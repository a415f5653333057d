//! Hatena Blog MCP Server
//!
//! An MCP (Model Context Protocol) server exposing one Hatena Blog as agent
//! tools: listing, lookup, keyword search (live or against a local cache),
//! category aggregation and cache maintenance.

pub mod error;
pub mod server;
pub mod tools;

pub use error::{McpError, McpResult};
pub use server::BlogServer;

use hatena_core::Config;

/// Main entry point for the MCP server
///
/// Builds the server from `config` and runs it over stdio until the client
/// disconnects. Logging must already be directed away from stdout.
///
/// # Errors
///
/// Returns an error if the MCP session fails to initialize or run.
pub async fn serve_stdio(config: &Config) -> McpResult<()> {
    tracing::debug!(cache_dir = %config.cache.dir.display(), "initializing hatena MCP server");

    let server = BlogServer::from_config(config);
    server.serve_stdio().await
}
