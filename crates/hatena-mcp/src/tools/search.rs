//! Keyword search tools (live and cached)

use hatena_core::{BlogService, SearchResults, Transport};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::McpResult;

/// Live search tool name.
pub const SEARCH_ENTRIES: &str = "search_entries";
/// Cache-only search tool name.
pub const SEARCH_CACHED_ENTRIES: &str = "search_cached_entries";

/// Parameters shared by search_entries and search_cached_entries
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchParams {
    /// Text to look for (case-insensitive substring)
    pub keyword: String,

    /// Maximum number of matching entries to return
    #[serde(default = "super::default_max_results")]
    pub max_results: usize,

    /// Also match against entry bodies
    #[serde(default = "super::default_true")]
    pub search_in_content: bool,
}

/// Search the live collection.
pub async fn handle_search_entries<T: Transport>(
    service: &BlogService<T>,
    params: SearchParams,
) -> McpResult<SearchResults> {
    Ok(service
        .search_entries(&params.keyword, params.max_results, params.search_in_content)
        .await?)
}

/// Search cached records without network access.
pub async fn handle_search_cached_entries<T: Transport>(
    service: &BlogService<T>,
    params: SearchParams,
) -> McpResult<SearchResults> {
    Ok(service
        .search_cached_entries(&params.keyword, params.max_results, params.search_in_content)
        .await?)
}
