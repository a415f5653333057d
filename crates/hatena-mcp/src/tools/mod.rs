//! MCP tools for Hatena Blog
//!
//! Each submodule owns a group of tools: its parameter structs (whose
//! `JsonSchema` becomes the advertised input schema), its output types and
//! its handlers. [`dispatch`] routes a call by name.

pub mod cache;
pub mod categories;
pub mod entries;
pub mod search;

use std::sync::Arc;

use hatena_core::{BlogService, Transport};
use rmcp::model::{JsonObject, Tool};
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{McpError, McpResult};

pub use cache::{ClearCacheOutput, SyncOutput, handle_clear_cache, handle_sync_all};
pub use categories::{
    CategoryParams, NoParams, handle_entries_by_category, handle_get_categories,
};
pub use entries::{
    EntryDetail, GetEntryParams, ListEntriesParams, handle_get_entry, handle_list_entries,
};
pub use search::{SearchParams, handle_search_cached_entries, handle_search_entries};

/// Result limit applied when a call omits `max_results`.
pub const DEFAULT_MAX_RESULTS: usize = 10;

pub(crate) const fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

pub(crate) const fn default_true() -> bool {
    true
}

/// Every tool name the server answers to.
pub const TOOL_NAMES: [&str; 8] = [
    entries::LIST_ENTRIES,
    entries::GET_ENTRY,
    search::SEARCH_ENTRIES,
    search::SEARCH_CACHED_ENTRIES,
    categories::GET_CATEGORIES,
    categories::GET_ENTRIES_BY_CATEGORY,
    cache::SYNC_ALL,
    cache::CLEAR_CACHE,
];

/// Whether `name` is in the catalog.
pub fn is_known(name: &str) -> bool {
    TOOL_NAMES.contains(&name)
}

/// Tool descriptors advertised by `tools/list`.
pub fn catalog() -> Vec<Tool> {
    vec![
        tool::<ListEntriesParams>(
            entries::LIST_ENTRIES,
            "List blog entries one page at a time. Pass next_page_url back as page_url to continue.",
        ),
        tool::<GetEntryParams>(
            entries::GET_ENTRY,
            "Get one entry with its body and draft flag. Served from the local cache when possible.",
        ),
        tool::<SearchParams>(
            search::SEARCH_ENTRIES,
            "Search entries live by keyword in title, categories and optionally body (case-insensitive).",
        ),
        tool::<SearchParams>(
            search::SEARCH_CACHED_ENTRIES,
            "Search cached entries by keyword without network access. Run sync_all_entries_to_cache first.",
        ),
        tool::<NoParams>(
            categories::GET_CATEGORIES,
            "List every category with the number of entries using it, most used first.",
        ),
        tool::<CategoryParams>(
            categories::GET_ENTRIES_BY_CATEGORY,
            "List entries tagged with exactly the given category.",
        ),
        tool::<NoParams>(
            cache::SYNC_ALL,
            "Fetch every entry with its body and store it in the local cache.",
        ),
        tool::<NoParams>(cache::CLEAR_CACHE, "Delete every cached entry."),
    ]
}

fn tool<P: JsonSchema>(name: &'static str, description: &'static str) -> Tool {
    Tool::new(name, description, Arc::new(input_schema::<P>()))
}

/// JSON Schema object describing `P`.
pub(crate) fn input_schema<P: JsonSchema>() -> JsonObject {
    match serde_json::to_value(schemars::schema_for!(P)) {
        Ok(Value::Object(map)) => map,
        _ => JsonObject::new(),
    }
}

/// Decode call arguments, treating absent arguments as `{}`.
pub fn parse_params<P: DeserializeOwned>(arguments: Option<JsonObject>) -> McpResult<P> {
    serde_json::from_value(Value::Object(arguments.unwrap_or_default()))
        .map_err(|e| McpError::InvalidParams(e.to_string()))
}

/// Run tool `name` against `service` and return its JSON payload.
pub async fn dispatch<T: Transport>(
    service: &BlogService<T>,
    name: &str,
    arguments: Option<JsonObject>,
) -> McpResult<Value> {
    tracing::debug!(tool = name, "dispatching tool call");
    match name {
        entries::LIST_ENTRIES => {
            json(handle_list_entries(service, parse_params(arguments)?).await?)
        },
        entries::GET_ENTRY => json(handle_get_entry(service, parse_params(arguments)?).await?),
        search::SEARCH_ENTRIES => {
            json(handle_search_entries(service, parse_params(arguments)?).await?)
        },
        search::SEARCH_CACHED_ENTRIES => {
            json(handle_search_cached_entries(service, parse_params(arguments)?).await?)
        },
        categories::GET_CATEGORIES => json(handle_get_categories(service).await?),
        categories::GET_ENTRIES_BY_CATEGORY => {
            json(handle_entries_by_category(service, parse_params(arguments)?).await?)
        },
        cache::SYNC_ALL => json(handle_sync_all(service).await?),
        cache::CLEAR_CACHE => json(handle_clear_cache(service)?),
        other => Err(McpError::UnknownTool(other.to_string())),
    }
}

fn json<S: Serialize>(output: S) -> McpResult<Value> {
    Ok(serde_json::to_value(output)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use hatena_core::testing::FeedFixture;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_catalog_matches_names() {
        let catalog = catalog();
        let names: Vec<_> = catalog.iter().map(|t| t.name.to_string()).collect();
        assert_eq!(names, TOOL_NAMES.map(str::to_string).to_vec());
        for tool in &catalog {
            assert_eq!(tool.input_schema.get("type"), Some(&json!("object")));
        }
    }

    #[test]
    fn test_schema_lists_required_fields() {
        let schema = input_schema::<GetEntryParams>();
        assert_eq!(schema.get("required"), Some(&json!(["entry_id"])));

        let search = input_schema::<SearchParams>();
        let properties = search["properties"].as_object().unwrap();
        assert!(properties.contains_key("keyword"));
        assert!(properties.contains_key("search_in_content"));
        assert_eq!(search.get("required"), Some(&json!(["keyword"])));
    }

    #[test]
    fn test_parse_params_defaults_and_errors() {
        let params: ListEntriesParams = parse_params(None).unwrap();
        assert_eq!(params.max_results, DEFAULT_MAX_RESULTS);
        assert_eq!(params.page_url, None);

        let args = json!({"max_results": -1}).as_object().cloned();
        let err = parse_params::<ListEntriesParams>(args).unwrap_err();
        assert!(matches!(err, McpError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let temp = TempDir::new().unwrap();
        let service = FeedFixture::numbered(1, 1).service(temp.path());
        let err = dispatch(&service, "publish_entry", None).await.unwrap_err();
        assert!(matches!(err, McpError::UnknownTool(name) if name == "publish_entry"));
    }

    #[tokio::test]
    async fn test_dispatch_routes_to_handlers() {
        let temp = TempDir::new().unwrap();
        let service = FeedFixture::numbered(3, 2).service(temp.path());

        let listed = dispatch(&service, entries::LIST_ENTRIES, None).await.unwrap();
        assert_eq!(listed["count"], 2);

        let synced = dispatch(&service, cache::SYNC_ALL, None).await.unwrap();
        assert_eq!(synced["synced"], 3);

        let cleared = dispatch(&service, cache::CLEAR_CACHE, None).await.unwrap();
        assert_eq!(cleared["removed"], 3);
    }
}
