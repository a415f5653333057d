//! Entry listing and lookup tools

use hatena_core::{BlogService, EntryPage, EntryRecord, Error, Transport};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::McpResult;

/// Paged listing tool name.
pub const LIST_ENTRIES: &str = "list_entries";
/// Single entry lookup tool name.
pub const GET_ENTRY: &str = "get_entry";

/// Parameters for list_entries
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListEntriesParams {
    /// `next_page_url` from a previous call; omit for the newest page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,

    /// Maximum number of entries to return
    #[serde(default = "super::default_max_results")]
    pub max_results: usize,
}

/// Parameters for get_entry
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetEntryParams {
    /// Entry id as returned in list results (the trailing number of `id`)
    pub entry_id: String,
}

/// Full entry as returned by get_entry
#[derive(Debug, Serialize)]
pub struct EntryDetail {
    /// Atom id.
    pub id: String,
    /// Entry title, possibly empty.
    pub title: String,
    /// Body, empty when the document carried none.
    pub content: String,
    /// Declared body type.
    pub content_type: String,
    /// Public URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Publication time.
    pub published: Option<String>,
    /// Last edit time.
    pub updated: Option<String>,
    /// Category labels.
    pub categories: Vec<String>,
    /// Whether the entry is unpublished.
    pub draft: bool,
}

impl From<EntryRecord> for EntryDetail {
    fn from(record: EntryRecord) -> Self {
        let (content, content_type) = record
            .content
            .map(|c| (c.text, c.content_type))
            .unwrap_or_else(|| (String::new(), "text".to_string()));
        Self {
            id: record.id,
            title: record.title,
            content,
            content_type,
            link: record.link,
            published: record.published,
            updated: record.updated,
            categories: record.categories,
            draft: record.draft.unwrap_or(false),
        }
    }
}

/// Followed page URLs must lie under the configured collection URI.
fn validate_page_url(page_url: &str, collection_uri: &str) -> McpResult<()> {
    if page_url.starts_with(collection_uri) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("page_url must be a page of {collection_uri}")).into())
    }
}

/// One page of entries, following `page_url` when given.
pub async fn handle_list_entries<T: Transport>(
    service: &BlogService<T>,
    params: ListEntriesParams,
) -> McpResult<EntryPage> {
    let page_url = params
        .page_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty());
    if let Some(url) = page_url {
        validate_page_url(url, service.walker().endpoints().collection_uri())?;
    }
    Ok(service.list_entries(page_url, params.max_results).await?)
}

/// Full entry, served from the cache when possible.
pub async fn handle_get_entry<T: Transport>(
    service: &BlogService<T>,
    params: GetEntryParams,
) -> McpResult<EntryDetail> {
    let record = service.get_entry(params.entry_id.trim()).await?;
    Ok(record.into())
}
