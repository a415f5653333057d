use serde::{Deserialize, Serialize};

/// Prefix of the logical cache key for entry records.
pub const ENTRY_KEY_PREFIX: &str = "entry_";

/// Canonical, feed-agnostic representation of one blog entry.
///
/// Records produced from list pages are partial: `content` and `draft` are
/// `None`. Records produced from single-entry documents are full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    /// Atom `<id>`; stable across edits.
    pub id: String,
    /// May be empty.
    pub title: String,
    /// Public URL of the entry (`alternate` link).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// RFC 3339 publication time as served.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    /// RFC 3339 time of the last edit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    /// Category labels in document order.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Body, present only on full records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<EntryContent>,
    /// `Some(true)` only when the member document marks the entry as a draft.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<bool>,
}

/// Entry body with its declared content type (`text`, `html`, `xhtml`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryContent {
    /// Raw body as served.
    pub text: String,
    /// Value of the `type` attribute, `text` when absent.
    #[serde(rename = "type")]
    pub content_type: String,
}

impl EntryRecord {
    /// Short member id used in detail URIs and cache keys.
    ///
    /// Hatena ids look like `tag:blog.hatena.ne.jp,2013:blog-user-1234-5678`;
    /// the member id is the segment after the last `-` or `/`.
    #[must_use]
    pub fn entry_id(&self) -> &str {
        self.id
            .rsplit(['-', '/'])
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(self.id.as_str())
    }

    /// Whether the record came from a detail document.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.content.is_some()
    }

    /// Body text, if loaded.
    #[must_use]
    pub fn content_text(&self) -> Option<&str> {
        self.content.as_ref().map(|c| c.text.as_str())
    }
}

/// Logical cache key for an entry member id.
#[must_use]
pub fn entry_cache_key(entry_id: &str) -> String {
    format!("{ENTRY_KEY_PREFIX}{entry_id}")
}

/// One page of a walk over the remote collection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WalkPage {
    /// Well-formed entries in feed order.
    pub entries: Vec<EntryRecord>,
    /// `next` link of the page, verbatim.
    pub next_cursor: Option<String>,
    /// Entries dropped under [`crate::MalformedPolicy::Skip`].
    pub skipped: usize,
}

/// Payload of `list_entries`.
#[derive(Debug, Clone, Serialize)]
pub struct EntryPage {
    /// List-form records.
    pub entries: Vec<EntryRecord>,
    /// Cursor for the following page; `None` on the last page.
    pub next_page_url: Option<String>,
    /// Length of `entries`.
    pub count: usize,
}

/// Field that satisfied a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchField {
    /// Entry title.
    Title,
    /// One of the category labels.
    Category,
    /// Entry body.
    Content,
}

/// Where a search read its entries from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Walked the remote collection.
    Live,
    /// Scanned the local cache only.
    Cache,
}

/// A search match and the field that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Matching record, list form for live searches.
    #[serde(flatten)]
    pub entry: EntryRecord,
    /// First field that matched.
    pub matched_in: MatchField,
}

/// Payload of both search operations.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    /// Hits in visiting order.
    pub entries: Vec<SearchHit>,
    /// Length of `entries`.
    pub count: usize,
    /// Keyword as given by the caller.
    pub keyword: String,
    /// Candidates examined before the scan stopped.
    pub scanned: usize,
    /// Source of the candidates.
    pub mode: SearchMode,
}

/// Number of entries carrying one category label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    /// Label as written on the entries.
    pub name: String,
    /// Entries carrying the label.
    pub count: usize,
}

/// Category counts, most used first.
#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    /// Per-category counts.
    pub categories: Vec<CategoryCount>,
    /// Number of distinct categories.
    pub total: usize,
}

/// Entries filed under one category.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryEntries {
    /// Matching list-form records in feed order.
    pub entries: Vec<EntryRecord>,
    /// Length of `entries`.
    pub count: usize,
    /// Requested category.
    pub category: String,
}

/// Outcome of a full-collection sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Entries fetched and written.
    pub synced: usize,
    /// Entries skipped as malformed or that failed to fetch or write.
    pub errors: usize,
    /// List pages walked.
    pub pages: usize,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record(id: &str) -> EntryRecord {
        EntryRecord {
            id: id.to_string(),
            title: "t".to_string(),
            link: None,
            published: None,
            updated: None,
            categories: Vec::new(),
            content: None,
            draft: None,
        }
    }

    #[test]
    fn test_entry_id_from_tag_uri() {
        let r = record("tag:blog.hatena.ne.jp,2013:blog-someone-12704346814673868829-6802418398372785913");
        assert_eq!(r.entry_id(), "6802418398372785913");
    }

    #[test]
    fn test_entry_id_from_url() {
        let r = record("https://blog.hatena.ne.jp/someone/someone.hatenablog.com/atom/entry/42");
        assert_eq!(r.entry_id(), "42");
    }

    #[test]
    fn test_entry_id_without_separator_is_whole_id() {
        assert_eq!(record("plain").entry_id(), "plain");
        assert_eq!(record("trailing-").entry_id(), "trailing-");
    }

    #[test]
    fn test_partial_record_serializes_without_content_or_draft() {
        let json = serde_json::to_value(record("a-1")).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("content"));
        assert!(!obj.contains_key("draft"));
        assert_eq!(obj["categories"], serde_json::json!([]));
    }

    #[test]
    fn test_search_hit_flattens_entry_fields() {
        let hit = SearchHit {
            entry: record("a-1"),
            matched_in: MatchField::Category,
        };
        let json = serde_json::to_value(hit).unwrap();
        assert_eq!(json["id"], "a-1");
        assert_eq!(json["matched_in"], "category");
    }

    #[test]
    fn test_entry_cache_key() {
        assert_eq!(entry_cache_key("123"), "entry_123");
    }
}
