//! Read-side operations: listing, lookup, search and category aggregation.
//!
//! Two search modes exist. [`BlogService::search_entries`] walks the live
//! collection and fetches bodies only for candidates whose title and
//! categories did not match. [`BlogService::search_cached_entries`] scans
//! the local cache and never touches the network.
//!
//! Matching is a case-insensitive substring test against the title, then each
//! category, then (optionally) the body. The first matching field wins and is
//! reported as [`MatchField`].

use std::cmp::Ordering;

use tracing::{debug, instrument, warn};

use crate::fetcher::Transport;
use crate::service::BlogService;
use crate::walker::validate_entry_id;
use crate::{
    CategoryCount, CategoryEntries, CategorySummary, EntryPage, EntryRecord, Error, MatchField,
    Result, SearchHit, SearchMode, SearchResults, entry_cache_key,
};

/// Live search stops after examining this many candidates per wanted match.
const LIVE_SCAN_FACTOR: usize = 3;

struct Matcher {
    needle: String,
}

impl Matcher {
    fn new(keyword: &str) -> Result<Self> {
        let needle = keyword.trim();
        if needle.is_empty() {
            return Err(Error::InvalidInput("search keyword cannot be empty".into()));
        }
        Ok(Self {
            needle: needle.to_lowercase(),
        })
    }

    fn hit(&self, haystack: &str) -> bool {
        haystack.to_lowercase().contains(&self.needle)
    }

    /// Title or category match, without needing the body.
    fn metadata(&self, entry: &EntryRecord) -> Option<MatchField> {
        if self.hit(&entry.title) {
            Some(MatchField::Title)
        } else if entry.categories.iter().any(|c| self.hit(c)) {
            Some(MatchField::Category)
        } else {
            None
        }
    }

    fn content(&self, entry: &EntryRecord) -> bool {
        entry.content_text().is_some_and(|text| self.hit(text))
    }
}

impl<T: Transport> BlogService<T> {
    /// One page of the collection, at most `max_results` entries.
    ///
    /// # Errors
    ///
    /// Transport and parse errors for the page.
    #[instrument(skip(self))]
    pub async fn list_entries(
        &self,
        page_url: Option<&str>,
        max_results: usize,
    ) -> Result<EntryPage> {
        if max_results == 0 {
            return Ok(EntryPage {
                entries: Vec::new(),
                next_page_url: None,
                count: 0,
            });
        }
        let page = self.walker.walk(page_url, max_results).await?;
        Ok(EntryPage {
            count: page.entries.len(),
            entries: page.entries,
            next_page_url: page.next_cursor,
        })
    }

    /// Full record for `entry_id`, from the cache when possible.
    ///
    /// On a miss the record is fetched live and cached, unless live fallback
    /// is disabled, in which case the miss is [`Error::NotFound`].
    #[instrument(skip(self))]
    pub async fn get_entry(&self, entry_id: &str) -> Result<EntryRecord> {
        validate_entry_id(entry_id)?;
        let key = entry_cache_key(entry_id);

        if let Some(record) = self.cache.get::<EntryRecord>(&key).filter(EntryRecord::is_full) {
            return Ok(record);
        }
        if !self.live_fallback {
            return Err(Error::NotFound(format!(
                "entry {entry_id} is not cached; run sync_all_entries_to_cache first"
            )));
        }

        let record = self.walker.fetch_entry(entry_id).await?;
        if let Err(err) = self.cache.put(&key, &record) {
            warn!(error = %err, "failed to cache fetched entry");
        }
        Ok(record)
    }

    /// Search the live collection.
    ///
    /// Stops once `max_results` hits were found or `3 × max_results`
    /// candidates were examined, whichever comes first. Hits are in feed
    /// order and carry the list-form record. A failing body fetch fails the
    /// whole search.
    #[instrument(skip(self))]
    pub async fn search_entries(
        &self,
        keyword: &str,
        max_results: usize,
        search_in_content: bool,
    ) -> Result<SearchResults> {
        let matcher = Matcher::new(keyword)?;
        let mut results = empty_results(keyword, SearchMode::Live);
        if max_results == 0 {
            return Ok(results);
        }

        let scan_limit = max_results.saturating_mul(LIVE_SCAN_FACTOR);
        let mut pages = self.walker.pages();

        'walk: while let Some(page) = pages.next_page().await? {
            for entry in page.entries {
                if results.scanned >= scan_limit || results.entries.len() >= max_results {
                    break 'walk;
                }
                results.scanned += 1;

                let matched = match matcher.metadata(&entry) {
                    Some(field) => Some(field),
                    None if search_in_content => {
                        let full = self.walker.fetch_entry(entry.entry_id()).await?;
                        matcher.content(&full).then_some(MatchField::Content)
                    },
                    None => None,
                };
                if let Some(matched_in) = matched {
                    results.entries.push(SearchHit { entry, matched_in });
                }
            }
            if results.scanned >= scan_limit || results.entries.len() >= max_results {
                break;
            }
        }

        results.count = results.entries.len();
        debug!(
            hits = results.count,
            scanned = results.scanned,
            pages = pages.pages_fetched(),
            "live search finished"
        );
        Ok(results)
    }

    /// Search the cached records only.
    ///
    /// Every fresh cached entry is a candidate. Candidates are visited newest
    /// first by `published` (undated ones last, ties by id) and the scan stops
    /// at `max_results` hits.
    #[instrument(skip(self))]
    pub async fn search_cached_entries(
        &self,
        keyword: &str,
        max_results: usize,
        search_in_content: bool,
    ) -> Result<SearchResults> {
        let matcher = Matcher::new(keyword)?;
        let mut results = empty_results(keyword, SearchMode::Cache);
        if max_results == 0 {
            return Ok(results);
        }

        let mut records: Vec<EntryRecord> = self.cache.scan()?;
        records.sort_by(newest_first);

        for entry in records {
            if results.entries.len() >= max_results {
                break;
            }
            results.scanned += 1;
            let matched = matcher.metadata(&entry).or_else(|| {
                (search_in_content && matcher.content(&entry)).then_some(MatchField::Content)
            });
            if let Some(matched_in) = matched {
                results.entries.push(SearchHit { entry, matched_in });
            }
        }

        results.count = results.entries.len();
        debug!(hits = results.count, scanned = results.scanned, "cache search finished");
        Ok(results)
    }

    /// Count entries per category over the whole collection.
    ///
    /// Sorted by count, highest first. Equal counts keep the order in which
    /// the categories were first seen.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<CategorySummary> {
        let mut counts: Vec<CategoryCount> = Vec::new();
        let mut pages = self.walker.pages();

        while let Some(page) = pages.next_page().await? {
            for entry in &page.entries {
                for label in &entry.categories {
                    match counts.iter_mut().find(|c| &c.name == label) {
                        Some(existing) => existing.count += 1,
                        None => counts.push(CategoryCount {
                            name: label.clone(),
                            count: 1,
                        }),
                    }
                }
            }
        }

        counts.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(CategorySummary {
            total: counts.len(),
            categories: counts,
        })
    }

    /// Entries carrying exactly `category` (case-sensitive), in feed order.
    ///
    /// The walk stops as soon as `max_results` entries were collected.
    #[instrument(skip(self))]
    pub async fn entries_by_category(
        &self,
        category: &str,
        max_results: usize,
    ) -> Result<CategoryEntries> {
        let mut found = CategoryEntries {
            entries: Vec::new(),
            count: 0,
            category: category.to_string(),
        };
        if max_results == 0 {
            return Ok(found);
        }

        let mut pages = self.walker.pages();
        'walk: while let Some(page) = pages.next_page().await? {
            for entry in page.entries {
                if entry.categories.iter().any(|c| c == category) {
                    found.entries.push(entry);
                    if found.entries.len() >= max_results {
                        break 'walk;
                    }
                }
            }
        }

        found.count = found.entries.len();
        Ok(found)
    }
}

fn empty_results(keyword: &str, mode: SearchMode) -> SearchResults {
    SearchResults {
        entries: Vec::new(),
        count: 0,
        keyword: keyword.to_string(),
        scanned: 0,
        mode,
    }
}

fn newest_first(a: &EntryRecord, b: &EntryRecord) -> Ordering {
    match (&a.published, &b.published) {
        (Some(x), Some(y)) => y.cmp(x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::Config;
    use crate::testing::{FeedFixture, FixtureEntry};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn blog() -> FeedFixture {
        FeedFixture::new(vec![
            FixtureEntry::new("1", "Learning Rust")
                .category("Programming")
                .content("ownership and borrowing")
                .published("2024-03-01T00:00:00+09:00"),
            FixtureEntry::new("2", "Weekend hike")
                .category("Diary")
                .category("Outdoors")
                .content("mountains, no code")
                .published("2024-02-01T00:00:00+09:00"),
            FixtureEntry::new("3", "Notes")
                .category("Diary")
                .content("Tried the rust compiler on a Pi")
                .published("2024-01-01T00:00:00+09:00"),
            FixtureEntry::new("4", "Cooking")
                .category("Food")
                .content("miso soup")
                .published("2023-12-01T00:00:00+09:00"),
        ])
        .per_page(2)
    }

    fn ids<'a>(entries: impl IntoIterator<Item = &'a EntryRecord>) -> Vec<&'a str> {
        entries.into_iter().map(EntryRecord::entry_id).collect()
    }

    #[tokio::test]
    async fn test_list_entries_first_and_next_page() {
        let temp = TempDir::new().unwrap();
        let fixture = blog();
        let service = fixture.service(temp.path());

        let first = service.list_entries(None, 10).await.unwrap();
        assert_eq!(first.count, 2);
        assert_eq!(first.next_page_url.as_deref(), Some(fixture.page_uri(2).as_str()));
        assert!(first.entries.iter().all(|e| e.content.is_none()));

        let second = service
            .list_entries(first.next_page_url.as_deref(), 10)
            .await
            .unwrap();
        assert_eq!(ids(&second.entries), vec!["3", "4"]);
        assert_eq!(second.next_page_url, None);
    }

    #[tokio::test]
    async fn test_list_entries_truncates_and_zero_is_offline() {
        let temp = TempDir::new().unwrap();
        let fixture = blog();
        let service = fixture.service(temp.path());

        let page = service.list_entries(None, 1).await.unwrap();
        assert_eq!(page.count, 1);
        assert!(page.next_page_url.is_some());

        let before = fixture.transport().request_count();
        let empty = service.list_entries(None, 0).await.unwrap();
        assert_eq!(empty.count, 0);
        assert_eq!(fixture.transport().request_count(), before);
    }

    #[tokio::test]
    async fn test_get_entry_fetches_once_then_serves_cache() {
        let temp = TempDir::new().unwrap();
        let fixture = blog();
        let service = fixture.service(temp.path());

        let live = service.get_entry("3").await.unwrap();
        assert_eq!(live.content_text(), Some("Tried the rust compiler on a Pi"));
        assert_eq!(fixture.transport().request_count(), 1);

        let cached = service.get_entry("3").await.unwrap();
        assert_eq!(cached, live);
        assert_eq!(fixture.transport().request_count(), 1);
    }

    #[tokio::test]
    async fn test_get_entry_cache_only_miss_is_not_found() {
        let temp = TempDir::new().unwrap();
        let fixture = blog();
        let mut config = Config::default();
        config.cache.dir = temp.path().to_path_buf();
        config.cache.live_fallback = false;
        let service = fixture.service_with(&config);

        let err = service.get_entry("1").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(fixture.transport().request_count(), 0);

        service.sync_all().await.unwrap();
        assert_eq!(service.get_entry("1").await.unwrap().title, "Learning Rust");
    }

    #[tokio::test]
    async fn test_get_entry_ignores_partial_cached_record() {
        let temp = TempDir::new().unwrap();
        let fixture = blog();
        let service = fixture.service(temp.path());

        let listed = service.list_entries(None, 1).await.unwrap().entries.remove(0);
        service.cache().put(&entry_cache_key("1"), &listed).unwrap();

        let record = service.get_entry("1").await.unwrap();
        assert!(record.is_full());
    }

    #[tokio::test]
    async fn test_get_entry_unknown_id_reports_status() {
        let temp = TempDir::new().unwrap();
        let service = blog().service(temp.path());
        let err = service.get_entry("999").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_live_search_priority_and_content() {
        let temp = TempDir::new().unwrap();
        let fixture = blog();
        let service = fixture.service(temp.path());

        let results = service.search_entries("RUST", 10, true).await.unwrap();
        let found: Vec<_> = results
            .entries
            .iter()
            .map(|h| (h.entry.entry_id(), h.matched_in))
            .collect();
        assert_eq!(found, vec![("1", MatchField::Title), ("3", MatchField::Content)]);
        assert_eq!(results.mode, SearchMode::Live);
        assert_eq!(results.keyword, "RUST");
        assert_eq!(results.scanned, 4);

        let diary = service.search_entries("diary", 10, false).await.unwrap();
        assert!(diary.entries.iter().all(|h| h.matched_in == MatchField::Category));
        assert_eq!(diary.count, 2);
    }

    #[tokio::test]
    async fn test_live_search_without_content_never_fetches_bodies() {
        let temp = TempDir::new().unwrap();
        let fixture = blog();
        let service = fixture.service(temp.path());

        let results = service.search_entries("miso", 10, false).await.unwrap();
        assert_eq!(results.count, 0);
        let requests = fixture.transport().requests();
        assert_eq!(requests, vec![fixture.page_uri(1), fixture.page_uri(2)]);
    }

    #[tokio::test]
    async fn test_live_search_scan_limit() {
        let temp = TempDir::new().unwrap();
        let fixture = FeedFixture::numbered(20, 5);
        let service = fixture.service(temp.path());

        let results = service.search_entries("nothing", 2, false).await.unwrap();
        assert_eq!(results.scanned, 6);
        assert_eq!(results.count, 0);
        // 6 candidates fit in the first two pages
        assert_eq!(fixture.transport().request_count(), 2);
    }

    #[tokio::test]
    async fn test_live_search_stops_at_max_results() {
        let temp = TempDir::new().unwrap();
        let fixture = FeedFixture::numbered(20, 5);
        let service = fixture.service(temp.path());

        let results = service.search_entries("entry", 3, true).await.unwrap();
        assert_eq!(results.count, 3);
        assert_eq!(results.scanned, 3);
        assert_eq!(fixture.transport().request_count(), 1);
    }

    #[tokio::test]
    async fn test_live_search_propagates_body_failure() {
        let temp = TempDir::new().unwrap();
        let fixture = blog();
        fixture.transport().fail(fixture.endpoints().entry_uri("2"), 500);
        let service = fixture.service(temp.path());

        let err = service.search_entries("zzz", 10, true).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_search_rejects_blank_keyword_and_zero_is_empty() {
        let temp = TempDir::new().unwrap();
        let fixture = blog();
        let service = fixture.service(temp.path());

        assert!(matches!(
            service.search_entries("  ", 10, true).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            service.search_cached_entries("", 10, true).await,
            Err(Error::InvalidInput(_))
        ));
        let empty = service.search_entries("rust", 0, true).await.unwrap();
        assert_eq!(empty.count, 0);
        assert_eq!(fixture.transport().request_count(), 0);
    }

    #[tokio::test]
    async fn test_cached_search_is_offline_and_ordered() {
        let temp = TempDir::new().unwrap();
        let fixture = blog();
        let service = fixture.service(temp.path());
        service.sync_all().await.unwrap();
        let before = fixture.transport().request_count();

        let results = service.search_cached_entries("o", 10, true).await.unwrap();
        assert_eq!(fixture.transport().request_count(), before);
        assert_eq!(results.mode, SearchMode::Cache);
        assert_eq!(ids(results.entries.iter().map(|h| &h.entry)), vec!["1", "2", "3", "4"]);

        let limited = service.search_cached_entries("o", 2, true).await.unwrap();
        assert_eq!(limited.count, 2);
        assert_eq!(limited.scanned, 2);
    }

    #[tokio::test]
    async fn test_cached_search_content_flag() {
        let temp = TempDir::new().unwrap();
        let fixture = blog();
        let service = fixture.service(temp.path());
        service.sync_all().await.unwrap();

        let with_body = service.search_cached_entries("miso", 10, true).await.unwrap();
        assert_eq!(with_body.count, 1);
        assert_eq!(with_body.entries[0].matched_in, MatchField::Content);

        let without_body = service.search_cached_entries("miso", 10, false).await.unwrap();
        assert_eq!(without_body.count, 0);
        assert_eq!(without_body.scanned, 4);
    }

    #[tokio::test]
    async fn test_cached_search_on_empty_cache() {
        let temp = TempDir::new().unwrap();
        let service = blog().service(&temp.path().join("never-created"));
        let results = service.search_cached_entries("rust", 10, true).await.unwrap();
        assert_eq!(results.count, 0);
        assert_eq!(results.scanned, 0);
    }

    #[tokio::test]
    async fn test_categories_across_pages() {
        let temp = TempDir::new().unwrap();
        let fixture = FeedFixture::new(vec![
            FixtureEntry::new("1", "a").category("A"),
            FixtureEntry::new("2", "b").category("B"),
            FixtureEntry::new("3", "c").category("A"),
        ])
        .per_page(2);
        let service = fixture.service(temp.path());

        let summary = service.categories().await.unwrap();
        assert_eq!(
            summary.categories,
            vec![
                CategoryCount { name: "A".into(), count: 2 },
                CategoryCount { name: "B".into(), count: 1 },
            ]
        );
        assert_eq!(summary.total, 2);
    }

    #[tokio::test]
    async fn test_categories_count_every_entry_of_large_pages() {
        let temp = TempDir::new().unwrap();
        let entries = (1..=120)
            .map(|n| FixtureEntry::new(n.to_string(), format!("entry {n}")).category("Diary"))
            .collect();
        let fixture = FeedFixture::new(entries).per_page(60);
        let service = fixture.service(temp.path());

        let summary = service.categories().await.unwrap();
        assert_eq!(summary.categories, vec![CategoryCount { name: "Diary".into(), count: 120 }]);

        let diary = service.entries_by_category("Diary", 200).await.unwrap();
        assert_eq!(diary.count, 120);
    }

    #[tokio::test]
    async fn test_categories_ties_keep_first_seen_order() {
        let temp = TempDir::new().unwrap();
        let service = blog().service(temp.path());
        let summary = service.categories().await.unwrap();
        let names: Vec<_> = summary.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Diary", "Programming", "Outdoors", "Food"]);
    }

    #[tokio::test]
    async fn test_entries_by_category_exact_match_and_early_stop() {
        let temp = TempDir::new().unwrap();
        let fixture = blog();
        let service = fixture.service(temp.path());

        let diary = service.entries_by_category("Diary", 10).await.unwrap();
        assert_eq!(ids(&diary.entries), vec!["2", "3"]);
        assert_eq!(diary.category, "Diary");

        let lower = service.entries_by_category("diary", 10).await.unwrap();
        assert_eq!(lower.count, 0);

        let before = fixture.transport().request_count();
        let first = service.entries_by_category("Diary", 1).await.unwrap();
        assert_eq!(ids(&first.entries), vec!["2"]);
        assert_eq!(fixture.transport().request_count() - before, 1);
    }

    #[test]
    fn test_newest_first_ordering() {
        let mut records: Vec<EntryRecord> = [
            ("b", None),
            ("a", Some("2024-01-01")),
            ("c", Some("2024-05-01")),
            ("a2", None),
        ]
        .into_iter()
        .map(|(id, published)| EntryRecord {
            id: id.to_string(),
            title: String::new(),
            link: None,
            published: published.map(str::to_string),
            updated: None,
            categories: Vec::new(),
            content: None,
            draft: None,
        })
        .collect();
        records.sort_by(newest_first);
        let order: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "a2", "b"]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_category_counts_match_occurrences(
            labels in prop::collection::vec(prop::collection::vec(0usize..4, 0..3), 0..15),
            per_page in 1usize..5,
        ) {
            let names = ["Rust", "Diary", "Food", "Travel"];
            let entries = labels
                .iter()
                .enumerate()
                .map(|(n, picks)| {
                    picks.iter().fold(
                        FixtureEntry::new((n + 1).to_string(), format!("e{n}")),
                        |entry, &i| entry.category(names[i]),
                    )
                })
                .collect();
            let fixture = FeedFixture::new(entries).per_page(per_page);
            let temp = TempDir::new().unwrap();
            let service = fixture.service(temp.path());

            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let summary = runtime.block_on(service.categories()).unwrap();

            let total_labels: usize = labels.iter().map(Vec::len).sum();
            prop_assert_eq!(summary.categories.iter().map(|c| c.count).sum::<usize>(), total_labels);
            prop_assert!(summary.categories.windows(2).all(|w| w[0].count >= w[1].count));
            for count in &summary.categories {
                let idx = names.iter().position(|n| *n == count.name).unwrap();
                let expected = labels.iter().flatten().filter(|&&i| i == idx).count();
                prop_assert_eq!(count.count, expected);
            }
        }
    }
}
