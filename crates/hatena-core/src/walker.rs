//! Paginated traversal of the entry collection.
//!
//! A walk starts at the collection URI (or a caller-supplied cursor) and
//! follows the `next` link relation verbatim. The collection is exhausted
//! when a page carries no `next` link; [`Pages`] is the one place that rule is
//! encoded, and every full-collection operation goes through it.
//!
//! Entries are yielded in feed order. Nothing is deduplicated across pages:
//! if the blog changes mid-walk, entries can be skipped or repeated.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::config::{Endpoints, MalformedPolicy};
use crate::fetcher::Transport;
use crate::normalizer::{parse_entry, parse_feed};
use crate::{EntryRecord, Error, Result, WalkPage};

/// Fetches and normalizes pages and single entries.
pub struct Walker<T> {
    transport: Arc<T>,
    endpoints: Endpoints,
    on_malformed: MalformedPolicy,
}

impl<T> Clone for Walker<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            endpoints: self.endpoints.clone(),
            on_malformed: self.on_malformed,
        }
    }
}

impl<T: Transport> Walker<T> {
    /// Create a walker over the collection described by `endpoints`.
    pub fn new(transport: Arc<T>, endpoints: Endpoints, on_malformed: MalformedPolicy) -> Self {
        Self {
            transport,
            endpoints,
            on_malformed,
        }
    }

    /// Resolved collection URIs.
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Fetch one page and normalize up to `page_size` of its entries.
    ///
    /// `cursor` is a `next` URL from a previous page; `None` starts at the
    /// collection root.
    ///
    /// # Errors
    ///
    /// Transport and XML errors for the page itself. Under
    /// [`MalformedPolicy::Abort`] the first malformed entry fails the page.
    #[instrument(skip(self))]
    pub async fn walk(&self, cursor: Option<&str>, page_size: usize) -> Result<WalkPage> {
        let url = cursor.unwrap_or_else(|| self.endpoints.collection_uri());
        let xml = self.transport.get(url).await?;
        let document = parse_feed(&xml)?;

        let mut page = WalkPage {
            next_cursor: document.next,
            ..WalkPage::default()
        };

        for raw in document.entries.into_iter().take(page_size) {
            match raw {
                Ok(entry) => page.entries.push(entry),
                Err(err) => match self.on_malformed {
                    MalformedPolicy::Abort => return Err(err),
                    MalformedPolicy::Skip => {
                        warn!(error = %err, url, "skipping malformed entry");
                        page.skipped += 1;
                    },
                },
            }
        }

        debug!(
            entries = page.entries.len(),
            skipped = page.skipped,
            has_next = page.next_cursor.is_some(),
            "walked page"
        );
        Ok(page)
    }

    /// Iterate the whole collection from the first page.
    ///
    /// Every entry of every page is yielded; pages are never truncated.
    pub const fn pages(&self) -> Pages<'_, T> {
        Pages {
            walker: self,
            cursor: None,
            exhausted: false,
            fetched: 0,
        }
    }

    /// Fetch the full record for a member id.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] for ids that cannot name a member, otherwise
    /// transport, XML and malformed-record errors, all propagated.
    #[instrument(skip(self))]
    pub async fn fetch_entry(&self, entry_id: &str) -> Result<EntryRecord> {
        validate_entry_id(entry_id)?;
        let xml = self.transport.get(&self.endpoints.entry_uri(entry_id)).await?;
        parse_entry(&xml)
    }
}

/// Reject ids that would escape the member URI.
pub(crate) fn validate_entry_id(entry_id: &str) -> Result<()> {
    if entry_id.trim().is_empty() {
        return Err(Error::InvalidInput("entry id cannot be empty".into()));
    }
    if entry_id.contains(['/', '?', '#']) || entry_id.contains("..") {
        return Err(Error::InvalidInput(format!(
            "entry id '{entry_id}' must be a bare member id"
        )));
    }
    Ok(())
}

/// Cursor-threading iterator over every page of the collection.
///
/// ```rust,no_run
/// # async fn demo<T: hatena_core::Transport>(walker: &hatena_core::Walker<T>) -> hatena_core::Result<()> {
/// let mut pages = walker.pages();
/// while let Some(page) = pages.next_page().await? {
///     for entry in &page.entries {
///         println!("{}", entry.title);
///     }
/// }
/// println!("visited {} pages", pages.pages_fetched());
/// # Ok(())
/// # }
/// ```
pub struct Pages<'a, T> {
    walker: &'a Walker<T>,
    cursor: Option<String>,
    exhausted: bool,
    fetched: usize,
}

impl<T: Transport> Pages<'_, T> {
    /// Fetch the next page, or `None` once a page without `next` was seen.
    pub async fn next_page(&mut self) -> Result<Option<WalkPage>> {
        if self.exhausted {
            return Ok(None);
        }
        let page = match self.walker.walk(self.cursor.as_deref(), usize::MAX).await {
            Ok(page) => page,
            Err(err) => {
                self.exhausted = true;
                return Err(err);
            },
        };
        self.fetched += 1;
        match &page.next_cursor {
            Some(next) => self.cursor = Some(next.clone()),
            None => self.exhausted = true,
        }
        Ok(Some(page))
    }

    /// Pages fetched so far.
    pub const fn pages_fetched(&self) -> usize {
        self.fetched
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::testing::{FeedFixture, FixtureEntry, MemoryTransport};
    use proptest::prelude::*;

    fn walker_for(fixture: &FeedFixture, policy: MalformedPolicy) -> Walker<MemoryTransport> {
        Walker::new(
            Arc::new(fixture.transport()),
            fixture.endpoints(),
            policy,
        )
    }

    #[tokio::test]
    async fn test_walk_first_page() {
        let fixture = FeedFixture::numbered(3, 2);
        let walker = walker_for(&fixture, MalformedPolicy::Skip);

        let page = walker.walk(None, 50).await.unwrap();
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].entry_id(), "1");
        assert_eq!(page.next_cursor.as_deref(), Some(fixture.page_uri(2).as_str()));
        assert_eq!(page.skipped, 0);
    }

    #[tokio::test]
    async fn test_walk_follows_cursor_verbatim() {
        let fixture = FeedFixture::numbered(3, 2);
        let walker = walker_for(&fixture, MalformedPolicy::Skip);

        let cursor = fixture.page_uri(2);
        let page = walker.walk(Some(&cursor), 50).await.unwrap();
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].entry_id(), "3");
        assert_eq!(page.next_cursor, None);
        assert_eq!(fixture.transport().requests(), vec![cursor]);
    }

    #[tokio::test]
    async fn test_walk_truncates_to_page_size() {
        let fixture = FeedFixture::numbered(5, 5);
        let walker = walker_for(&fixture, MalformedPolicy::Skip);
        let page = walker.walk(None, 2).await.unwrap();
        let ids: Vec<_> = page.entries.iter().map(EntryRecord::entry_id).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_walk_propagates_transport_status() {
        let fixture = FeedFixture::numbered(1, 1);
        let transport = fixture.transport();
        transport.fail(fixture.endpoints().collection_uri(), 500);
        let walker = Walker::new(Arc::new(transport), fixture.endpoints(), MalformedPolicy::Skip);

        let err = walker.walk(None, 10).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_malformed_skip_and_abort() {
        let fixture = FeedFixture::new(vec![
            FixtureEntry::new("1", "one"),
            FixtureEntry::new("2", "two").without_title(),
            FixtureEntry::new("3", "three"),
        ])
        .per_page(10);

        let skipping = walker_for(&fixture, MalformedPolicy::Skip);
        let page = skipping.walk(None, 10).await.unwrap();
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.skipped, 1);

        let aborting = walker_for(&fixture, MalformedPolicy::Abort);
        let err = aborting.walk(None, 10).await.unwrap_err();
        assert!(matches!(err, Error::MalformedRecord(_)));
    }

    #[tokio::test]
    async fn test_fetch_entry_returns_full_record() {
        let fixture = FeedFixture::new(vec![
            FixtureEntry::new("7", "seven")
                .content("body text")
                .draft(true),
        ]);
        let walker = walker_for(&fixture, MalformedPolicy::Skip);
        let record = walker.fetch_entry("7").await.unwrap();
        assert_eq!(record.content_text(), Some("body text"));
        assert_eq!(record.draft, Some(true));
    }

    #[tokio::test]
    async fn test_fetch_entry_rejects_path_like_ids() {
        let fixture = FeedFixture::numbered(1, 1);
        let walker = walker_for(&fixture, MalformedPolicy::Skip);
        for bad in ["", "  ", "a/b", "../x", "1?page=2"] {
            let err = walker.fetch_entry(bad).await.unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "accepted {bad:?}");
        }
        assert!(fixture.transport().requests().is_empty());
    }

    #[tokio::test]
    async fn test_pages_stops_after_error() {
        let fixture = FeedFixture::numbered(4, 2);
        let transport = fixture.transport();
        transport.fail(&fixture.page_uri(2), 502);
        let walker = Walker::new(Arc::new(transport), fixture.endpoints(), MalformedPolicy::Skip);

        let mut pages = walker.pages();
        assert!(pages.next_page().await.unwrap().is_some());
        assert!(pages.next_page().await.is_err());
        assert!(pages.next_page().await.unwrap().is_none());
        assert_eq!(pages.pages_fetched(), 1);
    }

    #[tokio::test]
    async fn test_pages_yield_every_entry_of_large_pages() {
        let fixture = FeedFixture::numbered(130, 65);
        let walker = walker_for(&fixture, MalformedPolicy::Skip);

        let mut pages = walker.pages();
        let first = pages.next_page().await.unwrap().unwrap();
        assert_eq!(first.entries.len(), 65);
        let second = pages.next_page().await.unwrap().unwrap();
        assert_eq!(second.entries.last().unwrap().entry_id(), "130");
        assert!(pages.next_page().await.unwrap().is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_full_walk_visits_every_entry_once(total in 0usize..40, per_page in 1usize..8) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let fixture = FeedFixture::numbered(total, per_page);
            let walker = walker_for(&fixture, MalformedPolicy::Skip);

            let (ids, fetched) = runtime.block_on(async {
                let mut pages = walker.pages();
                let mut ids = Vec::new();
                while let Some(page) = pages.next_page().await.unwrap() {
                    ids.extend(page.entries.iter().map(|e| e.entry_id().to_string()));
                }
                (ids, pages.pages_fetched())
            });

            let expected: Vec<String> = (1..=total).map(|n| n.to_string()).collect();
            prop_assert_eq!(ids, expected);
            prop_assert_eq!(fetched, total.div_ceil(per_page).max(1));
        }
    }
}
