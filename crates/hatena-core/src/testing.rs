//! In-memory stand-ins for the remote collection.
//!
//! Enabled for this crate's own tests and, through the `test-support`
//! feature, for downstream crates that want to drive a [`BlogService`]
//! without a network.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::TimeDelta;
use quick_xml::escape::escape;

use crate::config::{Config, Endpoints};
use crate::fetcher::Transport;
use crate::{BlogService, CacheStore, Error, Result};

/// Collection URI every fixture is served under.
pub const FIXTURE_COLLECTION: &str =
    "https://blog.hatena.test/someone/someone.hatenablog.com/atom/entry";

#[derive(Debug, Clone)]
enum Canned {
    Body(String),
    Status(u16),
}

#[derive(Debug, Default)]
struct State {
    responses: HashMap<String, Canned>,
    requests: Vec<String>,
}

/// [`Transport`] answering from a URL → body map and recording every request.
///
/// Clones share state, so a test can keep a handle after giving one away.
/// Unknown URLs answer with HTTP 404.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<State>>,
}

impl MemoryTransport {
    /// Transport that answers every URL with 404.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    pub fn insert(&self, url: impl Into<String>, body: impl Into<String>) {
        self.lock()
            .responses
            .insert(url.into(), Canned::Body(body.into()));
    }

    /// Answer `url` with a non-success `status`.
    pub fn fail(&self, url: impl Into<String>, status: u16) {
        self.lock().responses.insert(url.into(), Canned::Status(status));
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    /// Number of requests served so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn clear_responses(&self) {
        self.lock().responses.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn get(&self, url: &str) -> Result<String> {
        let mut state = self.lock();
        state.requests.push(url.to_string());
        match state.responses.get(url) {
            Some(Canned::Body(body)) => Ok(body.clone()),
            Some(Canned::Status(status)) => Err(Error::Transport {
                status: *status,
                url: url.to_string(),
            }),
            None => Err(Error::Transport {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

/// One entry of a [`FeedFixture`].
#[derive(Debug, Clone)]
pub struct FixtureEntry {
    member_id: String,
    title: Option<String>,
    published: Option<String>,
    categories: Vec<String>,
    content: String,
    content_type: Option<String>,
    draft: bool,
}

impl FixtureEntry {
    /// Entry whose short id is `member_id`.
    pub fn new(member_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            title: Some(title.into()),
            published: None,
            categories: Vec::new(),
            content: String::new(),
            content_type: None,
            draft: false,
        }
    }

    /// Drop `<title>` so the entry normalizes as malformed.
    #[must_use]
    pub fn without_title(mut self) -> Self {
        self.title = None;
        self
    }

    /// Set `<published>` and `<updated>`.
    #[must_use]
    pub fn published(mut self, timestamp: impl Into<String>) -> Self {
        self.published = Some(timestamp.into());
        self
    }

    /// Add a category label.
    #[must_use]
    pub fn category(mut self, term: impl Into<String>) -> Self {
        self.categories.push(term.into());
        self
    }

    /// Body served by the member document.
    #[must_use]
    pub fn content(mut self, text: impl Into<String>) -> Self {
        self.content = text.into();
        self
    }

    /// Override the default `text/x-markdown` content type.
    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Mark the member document as a draft.
    #[must_use]
    pub const fn draft(mut self, draft: bool) -> Self {
        self.draft = draft;
        self
    }

    /// Full Atom id as the server would report it.
    #[must_use]
    pub fn atom_id(&self) -> String {
        format!("tag:blog.hatena.ne.jp,2013:blog-someone-1-{}", self.member_id)
    }

    fn write_common(&self, xml: &mut String) {
        let _ = write!(xml, "<id>{}</id>", escape(&self.atom_id()));
        let _ = write!(
            xml,
            r#"<link rel="alternate" type="text/html" href="https://someone.hatenablog.com/entry/{}"/>"#,
            escape(&self.member_id)
        );
        if let Some(title) = &self.title {
            let _ = write!(xml, "<title>{}</title>", escape(title));
        }
        if let Some(published) = &self.published {
            let _ = write!(xml, "<published>{}</published>", escape(published));
            let _ = write!(xml, "<updated>{}</updated>", escape(published));
        }
        for term in &self.categories {
            let _ = write!(xml, r#"<category term="{}"/>"#, escape(term));
        }
    }

    fn list_xml(&self) -> String {
        let mut xml = String::from("<entry>");
        self.write_common(&mut xml);
        xml.push_str("</entry>");
        xml
    }

    fn member_xml(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="utf-8"?><entry xmlns="http://www.w3.org/2005/Atom" xmlns:app="http://www.w3.org/2007/app">"#,
        );
        self.write_common(&mut xml);
        let _ = write!(
            xml,
            r#"<content type="{}">{}</content>"#,
            escape(self.content_type.as_deref().unwrap_or("text/x-markdown")),
            escape(&self.content)
        );
        let _ = write!(
            xml,
            "<app:control><app:draft>{}</app:draft></app:control>",
            if self.draft { "yes" } else { "no" }
        );
        xml.push_str("</entry>");
        xml
    }
}

/// A paged collection served by a shared [`MemoryTransport`].
///
/// Page 1 lives at [`FIXTURE_COLLECTION`], page `k` at `?page=k`, and every
/// entry's member document at `{collection}/{member_id}`.
#[derive(Debug, Clone)]
pub struct FeedFixture {
    entries: Vec<FixtureEntry>,
    per_page: usize,
    transport: MemoryTransport,
}

impl FeedFixture {
    /// Serve `entries` ten per page.
    #[must_use]
    pub fn new(entries: Vec<FixtureEntry>) -> Self {
        let fixture = Self {
            entries,
            per_page: 10,
            transport: MemoryTransport::new(),
        };
        fixture.install();
        fixture
    }

    /// `total` entries with member ids `1..=total` and titles `Entry n`.
    #[must_use]
    pub fn numbered(total: usize, per_page: usize) -> Self {
        let entries = (1..=total)
            .map(|n| FixtureEntry::new(n.to_string(), format!("Entry {n}")))
            .collect();
        Self::new(entries).per_page(per_page)
    }

    /// Re-page the collection.
    #[must_use]
    pub fn per_page(mut self, per_page: usize) -> Self {
        self.per_page = per_page.max(1);
        self.install();
        self
    }

    /// Handle on the shared transport.
    #[must_use]
    pub fn transport(&self) -> MemoryTransport {
        self.transport.clone()
    }

    /// Endpoints rooted at [`FIXTURE_COLLECTION`].
    #[must_use]
    pub fn endpoints(&self) -> Endpoints {
        Endpoints::from_collection_uri(FIXTURE_COLLECTION)
    }

    /// URI of page `page` (1-based).
    #[must_use]
    pub fn page_uri(&self, page: usize) -> String {
        if page <= 1 {
            FIXTURE_COLLECTION.to_string()
        } else {
            format!("{FIXTURE_COLLECTION}?page={page}")
        }
    }

    /// Number of pages served (an empty collection still has one).
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.entries.len().div_ceil(self.per_page).max(1)
    }

    /// Service over this fixture with a fresh cache at `cache_dir`.
    #[must_use]
    pub fn service(&self, cache_dir: &Path) -> BlogService<MemoryTransport> {
        let mut config = Config::default();
        config.cache.dir = cache_dir.to_path_buf();
        self.service_with(&config)
    }

    /// Service over this fixture using the cache and walk settings of `config`.
    #[must_use]
    pub fn service_with(&self, config: &Config) -> BlogService<MemoryTransport> {
        BlogService::new(
            Arc::new(self.transport()),
            self.endpoints(),
            CacheStore::new(&config.cache.dir, config.cache.expiry()),
            config,
        )
    }

    fn install(&self) {
        self.transport.clear_responses();
        let pages = self.page_count();
        for page in 1..=pages {
            let start = (page - 1) * self.per_page;
            let chunk = self.entries.iter().skip(start).take(self.per_page);
            let mut xml = String::from(
                r#"<?xml version="1.0" encoding="utf-8"?><feed xmlns="http://www.w3.org/2005/Atom" xmlns:app="http://www.w3.org/2007/app"><title>someone's blog</title>"#,
            );
            let _ = write!(xml, r#"<link rel="first" href="{}"/>"#, escape(FIXTURE_COLLECTION));
            if page < pages {
                let _ = write!(xml, r#"<link rel="next" href="{}"/>"#, escape(&self.page_uri(page + 1)));
            }
            for entry in chunk {
                xml.push_str(&entry.list_xml());
            }
            xml.push_str("</feed>");
            self.transport.insert(self.page_uri(page), xml);
        }
        for entry in &self.entries {
            self.transport.insert(
                format!("{FIXTURE_COLLECTION}/{}", entry.member_id),
                entry.member_xml(),
            );
        }
    }
}

/// Cache pointed at `dir` with the default expiry window.
#[must_use]
pub fn cache_in(dir: &Path) -> CacheStore {
    CacheStore::new(dir, TimeDelta::days(365))
}
