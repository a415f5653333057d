//! Single entry point bundling the walker, the cache and their settings.
//!
//! Query operations live in [`crate::query`] as further `impl` blocks on
//! [`BlogService`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument};

use crate::config::{Config, Endpoints};
use crate::fetcher::{HttpTransport, Transport};
use crate::sync::SyncEngine;
use crate::walker::Walker;
use crate::{CacheStore, Result, SyncReport};

/// Operations over one blog's collection and its local cache.
pub struct BlogService<T> {
    pub(crate) walker: Walker<T>,
    pub(crate) cache: CacheStore,
    pub(crate) live_fallback: bool,
}

impl BlogService<HttpTransport> {
    /// Build the production service.
    ///
    /// Credentials are checked before anything else, so a missing variable
    /// surfaces as [`crate::Error::ConfigurationMissing`] and no client is
    /// ever created.
    pub fn from_config(config: &Config) -> Result<Self> {
        let credentials = config.credentials.validate()?;
        let endpoints = Endpoints::new(&config.endpoint.base_url, &credentials)?;
        let transport = HttpTransport::new(
            &credentials,
            Duration::from_secs(config.http.timeout_secs),
        )?;
        let cache = CacheStore::new(&config.cache.dir, config.cache.expiry());
        debug!(
            collection = endpoints.collection_uri(),
            cache_dir = %cache.dir().display(),
            "blog service ready"
        );
        Ok(Self::new(Arc::new(transport), endpoints, cache, config))
    }
}

impl<T: Transport> BlogService<T> {
    /// Assemble a service over any transport, taking walk and cache
    /// behavior from `config`.
    pub fn new(transport: Arc<T>, endpoints: Endpoints, cache: CacheStore, config: &Config) -> Self {
        Self {
            walker: Walker::new(transport, endpoints, config.walk.on_malformed),
            cache,
            live_fallback: config.cache.live_fallback,
        }
    }

    /// Walker over the remote collection.
    pub const fn walker(&self) -> &Walker<T> {
        &self.walker
    }

    /// Local entry cache.
    pub const fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Fetch every entry's full record and store it in the cache.
    pub async fn sync_all(&self) -> Result<SyncReport> {
        SyncEngine::new(&self.walker, &self.cache)
            .sync_all()
            .await
    }

    /// Remove all cached entries, returning how many were deleted.
    #[instrument(skip(self))]
    pub fn clear_cache(&self) -> Result<usize> {
        self.cache.clear()
    }
}
