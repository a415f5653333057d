//! File-per-key JSON cache with lazy expiry.
//!
//! ## Storage Layout
//!
//! ```text
//! <cache dir>/
//!   3f2a9c0d5b7e41f8a6c2d9e0b1f4a7c3.json   # {"cached_at": "...", "data": {...}}
//!   9b1e...json
//! ```
//!
//! File names are the first 16 bytes of SHA-256 over the logical key. Two
//! keys that collide on that prefix share a file; with keys bounded by the
//! number of entries in one blog that is accepted.
//!
//! ## Freshness and self-healing
//!
//! Age is checked only when an entry is read. Expired files and files that
//! cannot be decoded are deleted on the spot and reported as a miss, so
//! callers never see a stale or corrupt value and never see an error from
//! [`CacheStore::get`].
//!
//! ```rust
//! use hatena_core::CacheStore;
//! use chrono::TimeDelta;
//!
//! let temp = tempfile::TempDir::new()?;
//! let cache = CacheStore::new(temp.path().join("entries"), TimeDelta::days(1));
//!
//! cache.put("greeting", &"hello")?;
//! assert_eq!(cache.get::<String>("greeting").as_deref(), Some("hello"));
//! assert_eq!(cache.clear()?, 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt::Write as _;
use std::fs;
use std::io::{ErrorKind, Write as _};
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use crate::{Error, Result};

const STORAGE_ID_BYTES: usize = 16;
const EXTENSION: &str = "json";

/// On-disk wrapper around a cached payload.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    cached_at: DateTime<Utc>,
    data: T,
}

/// Persistent cache of JSON-compatible values keyed by string.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    expiry: TimeDelta,
}

/// Storage identifier for a logical key: 32 lowercase hex chars.
#[must_use]
pub fn storage_id(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    digest
        .iter()
        .take(STORAGE_ID_BYTES)
        .fold(String::with_capacity(STORAGE_ID_BYTES * 2), |mut acc, b| {
            // write! to String is infallible
            let _ = write!(acc, "{b:02x}");
            acc
        })
}

enum Read<T> {
    Fresh(T),
    Missing,
    Expired,
    Corrupt(Error),
}

impl CacheStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>, expiry: TimeDelta) -> Self {
        Self {
            dir: dir.into(),
            expiry,
        }
    }

    /// Root directory of the store.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Expiry window applied on read.
    #[must_use]
    pub const fn expiry(&self) -> TimeDelta {
        self.expiry
    }

    /// File that holds `key`.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{EXTENSION}", storage_id(key)))
    }

    /// Read a fresh value for `key`.
    ///
    /// Expired entries and entries that fail to decode as `T` are deleted and
    /// reported as `None`.
    #[instrument(skip(self))]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path_for(key);
        match self.read_envelope::<T>(&path, Utc::now()) {
            Read::Fresh(value) => {
                debug!("cache hit");
                Some(value)
            },
            Read::Missing => {
                debug!("cache miss");
                None
            },
            Read::Expired => {
                debug!("cache entry expired");
                self.discard(&path);
                None
            },
            Read::Corrupt(err) => {
                warn!(error = %err, path = %path.display(), "discarding corrupt cache entry");
                self.discard(&path);
                None
            },
        }
    }

    /// Store `payload` under `key`, replacing any previous value.
    ///
    /// The value is written to a temporary file in the cache directory and
    /// renamed into place, so readers see either the old or the new file.
    #[instrument(skip(self, payload))]
    pub fn put<T: Serialize + ?Sized>(&self, key: &str, payload: &T) -> Result<()> {
        self.put_at(key, payload, Utc::now())
    }

    pub(crate) fn put_at<T: Serialize + ?Sized>(
        &self,
        key: &str,
        payload: &T,
        cached_at: DateTime<Utc>,
    ) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| Error::Storage(format!("Failed to create cache directory: {e}")))?;

        let envelope = Envelope {
            cached_at,
            data: payload,
        };
        let json = serde_json::to_vec(&envelope)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| Error::Storage(format!("Failed to create temp cache file: {e}")))?;
        tmp.write_all(&json)
            .map_err(|e| Error::Storage(format!("Failed to write temp cache file: {e}")))?;

        let path = self.path_for(key);
        tmp.persist(&path)
            .map_err(|e| Error::Storage(format!("Failed to commit cache file: {}", e.error)))?;

        debug!(path = %path.display(), "cached");
        Ok(())
    }

    /// Delete every stored entry, returning how many were removed.
    ///
    /// A missing directory is not an error; it simply yields zero.
    #[instrument(skip(self))]
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for path in self.entry_paths()? {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {},
                Err(e) => {
                    return Err(Error::Storage(format!(
                        "Failed to remove {}: {e}",
                        path.display()
                    )));
                },
            }
        }
        debug!(removed, "cache cleared");
        Ok(removed)
    }

    /// Visit every stored entry once and return the fresh values of type `T`.
    ///
    /// Expired and undecodable files are removed exactly as in [`Self::get`].
    /// Entries holding some other JSON shape are left in place and skipped.
    /// Results follow directory enumeration order, which is unspecified;
    /// callers that need a stable order must sort.
    #[instrument(skip(self))]
    pub fn scan<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let now = Utc::now();
        let mut values = Vec::new();
        for path in self.entry_paths()? {
            match self.read_envelope::<serde_json::Value>(&path, now) {
                Read::Fresh(data) => match serde_json::from_value::<T>(data) {
                    Ok(value) => values.push(value),
                    Err(e) => debug!(path = %path.display(), error = %e, "skipping foreign cache entry"),
                },
                Read::Missing => {},
                Read::Expired => self.discard(&path),
                Read::Corrupt(err) => {
                    warn!(error = %err, path = %path.display(), "discarding corrupt cache entry");
                    self.discard(&path);
                },
            }
        }
        Ok(values)
    }

    fn read_envelope<T: DeserializeOwned>(&self, path: &Path, now: DateTime<Utc>) -> Read<T> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Read::Missing,
            Err(e) => return Read::Corrupt(Error::CacheCorrupt(format!("unreadable: {e}"))),
        };
        match serde_json::from_slice::<Envelope<T>>(&bytes) {
            Ok(envelope) if now - envelope.cached_at <= self.expiry => Read::Fresh(envelope.data),
            Ok(_) => Read::Expired,
            Err(e) => Read::Corrupt(Error::CacheCorrupt(e.to_string())),
        }
    }

    fn entry_paths(&self) -> Result<Vec<PathBuf>> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::Storage(format!(
                    "Failed to read cache directory {}: {e}",
                    self.dir.display()
                )));
            },
        };

        let mut paths = Vec::new();
        for entry in read_dir {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == EXTENSION) {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    fn discard(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != ErrorKind::NotFound {
                warn!(error = %e, path = %path.display(), "failed to delete cache entry");
            }
        }
    }
}
