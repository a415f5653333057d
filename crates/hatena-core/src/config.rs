//! Configuration for the Hatena Blog sync subsystem.
//!
//! Configuration is assembled once at process start and treated as immutable
//! afterwards. Sources are applied in order, later ones winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file: `$HATENA_MCP_CONFIG`, or `config.toml` in the platform
//!    config directory (e.g. `~/.config/hatena-mcp/config.toml` on Linux)
//! 3. Environment variables: `HATENA_ID`, `HATENA_BLOG_ID`, `HATENA_API_KEY`
//!    and `HATENA_CACHE_DIR`
//!
//! Credentials only ever come from the environment and are never serialized.
//!
//! ## Example Configuration File
//!
//! ```toml
//! [endpoint]
//! base_url = "https://blog.hatena.ne.jp"
//!
//! [cache]
//! dir = "/home/user/.cache/hatena-mcp/entries"
//! expiry_days = 365
//! live_fallback = true
//!
//! [walk]
//! on_malformed = "skip"
//!
//! [http]
//! timeout_secs = 30
//! ```
//!
//! ## Loading with an explicit lookup
//!
//! ```rust
//! use hatena_core::Config;
//!
//! let env = |key: &str| match key {
//!     "HATENA_ID" => Some("someone".to_string()),
//!     "HATENA_BLOG_ID" => Some("someone.hatenablog.com".to_string()),
//!     "HATENA_API_KEY" => Some("secret".to_string()),
//!     _ => None,
//! };
//! let config = Config::from_sources(Some("[http]\ntimeout_secs = 10\n"), env)?;
//! assert_eq!(config.http.timeout_secs, 10);
//! assert!(config.credentials.validate().is_ok());
//! # Ok::<(), hatena_core::Error>(())
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Environment variable holding the Hatena user id.
pub const ENV_HATENA_ID: &str = "HATENA_ID";
/// Environment variable holding the blog domain (e.g. `someone.hatenablog.com`).
pub const ENV_BLOG_ID: &str = "HATENA_BLOG_ID";
/// Environment variable holding the AtomPub API key.
pub const ENV_API_KEY: &str = "HATENA_API_KEY";
/// Environment variable overriding the cache directory.
pub const ENV_CACHE_DIR: &str = "HATENA_CACHE_DIR";
/// Environment variable pointing at a TOML configuration file.
pub const ENV_CONFIG_PATH: &str = "HATENA_MCP_CONFIG";

const DEFAULT_BASE_URL: &str = "https://blog.hatena.ne.jp";
const DEFAULT_EXPIRY_DAYS: u32 = 365;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Identity and API key, read from the environment only.
    #[serde(skip)]
    pub credentials: Credentials,
    /// Remote AtomPub endpoint.
    pub endpoint: EndpointConfig,
    /// Local entry cache.
    pub cache: CacheConfig,
    /// Collection walking behavior.
    pub walk: WalkConfig,
    /// HTTP client settings.
    pub http: HttpConfig,
}

/// Remote endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Scheme and host of the AtomPub service. Overridden in tests.
    pub base_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding one JSON file per cached key.
    pub dir: PathBuf,
    /// Age after which a cached entry is discarded on read.
    pub expiry_days: u32,
    /// Fetch live (and cache) when `get_entry` misses the cache.
    ///
    /// When disabled, a miss is reported as not found and the caller is told
    /// to sync first.
    pub live_fallback: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            expiry_days: DEFAULT_EXPIRY_DAYS,
            live_fallback: true,
        }
    }
}

impl CacheConfig {
    /// Expiry window as a duration.
    #[must_use]
    pub fn expiry(&self) -> TimeDelta {
        TimeDelta::days(i64::from(self.expiry_days))
    }
}

/// Collection walking settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// What to do with an entry that lacks required fields.
    pub on_malformed: MalformedPolicy,
}

/// Handling of malformed entries inside a multi-entry page.
///
/// Applied uniformly by the walker, so list, search, category and sync
/// operations agree. Single-entry fetches always propagate the error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Log, count in [`crate::WalkPage::skipped`], and continue.
    #[default]
    Skip,
    /// Fail the whole page with [`Error::MalformedRecord`].
    Abort,
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Raw credential values as found in the environment. Any may be absent.
#[derive(Clone, Default)]
pub struct Credentials {
    /// Hatena user id.
    pub hatena_id: Option<String>,
    /// Blog domain.
    pub blog_id: Option<String>,
    /// AtomPub API key.
    pub api_key: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("hatena_id", &self.hatena_id)
            .field("blog_id", &self.blog_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    /// Read credentials through `lookup`, treating blank values as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            hatena_id: read(ENV_HATENA_ID),
            blog_id: read(ENV_BLOG_ID),
            api_key: read(ENV_API_KEY),
        }
    }

    /// Check that all three values are present.
    ///
    /// # Errors
    ///
    /// [`Error::ConfigurationMissing`] naming every absent variable.
    pub fn validate(&self) -> Result<ResolvedCredentials> {
        match (&self.hatena_id, &self.blog_id, &self.api_key) {
            (Some(hatena_id), Some(blog_id), Some(api_key)) => Ok(ResolvedCredentials {
                hatena_id: hatena_id.clone(),
                blog_id: blog_id.clone(),
                api_key: api_key.clone(),
            }),
            _ => {
                let missing = [
                    (ENV_HATENA_ID, self.hatena_id.is_none()),
                    (ENV_BLOG_ID, self.blog_id.is_none()),
                    (ENV_API_KEY, self.api_key.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(Error::ConfigurationMissing(missing))
            },
        }
    }
}

/// Credentials known to be complete.
#[derive(Clone)]
pub struct ResolvedCredentials {
    /// Hatena user id.
    pub hatena_id: String,
    /// Blog domain.
    pub blog_id: String,
    api_key: String,
}

impl fmt::Debug for ResolvedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedCredentials")
            .field("hatena_id", &self.hatena_id)
            .field("blog_id", &self.blog_id)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl ResolvedCredentials {
    /// Value for the `Authorization` header (HTTP Basic).
    #[must_use]
    pub fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.hatena_id, self.api_key);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

/// Resolved URIs of the entry collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    collection_uri: String,
}

impl Endpoints {
    /// Build the collection URI `{base}/{hatena_id}/{blog_id}/atom/entry`.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if `base_url` is not an absolute http(s) URL.
    pub fn new(base_url: &str, credentials: &ResolvedCredentials) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid endpoint base_url '{base_url}': {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Invalid endpoint base_url '{base_url}': scheme must be http or https"
            )));
        }
        let root = base.as_str().trim_end_matches('/');
        Ok(Self {
            collection_uri: format!(
                "{root}/{}/{}/atom/entry",
                credentials.hatena_id, credentials.blog_id
            ),
        })
    }

    /// Use an already-resolved collection URI verbatim.
    #[must_use]
    pub fn from_collection_uri(collection_uri: impl Into<String>) -> Self {
        Self {
            collection_uri: collection_uri.into(),
        }
    }

    /// First page of the collection.
    #[must_use]
    pub fn collection_uri(&self) -> &str {
        &self.collection_uri
    }

    /// Member URI for a short entry id.
    #[must_use]
    pub fn entry_uri(&self, entry_id: &str) -> String {
        format!("{}/{entry_id}", self.collection_uri)
    }
}

impl Config {
    /// Load from the default file location and the process environment.
    pub fn load() -> Result<Self> {
        Self::load_with(None, |key| std::env::var(key).ok())
    }

    /// Load using an explicit config path (if any) and a variable lookup.
    ///
    /// A path given explicitly, either as `path` or through
    /// `HATENA_MCP_CONFIG`, must exist. The default location is optional.
    pub fn load_with(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| lookup(ENV_CONFIG_PATH).map(PathBuf::from));

        let contents = match explicit {
            Some(path) => Some(fs::read_to_string(&path).map_err(|e| {
                Error::Config(format!("Failed to read config {}: {e}", path.display()))
            })?),
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Some(fs::read_to_string(&path).map_err(|e| {
                    Error::Config(format!("Failed to read config {}: {e}", path.display()))
                })?),
                _ => None,
            },
        };

        Self::from_sources(contents.as_deref(), lookup)
    }

    /// Build from optional TOML text plus a variable lookup.
    pub fn from_sources(
        toml_text: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config: Self = match toml_text {
            Some(text) => toml::from_str(text)
                .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?,
            None => Self::default(),
        };

        config.credentials = Credentials::from_lookup(&lookup);
        if let Some(dir) = lookup(ENV_CACHE_DIR).filter(|d| !d.trim().is_empty()) {
            config.cache.dir = PathBuf::from(dir.trim());
        }

        config.check()?;
        Ok(config)
    }

    /// Platform config file location, if a home directory is known.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "hatena-mcp")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn check(&self) -> Result<()> {
        if self.http.timeout_secs == 0 {
            return Err(Error::Config("http.timeout_secs must be at least 1".into()));
        }
        Url::parse(&self.endpoint.base_url).map_err(|e| {
            Error::Config(format!(
                "Invalid endpoint base_url '{}': {e}",
                self.endpoint.base_url
            ))
        })?;
        Ok(())
    }
}

fn default_cache_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "hatena-mcp").map_or_else(
        || std::env::temp_dir().join("hatena-mcp").join("entries"),
        |dirs| dirs.cache_dir().join("entries"),
    )
}
