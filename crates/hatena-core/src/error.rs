//! Error types and handling for hatena-core operations.
//!
//! Every fallible operation in this crate returns [`Result<T>`]. The variants
//! follow the failure boundaries of the sync subsystem:
//!
//! - **Configuration**: required credentials absent, invalid settings
//! - **Transport**: non-success HTTP status, connection failures
//! - **Records**: XML that parses but lacks required entry fields
//! - **Cache**: storage I/O and (internally) corrupt cache files
//! - **Lookup**: ids that are not cached or not well formed
//!
//! Nothing here is retried. Callers receive each failure exactly once and
//! decide how to present it.
//!
//! ```rust
//! use hatena_core::Error;
//!
//! let err = Error::Transport { status: 404, url: "https://example.com".into() };
//! assert_eq!(err.category(), "transport");
//! assert_eq!(err.status(), Some(404));
//! ```

use thiserror::Error;

/// The main error type for hatena-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// One or more required credentials are not configured.
    ///
    /// Checked before any network access. The payload lists the environment
    /// variables that were missing or empty.
    #[error(
        "missing required configuration: set the {} environment variable(s)",
        .0.join(", ")
    )]
    ConfigurationMissing(Vec<&'static str>),

    /// Configuration is present but invalid or unreadable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The remote endpoint answered with a non-success status.
    #[error("Failed to fetch {url}: HTTP {status}")]
    Transport {
        /// Numeric HTTP status code.
        status: u16,
        /// URL that was requested.
        url: String,
    },

    /// The HTTP request itself failed (DNS, TLS, timeout, connection reset).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A feed entry is missing a required field.
    ///
    /// Raised by the normalizer for entries without `<id>` or `<title>`.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// A response body is not well-formed XML.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A stored cache file could not be decoded.
    ///
    /// The cache store deletes such files and reports a miss, so this variant
    /// does not escape [`crate::CacheStore::get`].
    #[error("Corrupt cache entry: {0}")]
    CacheCorrupt(String),

    /// Requested entry is not available.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller supplied an unusable argument.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Parse(err.to_string())
    }
}

impl Error {
    /// Get the error category as a string identifier.
    ///
    /// Stable labels for log fields:
    ///
    /// - `"config_missing"`, `"config"`
    /// - `"transport"`, `"network"`
    /// - `"malformed_record"`, `"parse"`
    /// - `"cache_corrupt"`, `"storage"`, `"io"`, `"serialization"`
    /// - `"not_found"`, `"invalid_input"`
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::ConfigurationMissing(_) => "config_missing",
            Self::Config(_) => "config",
            Self::Transport { .. } => "transport",
            Self::Network(_) => "network",
            Self::MalformedRecord(_) => "malformed_record",
            Self::Parse(_) => "parse",
            Self::CacheCorrupt(_) => "cache_corrupt",
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Io(_) => "io",
            Self::Storage(_) => "storage",
            Self::Serialization(_) => "serialization",
        }
    }

    /// HTTP status carried by the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Convenience type alias for results with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
