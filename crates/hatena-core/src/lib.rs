//! # hatena-core
//!
//! Feed walking, entry normalization and local caching for a Hatena Blog
//! collection served over AtomPub.
//!
//! ## Architecture
//!
//! - **Normalizer**: Atom list pages and member documents into [`EntryRecord`]s
//! - **Walker**: page-by-page traversal following the `next` link relation
//! - **Cache**: one JSON file per key with lazy expiry and self-healing reads
//! - **Sync**: full walk plus per-entry detail fetch into the cache
//! - **Queries**: list, lookup, live and cached search, category aggregation
//!
//! [`BlogService`] ties these together and is what the tool server calls.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hatena_core::{BlogService, Config};
//!
//! # async fn run() -> hatena_core::Result<()> {
//! let config = Config::load()?;
//! let service = BlogService::from_config(&config)?;
//!
//! let report = service.sync_all().await?;
//! println!("cached {} entries ({} errors)", report.synced, report.errors);
//!
//! let hits = service.search_cached_entries("rust", 10, true).await?;
//! for hit in &hits.entries {
//!     println!("{:?}: {}", hit.matched_in, hit.entry.title);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns [`Result<T, Error>`]. Missing credentials are
//! reported as [`Error::ConfigurationMissing`] before any request is made.

/// Local JSON file cache
pub mod cache;
/// Configuration loading and credential resolution
pub mod config;
/// Error types and result aliases
pub mod error;
/// HTTP transport with Basic authentication
pub mod fetcher;
/// Atom document parsing
pub mod normalizer;
/// Read-side operations
pub mod query;
/// Service facade over walker and cache
pub mod service;
/// Full-collection synchronization
pub mod sync;
/// In-memory transport and feed fixtures
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
/// Core data types
pub mod types;
/// Paginated collection traversal
pub mod walker;

pub use cache::{CacheStore, storage_id};
pub use config::{Config, Credentials, Endpoints, MalformedPolicy, ResolvedCredentials};
pub use error::{Error, Result};
pub use fetcher::{HttpTransport, Transport};
pub use service::BlogService;
pub use sync::SyncEngine;
pub use types::*;
pub use walker::{Pages, Walker};
