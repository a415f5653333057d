//! Cache maintenance tools

use hatena_core::{BlogService, Transport};
use serde::Serialize;

use crate::error::McpResult;

/// Full sync tool name.
pub const SYNC_ALL: &str = "sync_all_entries_to_cache";
/// Cache removal tool name.
pub const CLEAR_CACHE: &str = "clear_cache";

/// Output from sync_all_entries_to_cache
#[derive(Debug, Serialize)]
pub struct SyncOutput {
    /// Entries fetched and cached
    pub synced: usize,
    /// Entries that could not be synced
    pub errors: usize,
    /// List pages walked
    pub pages: usize,
    /// Human-readable summary
    pub message: String,
}

/// Output from clear_cache
#[derive(Debug, Serialize)]
pub struct ClearCacheOutput {
    /// Cache files deleted
    pub removed: usize,
    /// Human-readable summary
    pub message: String,
}

/// Sync every entry into the cache.
pub async fn handle_sync_all<T: Transport>(service: &BlogService<T>) -> McpResult<SyncOutput> {
    let report = service.sync_all().await?;
    let message = if report.errors == 0 {
        format!("Synced {} entries to cache", report.synced)
    } else {
        format!(
            "Synced {} entries to cache; {} could not be synced",
            report.synced, report.errors
        )
    };
    Ok(SyncOutput {
        synced: report.synced,
        errors: report.errors,
        pages: report.pages,
        message,
    })
}

/// Delete every cached entry.
pub fn handle_clear_cache<T: Transport>(service: &BlogService<T>) -> McpResult<ClearCacheOutput> {
    let removed = service.clear_cache()?;
    let message = if removed == 0 {
        "No cache to clear".to_string()
    } else {
        format!("Cleared {removed} cached entries")
    };
    Ok(ClearCacheOutput { removed, message })
}
