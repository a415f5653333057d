//! Category aggregation tools

use hatena_core::{BlogService, CategoryEntries, CategorySummary, Error, Transport};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::McpResult;

/// Category summary tool name.
pub const GET_CATEGORIES: &str = "get_categories";
/// Category filter tool name.
pub const GET_ENTRIES_BY_CATEGORY: &str = "get_entries_by_category";

/// Parameters for tools that take no arguments
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct NoParams {}

/// Parameters for get_entries_by_category
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CategoryParams {
    /// Category name, matched exactly (case-sensitive)
    pub category: String,

    /// Maximum number of entries to return
    #[serde(default = "super::default_max_results")]
    pub max_results: usize,
}

/// Count entries per category.
pub async fn handle_get_categories<T: Transport>(
    service: &BlogService<T>,
) -> McpResult<CategorySummary> {
    Ok(service.categories().await?)
}

/// Entries filed under an exact category label.
pub async fn handle_entries_by_category<T: Transport>(
    service: &BlogService<T>,
    params: CategoryParams,
) -> McpResult<CategoryEntries> {
    if params.category.is_empty() {
        return Err(Error::InvalidInput("category cannot be empty".to_string()).into());
    }
    Ok(service
        .entries_by_category(&params.category, params.max_results)
        .await?)
}
