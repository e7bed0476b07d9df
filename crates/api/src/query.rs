//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Generic pagination parameters (`?page=&limit=`).
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Clamp pagination parameters to `(page >= 1, 1 <= limit <= max)`.
pub fn clamp_page(params: &PageParams, default_limit: i64, max_limit: i64) -> (i64, i64) {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(default_limit).clamp(1, max_limit);
    (page, limit)
}
