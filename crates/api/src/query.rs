//! Shared query parameter types for API handlers.

use gradhub_core::search::{clamp_limit, clamp_offset, like_pattern, DEFAULT_LIMIT, MAX_LIMIT};
use gradhub_db::models::ListQuery;
use serde::Deserialize;

/// Generic pagination parameters (`?limit=&offset=`).
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationParams {
    pub fn limit(&self) -> i64 {
        clamp_limit(self.limit, DEFAULT_LIMIT, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        clamp_offset(self.offset)
    }
}

/// `?search=&limit=&offset=` for searchable lists.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl SearchParams {
    /// Clamp paging and turn the search term into an `ILIKE` pattern.
    pub fn to_list_query(&self) -> ListQuery {
        ListQuery {
            search: like_pattern(self.search.as_deref()),
            limit: clamp_limit(self.limit, DEFAULT_LIMIT, MAX_LIMIT),
            offset: clamp_offset(self.offset),
        }
    }
}
