//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches

pub mod book;
pub mod conversation;
pub mod post;
pub mod pre_project;
pub mod role;
pub mod user;

use serde::Serialize;

/// Search and paging inputs shared by list queries. Values are expected to
/// be clamped already (see `gradhub_core::search`).
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// `ILIKE` pattern (see `gradhub_core::search::like_pattern`).
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// One page of results plus the unpaged total.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub total: i64,
}
