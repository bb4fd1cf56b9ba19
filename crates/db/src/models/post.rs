//! Post entity model and DTOs.

use gradhub_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `posts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Post {
    pub id: DbId,
    pub description: Option<String>,
    pub file: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a post.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePost {
    pub description: Option<String>,
    pub file: Option<String>,
}

/// DTO for updating a post. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePost {
    pub description: Option<String>,
    pub file: Option<String>,
}
