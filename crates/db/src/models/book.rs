//! Book (finalized project record) model and DTOs.

use gradhub_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::user::UserSummary;

/// A row from the `books` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Book {
    pub id: DbId,
    pub name: String,
    pub description: String,
    pub file: Option<String>,
    pub year: i32,
    pub season: String,
    pub degree: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A book with its participants resolved.
#[derive(Debug, Clone, Serialize)]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,
    pub students: Vec<UserSummary>,
    pub advisors: Vec<UserSummary>,
    pub discussants: Vec<UserSummary>,
}

/// DTO for creating a book.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBook {
    pub name: String,
    pub description: String,
    pub file: Option<String>,
    pub year: i32,
    pub season: String,
    pub degree: Option<i32>,
    pub student_ids: Vec<DbId>,
    pub advisor_ids: Vec<DbId>,
    pub discussant_ids: Vec<DbId>,
}

/// DTO for updating a book. `Some` lists replace the association set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBook {
    pub name: Option<String>,
    pub description: Option<String>,
    pub file: Option<String>,
    pub year: Option<i32>,
    pub season: Option<String>,
    pub degree: Option<i32>,
    pub student_ids: Option<Vec<DbId>>,
    pub advisor_ids: Option<Vec<DbId>>,
    pub discussant_ids: Option<Vec<DbId>>,
}
