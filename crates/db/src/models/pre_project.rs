//! Pre-project entity model, advisor responses, and DTOs.

use gradhub_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::user::UserSummary;

/// A row from the `pre_projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PreProject {
    pub id: DbId,
    pub name: String,
    pub description: String,
    pub file: Option<String>,
    pub file_description: Option<String>,
    pub project_owner: DbId,
    pub year: i32,
    pub season: String,
    /// Set by an admin; required before migration.
    pub degree: Option<i32>,
    pub can_update: bool,
    /// The single advisor whose acceptance won arbitration, if any.
    pub accepted_advisor: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `advisor_responses` ledger.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AdvisorResponse {
    pub pre_project_id: DbId,
    pub advisor_id: DbId,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Invited advisor joined with their current response status.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AdvisorWithStatus {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub status: String,
}

/// A pre-project with its owner, advisors, students, and discussants.
#[derive(Debug, Clone, Serialize)]
pub struct PreProjectDetails {
    #[serde(flatten)]
    pub pre_project: PreProject,
    pub owner: Option<UserSummary>,
    pub accepted_advisor_info: Option<UserSummary>,
    pub advisors: Vec<AdvisorWithStatus>,
    pub students: Vec<UserSummary>,
    pub discussants: Vec<UserSummary>,
}

/// DTO for creating a pre-project. Participants are passed separately.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePreProject {
    pub name: String,
    pub description: String,
    pub file: Option<String>,
    pub file_description: Option<String>,
    pub year: i32,
    pub season: String,
}

/// DTO for updating a pre-project. All fields are optional.
///
/// `None` lists leave participants unchanged, except `discussant_ids`:
/// an absent discussant list clears the discussants.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePreProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub file: Option<String>,
    pub file_description: Option<String>,
    pub year: Option<i32>,
    pub season: Option<String>,
    pub degree: Option<i32>,
    pub student_ids: Option<Vec<DbId>>,
    pub advisor_ids: Option<Vec<DbId>>,
    pub discussant_ids: Option<Vec<DbId>>,
}
