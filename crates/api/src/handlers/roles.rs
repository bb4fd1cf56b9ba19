//! Handlers for role membership and role-based user lists.

use axum::extract::{Path, State};
use axum::Json;
use gradhub_core::error::CoreError;
use gradhub_core::roles::{is_known_role, ROLE_TEACHER};
use gradhub_core::types::DbId;
use gradhub_db::models::user::UserSummary;
use gradhub_db::repositories::{UserRepo, UserRoleRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /roles/grant` and `POST /roles/revoke`.
#[derive(Debug, Deserialize)]
pub struct RoleChangeRequest {
    pub user_id: DbId,
    pub role: String,
}

/// Result of a grant or revoke.
#[derive(Debug, Serialize)]
pub struct RoleChangeResponse {
    pub user_id: DbId,
    /// `false` when the membership was already in the requested state.
    pub changed: bool,
    pub roles: Vec<String>,
}

/// POST /api/v1/roles/grant
///
/// Grant a role to a user. Granting a held role is a no-op.
pub async fn grant(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<RoleChangeRequest>,
) -> AppResult<Json<DataResponse<RoleChangeResponse>>> {
    check_role_change(&state, &input).await?;
    let changed = UserRoleRepo::grant(&state.pool, input.user_id, &input.role).await?;
    tracing::info!(
        user_id = input.user_id,
        role = %input.role,
        admin_id = admin.user_id,
        changed,
        "Role granted"
    );
    role_change_response(&state, input.user_id, changed).await
}

/// POST /api/v1/roles/revoke
///
/// Revoke a role from a user. Revoking a missing role is a no-op.
pub async fn revoke(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<RoleChangeRequest>,
) -> AppResult<Json<DataResponse<RoleChangeResponse>>> {
    check_role_change(&state, &input).await?;
    let changed = UserRoleRepo::revoke(&state.pool, input.user_id, &input.role).await?;
    tracing::info!(
        user_id = input.user_id,
        role = %input.role,
        admin_id = admin.user_id,
        changed,
        "Role revoked"
    );
    role_change_response(&state, input.user_id, changed).await
}

/// GET /api/v1/teachers
///
/// Active teachers, for advisor pickers.
pub async fn teachers(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<UserSummary>>>> {
    let data = UserRepo::list_by_role(&state.pool, ROLE_TEACHER).await?;
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/roles/{name}/users
pub async fn users_by_role(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<DataResponse<Vec<UserSummary>>>> {
    if !is_known_role(&name) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Unknown role '{name}'"
        ))));
    }
    let data = UserRepo::list_by_role(&state.pool, &name).await?;
    Ok(Json(DataResponse { data }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn check_role_change(state: &AppState, input: &RoleChangeRequest) -> AppResult<()> {
    if !is_known_role(&input.role) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Unknown role '{}'",
            input.role
        ))));
    }
    let id = input.user_id;
    UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;
    Ok(())
}

async fn role_change_response(
    state: &AppState,
    user_id: DbId,
    changed: bool,
) -> AppResult<Json<DataResponse<RoleChangeResponse>>> {
    let roles = UserRoleRepo::roles_for_user(&state.pool, user_id).await?;
    Ok(Json(DataResponse {
        data: RoleChangeResponse {
            user_id,
            changed,
            roles,
        },
    }))
}
