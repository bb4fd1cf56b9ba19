//! Handlers for the `/pre-projects` resource.
//!
//! All endpoints require authentication. Mutations delegate to
//! [`PreProjectLifecycle`](gradhub_db::lifecycle::PreProjectLifecycle),
//! which owns locking, arbitration and participant rules. Create and update
//! take `multipart/form-data`; participant fields are comma-separated user
//! ids or emails.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use gradhub_core::error::CoreError;
use gradhub_core::roles::{ROLE_ADMIN, ROLE_GRADUATION_STUDENT};
use gradhub_core::search::PageMeta;
use gradhub_core::storage::CATEGORY_PRE_PROJECTS;
use gradhub_core::types::DbId;
use gradhub_core::validation::FieldErrors;
use gradhub_db::lifecycle::Caller;
use gradhub_db::models::book::BookDetails;
use gradhub_db::models::pre_project::{
    AdvisorResponse, CreatePreProject, PreProject, PreProjectDetails, UpdatePreProject,
};
use gradhub_db::repositories::PreProjectRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::form::{resolve_optional_users, store_upload, FormData};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::SearchParams;
use crate::response::{DataResponse, PagedResponse};
use crate::similarity;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /pre-projects/{id}/responses`.
#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    /// `pending`, `accepted` or `rejected`.
    pub status: String,
}

/// Request body for `PUT /pre-projects/{id}/can-update`.
#[derive(Debug, Deserialize)]
pub struct CanUpdateRequest {
    pub can_update: bool,
}

/// Request body for `POST /pre-projects/{id}/migrate`.
#[derive(Debug, Deserialize)]
pub struct MigrateRequest {
    pub degree: i32,
    #[serde(default)]
    pub discussant_ids: Vec<DbId>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// GET /api/v1/pre-projects
///
/// Supports `?search=` on name and description.
pub async fn list_pre_projects(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<PagedResponse<PreProjectDetails>>> {
    let query = params.to_list_query();
    let page = state.lifecycle.list(&query).await?;
    Ok(Json(PagedResponse {
        data: page.items,
        meta: PageMeta {
            total: page.total,
            limit: query.limit,
            offset: query.offset,
        },
    }))
}

/// GET /api/v1/pre-projects/associated
///
/// Pre-projects the caller owns, advises, studies in or discusses.
pub async fn associated_pre_projects(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<PreProjectDetails>>>> {
    let data = state.lifecycle.list_associated(user.user_id).await?;
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/pre-projects/{id}
pub async fn get_pre_project(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<PreProjectDetails>>> {
    let data = state.lifecycle.get_details(id).await?;
    Ok(Json(DataResponse { data }))
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// POST /api/v1/pre-projects
///
/// Submit a proposal. Open to graduation students and admins. A student
/// owner is enrolled automatically.
pub async fn create_pre_project(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<PreProjectDetails>>)> {
    if !user.has_role(ROLE_ADMIN) && !user.has_role(ROLE_GRADUATION_STUDENT) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only graduation students can submit a pre-project".into(),
        )));
    }

    let form = FormData::from_multipart(multipart).await?;

    let mut errors = FieldErrors::new();
    let year = form.required_int("year", &mut errors);
    errors.into_result()?;

    let student_ids = resolve_optional_users(&state.pool, &form, "students")
        .await?
        .unwrap_or_default();
    let advisor_ids = resolve_optional_users(&state.pool, &form, "advisors")
        .await?
        .unwrap_or_default();

    let mut input = CreatePreProject {
        name: form.text_or_empty("name"),
        description: form.text_or_empty("description"),
        file: None,
        file_description: form.text("file_description").map(str::to_string),
        year,
        season: form.text_or_empty("season").to_lowercase(),
    };

    similarity::enforce(
        state.similarity.as_ref(),
        &user,
        form.flag("confirm"),
        &input.name,
        &input.description,
        None,
    )
    .await?;

    input.file =
        store_upload(state.storage.as_ref(), CATEGORY_PRE_PROJECTS, form.file.as_ref()).await?;

    let details = state
        .lifecycle
        .create(user.user_id, user.is_admin(), &input, &student_ids, &advisor_ids)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: details })))
}

/// PUT /api/v1/pre-projects/{id}
///
/// Partial update by the project owner or an admin. Omitting `discussants`
/// clears the discussant list. The similarity gate runs only when the name
/// or description is supplied.
pub async fn update_pre_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<Json<DataResponse<PreProjectDetails>>> {
    let form = FormData::from_multipart(multipart).await?;

    let mut errors = FieldErrors::new();
    let year = form.int("year", &mut errors);
    let degree = form.int("degree", &mut errors);
    errors.into_result()?;

    let mut input = UpdatePreProject {
        name: form.text("name").map(str::to_string),
        description: form.text("description").map(str::to_string),
        file: None,
        file_description: form.text("file_description").map(str::to_string),
        year,
        season: form.text("season").map(str::to_lowercase),
        degree,
        student_ids: resolve_optional_users(&state.pool, &form, "students").await?,
        advisor_ids: resolve_optional_users(&state.pool, &form, "advisors").await?,
        discussant_ids: resolve_optional_users(&state.pool, &form, "discussants").await?,
    };

    if input.name.is_some() || input.description.is_some() {
        let current = find_pre_project(&state, id).await?;
        similarity::enforce(
            state.similarity.as_ref(),
            &user,
            form.flag("confirm"),
            input.name.as_deref().unwrap_or(&current.name),
            input.description.as_deref().unwrap_or(&current.description),
            Some(id),
        )
        .await?;
    }

    input.file =
        store_upload(state.storage.as_ref(), CATEGORY_PRE_PROJECTS, form.file.as_ref()).await?;

    let caller = Caller {
        user_id: user.user_id,
        is_admin: user.is_admin(),
    };
    let details = state.lifecycle.update(id, caller, &input).await?;
    Ok(Json(DataResponse { data: details }))
}

/// DELETE /api/v1/pre-projects/{id}
///
/// Owner or admin only. Returns 204 No Content.
pub async fn delete_pre_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    state
        .lifecycle
        .delete(id, user.user_id, user.is_admin())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/pre-projects/{id}/responses
///
/// The caller responds as an invited advisor. Accepting locks the project
/// to the caller unless another advisor got there first.
pub async fn respond(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<RespondRequest>,
) -> AppResult<Json<DataResponse<AdvisorResponse>>> {
    let data = state
        .lifecycle
        .respond(id, user.user_id, input.status.trim())
        .await?;
    Ok(Json(DataResponse { data }))
}

/// DELETE /api/v1/pre-projects/{id}/advisors
///
/// Clear every advisor response and the acceptance. Returns 204.
pub async fn reset_advisors(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.lifecycle.reset_advisors(id).await?;
    tracing::info!(pre_project_id = id, admin_id = admin.user_id, "Advisor responses reset");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/pre-projects/{id}/can-update
pub async fn set_can_update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<CanUpdateRequest>,
) -> AppResult<Json<DataResponse<PreProject>>> {
    let data = state.lifecycle.set_can_update(id, input.can_update).await?;
    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/pre-projects/{id}/migrate
///
/// Turn an accepted pre-project into a book. Returns 201 with the book.
pub async fn migrate(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<MigrateRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<BookDetails>>)> {
    let book = state
        .lifecycle
        .migrate_to_book(id, input.degree, &input.discussant_ids)
        .await?;
    tracing::info!(
        pre_project_id = id,
        book_id = book.book.id,
        admin_id = admin.user_id,
        "Pre-project migrated"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: book })))
}

async fn find_pre_project(state: &AppState, id: DbId) -> AppResult<PreProject> {
    PreProjectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "PreProject",
            id,
        }))
}
