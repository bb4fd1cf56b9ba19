//! Handlers for the `/users` resource and the public `/statistics` summary.
//!
//! Management handlers require the `admin` role via [`RequireAdmin`]. A
//! profile update is also open to the user themselves.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use gradhub_core::error::CoreError;
use gradhub_core::roles::{ROLE_GRADUATED, ROLE_GRADUATION_STUDENT, ROLE_STUDENT};
use gradhub_core::search::PageMeta;
use gradhub_core::storage::CATEGORY_USERS;
use gradhub_core::types::DbId;
use gradhub_core::validation::FieldErrors;
use gradhub_db::models::user::{UpdateUser, UserResponse};
use gradhub_db::models::ListQuery;
use gradhub_db::repositories::{BookRepo, UserRepo, UserRoleRepo};
use serde::Serialize;
use validator::Validate;

use crate::auth::password::{hash_password, validate_password_strength, MIN_PASSWORD_LENGTH};
use crate::error::{AppError, AppResult};
use crate::form::{discard_upload, store_upload, FormData};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::SearchParams;
use crate::response::{DataResponse, PagedResponse};
use crate::state::AppState;

/// GET /api/v1/users
///
/// List users with their roles. Supports `?search=` on name and email.
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<PagedResponse<UserResponse>>> {
    let query = params.to_list_query();
    let users = UserRepo::list(&state.pool, &query).await?;
    let total = UserRepo::count(&state.pool, &query).await?;

    let mut data = Vec::with_capacity(users.len());
    for user in users {
        let roles = UserRoleRepo::roles_for_user(&state.pool, user.id).await?;
        data.push(UserResponse::from_user(user, roles));
    }

    Ok(Json(PagedResponse {
        data,
        meta: PageMeta {
            total,
            limit: query.limit,
            offset: query.offset,
        },
    }))
}

/// GET /api/v1/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;
    let roles = UserRoleRepo::roles_for_user(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: UserResponse::from_user(user, roles),
    }))
}

/// DELETE /api/v1/users/{id}
///
/// Soft-deactivate a user (sets `is_active = false`). Returns 204 No Content.
pub async fn deactivate_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if id == admin.user_id {
        return Err(AppError::BadRequest("You cannot deactivate yourself".into()));
    }
    let deactivated = UserRepo::deactivate(&state.pool, id).await?;
    if deactivated {
        tracing::info!(user_id = id, admin_id = admin.user_id, "User deactivated");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound { entity: "User", id }))
    }
}

/// GET /api/v1/users/{id}/roles
pub async fn user_roles(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<String>>>> {
    UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;
    let roles = UserRoleRepo::roles_for_user(&state.pool, id).await?;
    Ok(Json(DataResponse { data: roles }))
}

/// Multipart field carrying a new profile picture.
const IMAGE_FIELD: &str = "image";

/// Text fields of a profile update that go through `validator`.
#[derive(Debug, Validate)]
struct ProfileFields {
    #[validate(length(min = 3, max = 100, message = "Name must be between 3 and 100 characters"))]
    name: Option<String>,
    #[validate(email(message = "Email must be a valid email address"))]
    email: Option<String>,
}

/// PUT /api/v1/users/{id}
///
/// Multipart profile update by an admin or the user themselves. Fields:
/// `name`, `email`, `password` (each optional) and an `image` file. A new
/// image replaces the stored one.
pub async fn update_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    if caller.user_id != id && !caller.is_admin() {
        return Err(AppError::Core(CoreError::Forbidden(
            "You can only update your own profile".into(),
        )));
    }
    let form = FormData::with_file_field(multipart, IMAGE_FIELD).await?;
    let current = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;

    let fields = ProfileFields {
        name: form.text("name").map(|n| n.trim().to_string()),
        email: form.text("email").map(|e| e.trim().to_lowercase()),
    };
    let password = form.text("password");

    let mut errors = match fields.validate() {
        Ok(()) => FieldErrors::new(),
        Err(e) => FieldErrors::from(e),
    };
    if let Some(password) = password {
        if let Err(msg) = validate_password_strength(password, MIN_PASSWORD_LENGTH) {
            errors.add("password", msg);
        }
    }
    errors.into_result()?;

    if let Some(email) = &fields.email {
        if let Some(other) = UserRepo::find_by_email(&state.pool, email).await? {
            if other.id != id {
                return Err(AppError::Core(CoreError::Conflict(
                    "An account with this email already exists".into(),
                )));
            }
        }
    }

    let password_hash = match password {
        Some(p) => Some(
            hash_password(p)
                .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?,
        ),
        None => None,
    };

    let input = UpdateUser {
        name: fields.name,
        email: fields.email,
        password_hash,
        image: store_upload(state.storage.as_ref(), CATEGORY_USERS, form.file.as_ref()).await?,
    };

    let updated = match UserRepo::update_profile(&state.pool, id, &input).await {
        Ok(Some(user)) => user,
        other => {
            if let Some(path) = &input.image {
                discard_upload(state.storage.as_ref(), path).await;
            }
            return match other {
                Err(e) => Err(e.into()),
                _ => Err(AppError::Core(CoreError::NotFound { entity: "User", id })),
            };
        }
    };

    if let (Some(_), Some(old)) = (&input.image, &current.image) {
        discard_upload(state.storage.as_ref(), old).await;
    }
    tracing::info!(user_id = id, caller_id = caller.user_id, "User profile updated");

    let roles = UserRoleRepo::roles_for_user(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: UserResponse::from_user(updated, roles),
    }))
}

/// Headline counts shown on the landing page.
#[derive(Debug, Serialize)]
pub struct Statistics {
    pub students_count: i64,
    pub graduation_students_count: i64,
    pub graduated_count: i64,
    pub books_count: i64,
}

/// GET /api/v1/statistics
///
/// Public. Active users per student role plus the number of books.
pub async fn statistics(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Statistics>>> {
    let all_books = ListQuery {
        search: None,
        limit: 0,
        offset: 0,
    };
    let data = Statistics {
        students_count: UserRoleRepo::count_active_with_role(&state.pool, ROLE_STUDENT).await?,
        graduation_students_count: UserRoleRepo::count_active_with_role(
            &state.pool,
            ROLE_GRADUATION_STUDENT,
        )
        .await?,
        graduated_count: UserRoleRepo::count_active_with_role(&state.pool, ROLE_GRADUATED).await?,
        books_count: BookRepo::count(&state.pool, &all_books).await?,
    };
    Ok(Json(DataResponse { data }))
}
