//! Handlers for the `/posts` resource (announcements).
//!
//! Reads are public; mutations require `teacher` or `admin`.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use gradhub_core::error::CoreError;
use gradhub_core::post::validate_post;
use gradhub_core::search::PageMeta;
use gradhub_core::storage::CATEGORY_POSTS;
use gradhub_core::types::DbId;
use gradhub_db::models::post::{CreatePost, Post, UpdatePost};
use gradhub_db::repositories::PostRepo;

use crate::error::{AppError, AppResult};
use crate::form::{discard_upload, store_upload, FormData};
use crate::middleware::rbac::RequireTeacher;
use crate::query::PaginationParams;
use crate::response::{DataResponse, PagedResponse};
use crate::state::AppState;

/// GET /api/v1/posts
pub async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<PagedResponse<Post>>> {
    let (limit, offset) = (params.limit(), params.offset());
    let data = PostRepo::list(&state.pool, limit, offset).await?;
    let total = PostRepo::count(&state.pool).await?;
    Ok(Json(PagedResponse {
        data,
        meta: PageMeta {
            total,
            limit,
            offset,
        },
    }))
}

/// GET /api/v1/posts/{id}
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Post>>> {
    let post = PostRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Post", id }))?;
    Ok(Json(DataResponse { data: post }))
}

/// POST /api/v1/posts
///
/// Multipart `description` and/or `file`; at least one is required.
pub async fn create_post(
    State(state): State<AppState>,
    RequireTeacher(user): RequireTeacher,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<Post>>)> {
    let form = FormData::from_multipart(multipart).await?;
    let description = form.text("description").map(str::to_string);
    validate_post(description.as_deref(), form.file.is_some())?;

    let input = CreatePost {
        description,
        file: store_upload(state.storage.as_ref(), CATEGORY_POSTS, form.file.as_ref()).await?,
    };

    let post = match PostRepo::create(&state.pool, &input).await {
        Ok(post) => post,
        Err(e) => {
            if let Some(path) = &input.file {
                discard_upload(state.storage.as_ref(), path).await;
            }
            return Err(e.into());
        }
    };

    tracing::info!(post_id = post.id, user_id = user.user_id, "Post created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: post })))
}

/// PUT /api/v1/posts/{id}
///
/// Omitted fields keep their value. A new file replaces the old one.
pub async fn update_post(
    State(state): State<AppState>,
    RequireTeacher(user): RequireTeacher,
    Path(id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<Json<DataResponse<Post>>> {
    let form = FormData::from_multipart(multipart).await?;
    let current = PostRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Post", id }))?;

    let description = form.text("description").map(str::to_string);
    validate_post(
        description.as_deref().or(current.description.as_deref()),
        form.file.is_some() || current.file.is_some(),
    )?;

    let input = UpdatePost {
        description,
        file: store_upload(state.storage.as_ref(), CATEGORY_POSTS, form.file.as_ref()).await?,
    };

    let updated = match PostRepo::update(&state.pool, id, &input).await {
        Ok(Some(post)) => post,
        other => {
            if let Some(path) = &input.file {
                discard_upload(state.storage.as_ref(), path).await;
            }
            return match other {
                Err(e) => Err(e.into()),
                _ => Err(AppError::Core(CoreError::NotFound { entity: "Post", id })),
            };
        }
    };

    if let (Some(_), Some(old)) = (&input.file, &current.file) {
        discard_upload(state.storage.as_ref(), old).await;
    }
    tracing::info!(post_id = id, user_id = user.user_id, "Post updated");
    Ok(Json(DataResponse { data: updated }))
}

/// DELETE /api/v1/posts/{id}
pub async fn delete_post(
    State(state): State<AppState>,
    RequireTeacher(user): RequireTeacher,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let post = PostRepo::delete(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Post", id }))?;
    if let Some(file) = &post.file {
        discard_upload(state.storage.as_ref(), file).await;
    }
    tracing::info!(post_id = id, user_id = user.user_id, "Post deleted");
    Ok(StatusCode::NO_CONTENT)
}
