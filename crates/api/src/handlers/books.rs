//! Handlers for the `/books` resource (finalized project records).
//!
//! Lists and details are public; mutations require the `admin` role.
//! Create and update take `multipart/form-data` with an optional `file`.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use gradhub_core::book::{validate_book, BookDraft};
use gradhub_core::error::CoreError;
use gradhub_core::search::PageMeta;
use gradhub_core::storage::CATEGORY_BOOKS;
use gradhub_core::types::DbId;
use gradhub_core::validation::FieldErrors;
use gradhub_db::models::book::{Book, BookDetails, CreateBook, UpdateBook};
use gradhub_db::models::user::UserSummary;
use gradhub_db::repositories::BookRepo;

use crate::error::{AppError, AppResult};
use crate::form::{discard_upload, resolve_optional_users, store_upload, FormData};
use crate::middleware::rbac::RequireAdmin;
use crate::query::SearchParams;
use crate::response::{DataResponse, PagedResponse};
use crate::similarity;
use crate::state::AppState;

/// GET /api/v1/books
///
/// Supports `?search=` on name and description.
pub async fn list_books(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<PagedResponse<Book>>> {
    let query = params.to_list_query();
    let data = BookRepo::list(&state.pool, &query).await?;
    let total = BookRepo::count(&state.pool, &query).await?;
    Ok(Json(PagedResponse {
        data,
        meta: PageMeta {
            total,
            limit: query.limit,
            offset: query.offset,
        },
    }))
}

/// GET /api/v1/books/{id}
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BookDetails>>> {
    let book = BookRepo::find_details(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Book", id }))?;
    Ok(Json(DataResponse { data: book }))
}

/// POST /api/v1/books
///
/// Create a book directly. Runs the similarity gate unless confirmed.
pub async fn create_book(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<BookDetails>>)> {
    let form = FormData::from_multipart(multipart).await?;

    let mut errors = FieldErrors::new();
    let year = form.required_int("year", &mut errors);
    let degree = form.int("degree", &mut errors);
    errors.into_result()?;

    let student_ids = resolve_optional_users(&state.pool, &form, "students").await?;
    let advisor_ids = resolve_optional_users(&state.pool, &form, "advisors").await?;
    let discussant_ids = resolve_optional_users(&state.pool, &form, "discussants").await?;

    let mut input = CreateBook {
        name: form.text_or_empty("name"),
        description: form.text_or_empty("description"),
        file: None,
        year,
        season: form.text_or_empty("season").to_lowercase(),
        degree,
        student_ids: student_ids.unwrap_or_default(),
        advisor_ids: advisor_ids.unwrap_or_default(),
        discussant_ids: discussant_ids.unwrap_or_default(),
    };

    validate_book(&BookDraft {
        name: &input.name,
        description: &input.description,
        year: input.year,
        season: &input.season,
        degree: input.degree,
        student_ids: &input.student_ids,
        advisor_ids: &input.advisor_ids,
        discussant_ids: &input.discussant_ids,
    })?;

    similarity::enforce(
        state.similarity.as_ref(),
        &admin,
        form.flag("confirm"),
        &input.name,
        &input.description,
        None,
    )
    .await?;

    input.file = store_upload(state.storage.as_ref(), CATEGORY_BOOKS, form.file.as_ref()).await?;

    let book = match BookRepo::create(&state.pool, &input).await {
        Ok(book) => book,
        Err(e) => {
            if let Some(path) = &input.file {
                discard_upload(state.storage.as_ref(), path).await;
            }
            return Err(e.into());
        }
    };
    tracing::info!(book_id = book.id, admin_id = admin.user_id, "Book created");

    let details = BookRepo::with_details(&state.pool, book).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: details })))
}

/// PUT /api/v1/books/{id}
///
/// Partial update. Supplied participant lists replace the current ones; the
/// merged record must still pass book validation.
pub async fn update_book(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<Json<DataResponse<BookDetails>>> {
    let form = FormData::from_multipart(multipart).await?;
    let current = BookRepo::find_details(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Book", id }))?;

    let mut errors = FieldErrors::new();
    let year = form.int("year", &mut errors);
    let degree = form.int("degree", &mut errors);
    errors.into_result()?;

    let mut input = UpdateBook {
        name: form.text("name").map(str::to_string),
        description: form.text("description").map(str::to_string),
        file: None,
        year,
        season: form.text("season").map(str::to_lowercase),
        degree,
        student_ids: resolve_optional_users(&state.pool, &form, "students").await?,
        advisor_ids: resolve_optional_users(&state.pool, &form, "advisors").await?,
        discussant_ids: resolve_optional_users(&state.pool, &form, "discussants").await?,
    };

    let students = merged_ids(&input.student_ids, &current.students);
    let advisors = merged_ids(&input.advisor_ids, &current.advisors);
    let discussants = merged_ids(&input.discussant_ids, &current.discussants);
    validate_book(&BookDraft {
        name: input.name.as_deref().unwrap_or(&current.book.name),
        description: input
            .description
            .as_deref()
            .unwrap_or(&current.book.description),
        year: input.year.unwrap_or(current.book.year),
        season: input.season.as_deref().unwrap_or(&current.book.season),
        degree: input.degree.or(current.book.degree),
        student_ids: &students,
        advisor_ids: &advisors,
        discussant_ids: &discussants,
    })?;

    input.file = store_upload(state.storage.as_ref(), CATEGORY_BOOKS, form.file.as_ref()).await?;

    let updated = match BookRepo::update(&state.pool, id, &input).await {
        Ok(Some(book)) => book,
        Ok(None) => {
            if let Some(path) = &input.file {
                discard_upload(state.storage.as_ref(), path).await;
            }
            return Err(AppError::Core(CoreError::NotFound { entity: "Book", id }));
        }
        Err(e) => {
            if let Some(path) = &input.file {
                discard_upload(state.storage.as_ref(), path).await;
            }
            return Err(e.into());
        }
    };

    if let (Some(_), Some(old)) = (&input.file, &current.book.file) {
        discard_upload(state.storage.as_ref(), old).await;
    }
    tracing::info!(book_id = id, admin_id = admin.user_id, "Book updated");

    let details = BookRepo::with_details(&state.pool, updated).await?;
    Ok(Json(DataResponse { data: details }))
}

/// DELETE /api/v1/books/{id}
///
/// Returns 204 No Content. The attached file is removed best-effort.
pub async fn delete_book(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let book = BookRepo::delete(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Book", id }))?;
    if let Some(file) = &book.file {
        discard_upload(state.storage.as_ref(), file).await;
    }
    tracing::info!(book_id = id, admin_id = admin.user_id, "Book deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Supplied ids, or the ids of the current members.
fn merged_ids(supplied: &Option<Vec<DbId>>, current: &[UserSummary]) -> Vec<DbId> {
    match supplied {
        Some(ids) => ids.clone(),
        None => current.iter().map(|u| u.id).collect(),
    }
}
