use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gradhub_core::error::CoreError;
use gradhub_core::similarity::SimilarProject;
use gradhub_core::storage::StorageError;
use gradhub_core::validation::FieldErrors;
use gradhub_db::lifecycle::LifecycleError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`LifecycleError`] for domain errors and adds
/// HTTP-specific variants. Implements [`IntoResponse`] to produce consistent
/// JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `gradhub_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A failure of a pre-project lifecycle operation.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The similarity gate found projects too close to the proposal.
    #[error("Similar projects found")]
    SimilarProjects(Vec<SimilarProject>),

    /// A dependency (the similarity service) could not be reached.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Core(CoreError::InvalidFields(errors))
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TooLarge { .. } => {
                let mut errors = FieldErrors::new();
                errors.add("file", err.to_string());
                errors.into()
            }
            other => AppError::InternalError(format!("File storage error: {other}")),
        }
    }
}

/// Status, machine-readable code, message, and an optional extra JSON field.
type ErrorParts = (StatusCode, &'static str, String, Option<(&'static str, serde_json::Value)>);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, extra): ErrorParts = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                    None,
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone(), None)
                }
                CoreError::InvalidFields(fields) => validation_parts(fields),
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone(), None),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone(), None)
                }
                CoreError::Forbidden(msg) => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone(), None)
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal_parts()
                }
            },

            // --- Lifecycle errors ---
            AppError::Lifecycle(err) => match err {
                LifecycleError::NotFound { .. } => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string(), None)
                }
                LifecycleError::InvalidFields(fields) => validation_parts(fields),
                LifecycleError::OwnerHasPreProject => (
                    StatusCode::CONFLICT,
                    "OWNER_HAS_PRE_PROJECT",
                    err.to_string(),
                    None,
                ),
                LifecycleError::StudentHasPreProject { .. } => (
                    StatusCode::CONFLICT,
                    "STUDENT_HAS_PRE_PROJECT",
                    err.to_string(),
                    None,
                ),
                LifecycleError::AcceptedByOther => (
                    StatusCode::CONFLICT,
                    "ACCEPTED_BY_OTHER",
                    err.to_string(),
                    None,
                ),
                LifecycleError::AlreadyAccepted => (
                    StatusCode::CONFLICT,
                    "ALREADY_ACCEPTED",
                    err.to_string(),
                    None,
                ),
                LifecycleError::NoAcceptedAdvisor => (
                    StatusCode::CONFLICT,
                    "NO_ACCEPTED_ADVISOR",
                    err.to_string(),
                    None,
                ),
                LifecycleError::Locked => (
                    StatusCode::FORBIDDEN,
                    "PRE_PROJECT_LOCKED",
                    err.to_string(),
                    None,
                ),
                LifecycleError::Forbidden(msg) => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone(), None)
                }
                LifecycleError::Database(db_err) => {
                    let (status, code, message) = classify_sqlx_error(db_err);
                    (status, code, message, None)
                }
            },

            // --- Database errors ---
            AppError::Database(err) => {
                let (status, code, message) = classify_sqlx_error(err);
                (status, code, message, None)
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), None)
            }
            AppError::SimilarProjects(projects) => (
                StatusCode::CONFLICT,
                "SIMILAR_PROJECTS",
                "Similar projects already exist".to_string(),
                Some(("similar_projects", json!(projects))),
            ),
            AppError::ServiceUnavailable(msg) => {
                tracing::warn!(error = %msg, "Dependency unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    msg.clone(),
                    None,
                )
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal_parts()
            }
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some((key, value)) = extra {
            body[key] = value;
        }

        (status, axum::Json(body)).into_response()
    }
}

fn validation_parts(fields: &FieldErrors) -> ErrorParts {
    (
        StatusCode::BAD_REQUEST,
        "VALIDATION_ERROR",
        "Validation failed".to_string(),
        Some(("fields", json!(fields))),
    )
}

fn internal_parts() -> ErrorParts {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
        None,
    )
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
