use gradhub_core::types::DbId;
use gradhub_core::validation::FieldErrors;

/// Name reported when the storage-level guard fires and the offending
/// student cannot be identified.
pub const UNKNOWN_STUDENT: &str = "one of the listed students";

/// Constraint enforcing one pre-project per student.
pub const STUDENT_UNIQUE_CONSTRAINT: &str = "uq_pre_project_students_student";

/// Failures of pre-project lifecycle operations.
///
/// Conflicts are separate variants so callers can tell a lost race from a
/// generic failure.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    InvalidFields(FieldErrors),

    #[error("You already have a pre-project")]
    OwnerHasPreProject,

    #[error("Student {name} already has a pre-project")]
    StudentHasPreProject { name: String },

    #[error("Pre-project has already been accepted by another advisor")]
    AcceptedByOther,

    #[error("You already accepted this pre-project")]
    AlreadyAccepted,

    #[error("Pre-project has no accepted advisor")]
    NoAcceptedAdvisor,

    #[error("Pre-project is locked for updates")]
    Locked,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<FieldErrors> for LifecycleError {
    fn from(errors: FieldErrors) -> Self {
        LifecycleError::InvalidFields(errors)
    }
}

impl LifecycleError {
    pub(crate) fn pre_project_not_found(id: DbId) -> Self {
        LifecycleError::NotFound {
            entity: "PreProject",
            id,
        }
    }

    pub(crate) fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        LifecycleError::InvalidFields(errors)
    }
}

/// Map a unique violation on the student set to the student conflict;
/// everything else stays a database error.
pub(crate) fn map_student_conflict(err: sqlx::Error) -> LifecycleError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505")
            && db_err.constraint() == Some(STUDENT_UNIQUE_CONSTRAINT)
        {
            return LifecycleError::StudentHasPreProject {
                name: UNKNOWN_STUDENT.to_string(),
            };
        }
    }
    LifecycleError::Database(err)
}
