//! Repository for the `pre_projects` table and its student / discussant
//! association sets.
//!
//! Multi-statement changes are exposed as `_tx` methods so the lifecycle
//! controller can compose them into a single transaction.

use gradhub_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::pre_project::{CreatePreProject, PreProject, UpdatePreProject};
use crate::models::user::UserSummary;
use crate::models::ListQuery;
use crate::repositories::user_repo::SUMMARY_COLUMNS;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, file, file_description, project_owner, year, \
                       season, degree, can_update, accepted_advisor, created_at, updated_at";

/// Provides persistence for pre-projects.
pub struct PreProjectRepo;

impl PreProjectRepo {
    // -----------------------------------------------------------------------
    // Rows
    // -----------------------------------------------------------------------

    /// Insert a new pre-project owned by `owner`, open for updates.
    pub async fn insert_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        owner: DbId,
        input: &CreatePreProject,
    ) -> Result<PreProject, sqlx::Error> {
        let query = format!(
            "INSERT INTO pre_projects
                (name, description, file, file_description, project_owner, year, season, can_update)
             VALUES ($1, $2, $3, $4, $5, $6, $7, true)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PreProject>(&query)
            .bind(input.name.trim())
            .bind(input.description.trim())
            .bind(&input.file)
            .bind(&input.file_description)
            .bind(owner)
            .bind(input.year)
            .bind(&input.season)
            .fetch_one(&mut **tx)
            .await
    }

    /// Find a pre-project by its internal ID.
    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<PreProject>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pre_projects WHERE id = $1");
        sqlx::query_as::<_, PreProject>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find and row-lock a pre-project for the rest of the transaction.
    pub async fn find_for_update_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
    ) -> Result<Option<PreProject>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pre_projects WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, PreProject>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Apply scalar fields of a partial update. `None` keeps the stored value.
    pub async fn update_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
        input: &UpdatePreProject,
    ) -> Result<PreProject, sqlx::Error> {
        let query = format!(
            "UPDATE pre_projects SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                file = COALESCE($4, file),
                file_description = COALESCE($5, file_description),
                year = COALESCE($6, year),
                season = COALESCE($7, season),
                degree = COALESCE($8, degree)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PreProject>(&query)
            .bind(id)
            .bind(input.name.as_deref().map(str::trim))
            .bind(input.description.as_deref().map(str::trim))
            .bind(&input.file)
            .bind(&input.file_description)
            .bind(input.year)
            .bind(&input.season)
            .bind(input.degree)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn set_can_update_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
        can_update: bool,
    ) -> Result<PreProject, sqlx::Error> {
        let query =
            format!("UPDATE pre_projects SET can_update = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, PreProject>(&query)
            .bind(id)
            .bind(can_update)
            .fetch_one(&mut **tx)
            .await
    }

    /// Delete a pre-project. Associations and responses cascade.
    pub async fn delete_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM pre_projects WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Acceptance pointer
    // -----------------------------------------------------------------------

    /// Read the accepted advisor. Outer `None` means the row is gone.
    pub async fn accepted_advisor_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
    ) -> Result<Option<Option<DbId>>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<DbId>>(
            "SELECT accepted_advisor FROM pre_projects WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Same as [`Self::accepted_advisor_tx`] but takes a share lock, so a
    /// concurrent claim waits until this transaction ends.
    pub async fn accepted_advisor_shared_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
    ) -> Result<Option<Option<DbId>>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<DbId>>(
            "SELECT accepted_advisor FROM pre_projects WHERE id = $1 FOR SHARE",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Compare-and-set the accepted advisor.
    ///
    /// Returns `true` only if this call moved the pointer from NULL to
    /// `advisor_id`. Callers must treat `false` as a lost race.
    pub async fn claim_acceptance_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
        advisor_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE pre_projects SET accepted_advisor = $2
             WHERE id = $1 AND accepted_advisor IS NULL",
        )
        .bind(id)
        .bind(advisor_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn clear_accepted_advisor_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE pre_projects SET accepted_advisor = NULL WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Students
    // -----------------------------------------------------------------------

    /// The pre-project a student participates in, if any.
    pub async fn project_of_student<'e>(
        executor: impl PgExecutor<'e>,
        student_id: DbId,
    ) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT pre_project_id FROM pre_project_students WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_optional(executor)
        .await
    }

    /// Students among `ids` already on a pre-project other than `exclude`.
    pub async fn students_with_project<'e>(
        executor: impl PgExecutor<'e>,
        ids: &[DbId],
        exclude: Option<DbId>,
    ) -> Result<Vec<UserSummary>, sqlx::Error> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM pre_project_students ps
             JOIN users u ON u.id = ps.student_id
             WHERE ps.student_id = ANY($1)
               AND ($2::BIGINT IS NULL OR ps.pre_project_id <> $2)
             ORDER BY u.id"
        );
        sqlx::query_as::<_, UserSummary>(&query)
            .bind(ids)
            .bind(exclude)
            .fetch_all(executor)
            .await
    }

    pub async fn student_ids<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT student_id FROM pre_project_students
             WHERE pre_project_id = $1 ORDER BY student_id",
        )
        .bind(id)
        .fetch_all(executor)
        .await
    }

    pub async fn students<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Vec<UserSummary>, sqlx::Error> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM pre_project_students ps
             JOIN users u ON u.id = ps.student_id
             WHERE ps.pre_project_id = $1
             ORDER BY u.name"
        );
        sqlx::query_as::<_, UserSummary>(&query)
            .bind(id)
            .fetch_all(executor)
            .await
    }

    /// Replace the student set. Hits `uq_pre_project_students_student` if a
    /// student is already on another pre-project.
    pub async fn replace_students_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
        student_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM pre_project_students WHERE pre_project_id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        for &student_id in student_ids {
            sqlx::query(
                "INSERT INTO pre_project_students (pre_project_id, student_id) VALUES ($1, $2)",
            )
            .bind(id)
            .bind(student_id)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Discussants
    // -----------------------------------------------------------------------

    pub async fn discussants<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Vec<UserSummary>, sqlx::Error> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM pre_project_discussants pd
             JOIN users u ON u.id = pd.discussant_id
             WHERE pd.pre_project_id = $1
             ORDER BY u.name"
        );
        sqlx::query_as::<_, UserSummary>(&query)
            .bind(id)
            .fetch_all(executor)
            .await
    }

    /// Replace the discussant set. An empty slice clears it.
    pub async fn replace_discussants_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
        discussant_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM pre_project_discussants WHERE pre_project_id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        for &discussant_id in discussant_ids {
            sqlx::query(
                "INSERT INTO pre_project_discussants (pre_project_id, discussant_id)
                 VALUES ($1, $2)",
            )
            .bind(id)
            .bind(discussant_id)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Listing
    // -----------------------------------------------------------------------

    /// List pre-projects, newest first, optionally filtered by name or
    /// description.
    pub async fn list(pool: &PgPool, params: &ListQuery) -> Result<Vec<PreProject>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM pre_projects
             WHERE $1::TEXT IS NULL OR name ILIKE $1 OR description ILIKE $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, PreProject>(&query)
            .bind(&params.search)
            .bind(params.limit)
            .bind(params.offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool, params: &ListQuery) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM pre_projects
             WHERE $1::TEXT IS NULL OR name ILIKE $1 OR description ILIKE $1",
        )
        .bind(&params.search)
        .fetch_one(pool)
        .await
    }

    /// Pre-projects a user is involved in: owner, accepted or invited
    /// advisor, student, or discussant.
    pub async fn list_associated(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<PreProject>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM pre_projects p
             WHERE p.project_owner = $1
                OR p.accepted_advisor = $1
                OR EXISTS (SELECT 1 FROM advisor_responses ar
                           WHERE ar.pre_project_id = p.id AND ar.advisor_id = $1)
                OR EXISTS (SELECT 1 FROM pre_project_students ps
                           WHERE ps.pre_project_id = p.id AND ps.student_id = $1)
                OR EXISTS (SELECT 1 FROM pre_project_discussants pd
                           WHERE pd.pre_project_id = p.id AND pd.discussant_id = $1)
             ORDER BY p.created_at DESC, p.id DESC"
        );
        sqlx::query_as::<_, PreProject>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}
