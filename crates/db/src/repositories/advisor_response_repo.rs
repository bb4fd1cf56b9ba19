//! Repository for the `advisor_responses` ledger.

use gradhub_core::pre_project::ResponseStatus;
use gradhub_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::pre_project::{AdvisorResponse, AdvisorWithStatus};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "pre_project_id, advisor_id, status, created_at, updated_at";

/// Provides access to per-advisor responses.
pub struct AdvisorResponseRepo;

impl AdvisorResponseRepo {
    /// Invite advisors with a `pending` row each. Existing rows are kept.
    pub async fn insert_pending_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        pre_project_id: DbId,
        advisor_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        for &advisor_id in advisor_ids {
            sqlx::query(
                "INSERT INTO advisor_responses (pre_project_id, advisor_id, status)
                 VALUES ($1, $2, 'pending')
                 ON CONFLICT (pre_project_id, advisor_id) DO NOTHING",
            )
            .bind(pre_project_id)
            .bind(advisor_id)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Insert or overwrite one advisor's status.
    pub async fn upsert_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        pre_project_id: DbId,
        advisor_id: DbId,
        status: ResponseStatus,
    ) -> Result<AdvisorResponse, sqlx::Error> {
        let query = format!(
            "INSERT INTO advisor_responses (pre_project_id, advisor_id, status)
             VALUES ($1, $2, $3)
             ON CONFLICT (pre_project_id, advisor_id) DO UPDATE SET status = EXCLUDED.status
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AdvisorResponse>(&query)
            .bind(pre_project_id)
            .bind(advisor_id)
            .bind(status.as_str())
            .fetch_one(&mut **tx)
            .await
    }

    /// Mark every other advisor's row for the project as `rejected`.
    pub async fn reject_others_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        pre_project_id: DbId,
        accepted_advisor: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE advisor_responses SET status = 'rejected'
             WHERE pre_project_id = $1 AND advisor_id <> $2 AND status <> 'rejected'",
        )
        .bind(pre_project_id)
        .bind(accepted_advisor)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// Drop the whole ledger for a project.
    pub async fn delete_all_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        pre_project_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM advisor_responses WHERE pre_project_id = $1")
            .bind(pre_project_id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }

    /// Invited advisor ids for a project.
    pub async fn advisor_ids<'e>(
        executor: impl PgExecutor<'e>,
        pre_project_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT advisor_id FROM advisor_responses
             WHERE pre_project_id = $1 ORDER BY advisor_id",
        )
        .bind(pre_project_id)
        .fetch_all(executor)
        .await
    }

    pub async fn find<'e>(
        executor: impl PgExecutor<'e>,
        pre_project_id: DbId,
        advisor_id: DbId,
    ) -> Result<Option<AdvisorResponse>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM advisor_responses
             WHERE pre_project_id = $1 AND advisor_id = $2"
        );
        sqlx::query_as::<_, AdvisorResponse>(&query)
            .bind(pre_project_id)
            .bind(advisor_id)
            .fetch_optional(executor)
            .await
    }

    pub async fn list_for_project<'e>(
        executor: impl PgExecutor<'e>,
        pre_project_id: DbId,
    ) -> Result<Vec<AdvisorResponse>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM advisor_responses
             WHERE pre_project_id = $1 ORDER BY advisor_id"
        );
        sqlx::query_as::<_, AdvisorResponse>(&query)
            .bind(pre_project_id)
            .fetch_all(executor)
            .await
    }

    /// Invited advisors joined with their user details.
    pub async fn advisors_with_status<'e>(
        executor: impl PgExecutor<'e>,
        pre_project_id: DbId,
    ) -> Result<Vec<AdvisorWithStatus>, sqlx::Error> {
        sqlx::query_as::<_, AdvisorWithStatus>(
            "SELECT u.id, u.name, u.email, u.image, ar.status
             FROM advisor_responses ar
             JOIN users u ON u.id = ar.advisor_id
             WHERE ar.pre_project_id = $1
             ORDER BY u.name",
        )
        .bind(pre_project_id)
        .fetch_all(executor)
        .await
    }
}
