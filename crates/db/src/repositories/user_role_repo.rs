//! Repository for the `user_roles` join table.
//!
//! Grants and revokes are idempotent: granting a held role or revoking a
//! missing one is not an error.

use gradhub_core::types::DbId;
use sqlx::PgPool;

/// Provides role membership operations.
pub struct UserRoleRepo;

impl UserRoleRepo {
    /// Role names held by a user, ordered by role id.
    pub async fn roles_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT r.name FROM user_roles ur
             JOIN roles r ON r.id = ur.role_id
             WHERE ur.user_id = $1
             ORDER BY r.id ASC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Number of active users holding the named role.
    pub async fn count_active_with_role(pool: &PgPool, role_name: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM user_roles ur
             JOIN roles r ON r.id = ur.role_id
             JOIN users u ON u.id = ur.user_id
             WHERE r.name = $1 AND u.is_active = true",
        )
        .bind(role_name)
        .fetch_one(pool)
        .await
    }

    /// Grant a role by name. Returns `true` if the role was newly granted.
    pub async fn grant(pool: &PgPool, user_id: DbId, role_name: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO user_roles (user_id, role_id)
             SELECT $1, id FROM roles WHERE name = $2
             ON CONFLICT (user_id, role_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(role_name)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke a role by name. Returns `true` if a membership was removed.
    pub async fn revoke(pool: &PgPool, user_id: DbId, role_name: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM user_roles
             WHERE user_id = $1 AND role_id = (SELECT id FROM roles WHERE name = $2)",
        )
        .bind(user_id)
        .bind(role_name)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Grant a role to many users inside a transaction.
    pub async fn grant_many_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_ids: &[DbId],
        role_name: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO user_roles (user_id, role_id)
             SELECT u.id, r.id FROM UNNEST($1::BIGINT[]) AS u(id), roles r
             WHERE r.name = $2
             ON CONFLICT (user_id, role_id) DO NOTHING",
        )
        .bind(user_ids)
        .bind(role_name)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// Revoke a role from many users inside a transaction.
    pub async fn revoke_many_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_ids: &[DbId],
        role_name: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM user_roles
             WHERE user_id = ANY($1)
               AND role_id = (SELECT id FROM roles WHERE name = $2)",
        )
        .bind(user_ids)
        .bind(role_name)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}
