use sqlx::PgPool;

/// Connect, migrate, and verify the seeded role catalogue.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    gradhub_db::health_check(&pool).await.unwrap();

    let names: Vec<String> = sqlx::query_scalar("SELECT name FROM roles ORDER BY id")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(
        names,
        vec!["admin", "teacher", "student", "graduation_student", "graduated"]
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_updated_at_trigger_bumps_timestamp(pool: PgPool) {
    let (id, created): (i64, chrono::DateTime<chrono::Utc>) = sqlx::query_as(
        "INSERT INTO users (name, email, password_hash)
         VALUES ('Trigger', 'trigger@uni.test', 'x')
         RETURNING id, updated_at",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    let updated: chrono::DateTime<chrono::Utc> =
        sqlx::query_scalar("UPDATE users SET name = 'Trigger 2' WHERE id = $1 RETURNING updated_at")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(updated >= created);
}
