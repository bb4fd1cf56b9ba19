//! Repository for the `books` table and its association sets.

use gradhub_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::book::{Book, BookDetails, CreateBook, UpdateBook};
use crate::models::user::UserSummary;
use crate::models::ListQuery;
use crate::repositories::user_repo::SUMMARY_COLUMNS;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, name, description, file, year, season, degree, created_at, updated_at";

/// Association tables, keyed by the column holding the user id.
const STUDENTS: (&str, &str) = ("book_students", "student_id");
const ADVISORS: (&str, &str) = ("book_advisors", "advisor_id");
const DISCUSSANTS: (&str, &str) = ("book_discussants", "discussant_id");

/// Provides CRUD operations for books.
pub struct BookRepo;

impl BookRepo {
    /// Insert a book with all of its participants in one transaction.
    pub async fn create(pool: &PgPool, input: &CreateBook) -> Result<Book, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let book = Self::create_tx(&mut tx, input).await?;
        tx.commit().await?;
        Ok(book)
    }

    /// Insert a book with all of its participants inside a caller-owned
    /// transaction.
    pub async fn create_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        input: &CreateBook,
    ) -> Result<Book, sqlx::Error> {
        let query = format!(
            "INSERT INTO books (name, description, file, year, season, degree)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        let book = sqlx::query_as::<_, Book>(&query)
            .bind(input.name.trim())
            .bind(input.description.trim())
            .bind(&input.file)
            .bind(input.year)
            .bind(&input.season)
            .bind(input.degree)
            .fetch_one(&mut **tx)
            .await?;

        Self::set_members_inner(tx, STUDENTS, book.id, &input.student_ids).await?;
        Self::set_members_inner(tx, ADVISORS, book.id, &input.advisor_ids).await?;
        Self::set_members_inner(tx, DISCUSSANTS, book.id, &input.discussant_ids).await?;

        Ok(book)
    }

    /// Find a book by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Book>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM books WHERE id = $1");
        sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a book by ID, enriched with its participants.
    pub async fn find_details(pool: &PgPool, id: DbId) -> Result<Option<BookDetails>, sqlx::Error> {
        match Self::find_by_id(pool, id).await? {
            Some(book) => Ok(Some(Self::with_details(pool, book).await?)),
            None => Ok(None),
        }
    }

    /// Resolve participants for an already loaded book.
    pub async fn with_details(pool: &PgPool, book: Book) -> Result<BookDetails, sqlx::Error> {
        let students = Self::members(pool, STUDENTS, book.id).await?;
        let advisors = Self::members(pool, ADVISORS, book.id).await?;
        let discussants = Self::members(pool, DISCUSSANTS, book.id).await?;
        Ok(BookDetails {
            book,
            students,
            advisors,
            discussants,
        })
    }

    /// List books, newest first, optionally filtered by name or description.
    pub async fn list(pool: &PgPool, params: &ListQuery) -> Result<Vec<Book>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM books
             WHERE $1::TEXT IS NULL OR name ILIKE $1 OR description ILIKE $1
             ORDER BY year DESC, created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Book>(&query)
            .bind(&params.search)
            .bind(params.limit)
            .bind(params.offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool, params: &ListQuery) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM books
             WHERE $1::TEXT IS NULL OR name ILIKE $1 OR description ILIKE $1",
        )
        .bind(&params.search)
        .fetch_one(pool)
        .await
    }

    /// Update a book. Only non-`None` fields are applied; `Some` lists
    /// replace the association set.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateBook,
    ) -> Result<Option<Book>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE books SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                file = COALESCE($4, file),
                year = COALESCE($5, year),
                season = COALESCE($6, season),
                degree = COALESCE($7, degree)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let book = sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .bind(input.name.as_deref().map(str::trim))
            .bind(input.description.as_deref().map(str::trim))
            .bind(&input.file)
            .bind(input.year)
            .bind(&input.season)
            .bind(input.degree)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(book) = book else {
            return Ok(None);
        };

        if let Some(ids) = &input.student_ids {
            Self::set_members_inner(&mut tx, STUDENTS, id, ids).await?;
        }
        if let Some(ids) = &input.advisor_ids {
            Self::set_members_inner(&mut tx, ADVISORS, id, ids).await?;
        }
        if let Some(ids) = &input.discussant_ids {
            Self::set_members_inner(&mut tx, DISCUSSANTS, id, ids).await?;
        }

        tx.commit().await?;
        Ok(Some(book))
    }

    /// Delete a book, returning the removed row so its file can be cleaned up.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<Option<Book>, sqlx::Error> {
        let query = format!("DELETE FROM books WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    async fn members<'e>(
        executor: impl PgExecutor<'e>,
        (table, column): (&str, &str),
        book_id: DbId,
    ) -> Result<Vec<UserSummary>, sqlx::Error> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM {table} m
             JOIN users u ON u.id = m.{column}
             WHERE m.book_id = $1
             ORDER BY u.name"
        );
        sqlx::query_as::<_, UserSummary>(&query)
            .bind(book_id)
            .fetch_all(executor)
            .await
    }

    /// Replace all rows of one association table for a book.
    async fn set_members_inner(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        (table, column): (&str, &str),
        book_id: DbId,
        user_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        sqlx::query(&format!("DELETE FROM {table} WHERE book_id = $1"))
            .bind(book_id)
            .execute(&mut **tx)
            .await?;

        let insert = format!(
            "INSERT INTO {table} (book_id, {column}) VALUES ($1, $2) ON CONFLICT DO NOTHING"
        );
        for &user_id in user_ids {
            sqlx::query(&insert)
                .bind(book_id)
                .bind(user_id)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }
}
