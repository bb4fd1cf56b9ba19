//! Terminal transition: an accepted pre-project becomes a book.

use gradhub_core::book::{validate_book, validate_migration, BookDraft};
use gradhub_core::roles::{ROLE_GRADUATED, ROLE_GRADUATION_STUDENT};
use gradhub_core::types::DbId;

use super::error::LifecycleError;
use super::PreProjectLifecycle;
use crate::models::book::{BookDetails, CreateBook};
use crate::repositories::{BookRepo, PreProjectRepo, UserRoleRepo};

impl PreProjectLifecycle {
    /// Migrate an accepted pre-project into a book.
    ///
    /// In one transaction: create the book with the project's students, the
    /// accepted advisor and the given discussants, move every student from
    /// `graduation_student` to `graduated`, and delete the pre-project. The
    /// attached file is carried over to the book.
    pub async fn migrate_to_book(
        &self,
        pre_project_id: DbId,
        degree: i32,
        discussant_ids: &[DbId],
    ) -> Result<BookDetails, LifecycleError> {
        validate_migration(degree, discussant_ids)?;
        self.ensure_users_exist("discussants", discussant_ids).await?;

        let mut tx = self.pool.begin().await?;
        let project = PreProjectRepo::find_for_update_tx(&mut tx, pre_project_id)
            .await?
            .ok_or(LifecycleError::pre_project_not_found(pre_project_id))?;
        let advisor = project
            .accepted_advisor
            .ok_or(LifecycleError::NoAcceptedAdvisor)?;
        let students = PreProjectRepo::student_ids(&mut *tx, pre_project_id).await?;

        let input = CreateBook {
            name: project.name,
            description: project.description,
            file: project.file,
            year: project.year,
            season: project.season,
            degree: Some(degree),
            student_ids: students,
            advisor_ids: vec![advisor],
            discussant_ids: discussant_ids.to_vec(),
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

        let book = BookRepo::create_tx(&mut tx, &input).await?;
        let revoked =
            UserRoleRepo::revoke_many_tx(&mut tx, &input.student_ids, ROLE_GRADUATION_STUDENT)
                .await?;
        let granted =
            UserRoleRepo::grant_many_tx(&mut tx, &input.student_ids, ROLE_GRADUATED).await?;
        PreProjectRepo::delete_tx(&mut tx, pre_project_id).await?;
        tx.commit().await?;

        tracing::info!(
            pre_project_id,
            book_id = book.id,
            advisor_id = advisor,
            revoked,
            granted,
            "Pre-project migrated to book"
        );

        BookRepo::find_details(&self.pool, book.id)
            .await?
            .ok_or(LifecycleError::NotFound {
                entity: "Book",
                id: book.id,
            })
    }
}
