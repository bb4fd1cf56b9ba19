//! Pre-project lifecycle controller.
//!
//! A pre-project moves through three states:
//!
//! ```text
//! OPEN      --accept, wins CAS-->           LOCKED(advisor)
//! OPEN      --accept, loses CAS-->          OPEN (AcceptedByOther)
//! LOCKED    --reset / advisor list replaced--> OPEN
//! LOCKED    --migrate-->                    TERMINATED (book created, row deleted)
//! ```
//!
//! Every multi-statement change runs in one sqlx transaction. Update,
//! delete, and migrate serialize on `SELECT ... FOR UPDATE`; acceptance is
//! an optimistic compare-and-set on `accepted_advisor` checked through the
//! affected-row count.

mod arbitration;
pub mod error;
mod migration;

use std::sync::Arc;

use chrono::Datelike;
use gradhub_core::book::validate_discussants;
use gradhub_core::pre_project::{
    advisor_set_changed, newly_added, validate_proposal, validate_proposal_patch, ProposalDraft,
    ProposalPatch,
};
use gradhub_core::storage::FileStorage;
use gradhub_core::types::DbId;

use crate::models::pre_project::{
    CreatePreProject, PreProject, PreProjectDetails, UpdatePreProject,
};
use crate::models::{ListQuery, Page};
use crate::repositories::{AdvisorResponseRepo, PreProjectRepo, UserRepo};
use crate::DbPool;

pub use error::LifecycleError;
use error::map_student_conflict;

/// Identity of the user performing a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: DbId,
    pub is_admin: bool,
}

/// Orchestrates pre-project mutations over an injected pool and file store.
#[derive(Clone)]
pub struct PreProjectLifecycle {
    pool: DbPool,
    storage: Arc<dyn FileStorage>,
}

impl PreProjectLifecycle {
    pub fn new(pool: DbPool, storage: Arc<dyn FileStorage>) -> Self {
        Self { pool, storage }
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    /// Create a pre-project with its students and invited advisors.
    ///
    /// A non-admin owner is always enrolled as a student. If the insert does
    /// not commit, the uploaded file referenced by `input.file` is removed.
    pub async fn create(
        &self,
        owner: DbId,
        is_admin: bool,
        input: &CreatePreProject,
        student_ids: &[DbId],
        advisor_ids: &[DbId],
    ) -> Result<PreProjectDetails, LifecycleError> {
        let pre_project = match self
            .create_inner(owner, is_admin, input, student_ids, advisor_ids)
            .await
        {
            Ok(row) => row,
            Err(err) => {
                if let Some(file) = &input.file {
                    self.remove_file(file).await;
                }
                return Err(err);
            }
        };
        // Committed: the row owns the file from here on.
        self.details_for(pre_project).await
    }

    async fn create_inner(
        &self,
        owner: DbId,
        is_admin: bool,
        input: &CreatePreProject,
        student_ids: &[DbId],
        advisor_ids: &[DbId],
    ) -> Result<PreProject, LifecycleError> {
        let students = if is_admin {
            student_ids.to_vec()
        } else {
            with_owner(owner, student_ids)
        };

        validate_proposal(
            &ProposalDraft {
                name: &input.name,
                description: &input.description,
                year: input.year,
                season: &input.season,
                file: input.file.as_deref(),
                student_ids: &students,
                advisor_ids,
            },
            current_year(),
        )?;
        self.ensure_users_exist("students", &students).await?;
        self.ensure_users_exist("advisors", advisor_ids).await?;

        if !is_admin && PreProjectRepo::project_of_student(&self.pool, owner).await?.is_some() {
            return Err(LifecycleError::OwnerHasPreProject);
        }
        let conflicts = PreProjectRepo::students_with_project(&self.pool, &students, None).await?;
        if let Some(student) = conflicts.into_iter().next() {
            return Err(LifecycleError::StudentHasPreProject { name: student.name });
        }

        let mut tx = self.pool.begin().await?;
        let pre_project = PreProjectRepo::insert_tx(&mut tx, owner, input).await?;
        PreProjectRepo::replace_students_tx(&mut tx, pre_project.id, &students)
            .await
            .map_err(map_student_conflict)?;
        AdvisorResponseRepo::insert_pending_tx(&mut tx, pre_project.id, advisor_ids).await?;
        tx.commit().await.map_err(map_student_conflict)?;

        tracing::info!(
            pre_project_id = pre_project.id,
            owner,
            students = students.len(),
            advisors = advisor_ids.len(),
            "Pre-project created"
        );
        Ok(pre_project)
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    /// Partially update a pre-project under a row lock. Only the owner or an
    /// admin may do so.
    ///
    /// Omitted scalars, students, and advisors are left unchanged. An
    /// omitted discussant list clears the discussants. A changed advisor
    /// set replaces the response ledger and clears the acceptance.
    pub async fn update(
        &self,
        id: DbId,
        caller: Caller,
        input: &UpdatePreProject,
    ) -> Result<PreProjectDetails, LifecycleError> {
        let (updated, replaced_file) = match self.update_inner(id, caller, input).await {
            Ok(committed) => committed,
            Err(err) => {
                if let Some(file) = &input.file {
                    self.remove_file(file).await;
                }
                return Err(err);
            }
        };
        if let Some(old) = replaced_file {
            self.remove_file(&old).await;
        }
        self.details_for(updated).await
    }

    async fn update_inner(
        &self,
        id: DbId,
        caller: Caller,
        input: &UpdatePreProject,
    ) -> Result<(PreProject, Option<String>), LifecycleError> {
        validate_proposal_patch(
            &ProposalPatch {
                name: input.name.as_deref(),
                description: input.description.as_deref(),
                year: input.year,
                season: input.season.as_deref(),
                degree: input.degree,
                file: input.file.as_deref(),
                student_ids: None,
                advisor_ids: input.advisor_ids.as_deref(),
            },
            current_year(),
        )?;
        if let Some(discussants) = &input.discussant_ids {
            validate_discussants(discussants)?;
            self.ensure_users_exist("discussants", discussants).await?;
        }
        if let Some(advisors) = &input.advisor_ids {
            self.ensure_users_exist("advisors", advisors).await?;
        }
        if input.degree.is_some() && !caller.is_admin {
            return Err(LifecycleError::Forbidden(
                "Only an admin can set the degree".into(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let current = PreProjectRepo::find_for_update_tx(&mut tx, id)
            .await?
            .ok_or(LifecycleError::pre_project_not_found(id))?;

        if !caller.is_admin {
            if current.project_owner != caller.user_id {
                return Err(LifecycleError::Forbidden(
                    "Only the project owner or an admin can update this pre-project".into(),
                ));
            }
            if !current.can_update {
                return Err(LifecycleError::Locked);
            }
        }

        if let Some(requested) = &input.student_ids {
            let students = if caller.is_admin {
                requested.clone()
            } else {
                with_owner(current.project_owner, requested)
            };
            validate_proposal_patch(
                &ProposalPatch {
                    student_ids: Some(&students),
                    ..Default::default()
                },
                current_year(),
            )?;
            self.ensure_users_exist("students", &students).await?;

            let existing_students = PreProjectRepo::student_ids(&mut *tx, id).await?;
            let added = newly_added(&existing_students, &students);
            if !added.is_empty() {
                let conflicts =
                    PreProjectRepo::students_with_project(&mut *tx, &added, Some(id)).await?;
                if let Some(student) = conflicts.into_iter().next() {
                    return Err(LifecycleError::StudentHasPreProject { name: student.name });
                }
            }
            PreProjectRepo::replace_students_tx(&mut tx, id, &students)
                .await
                .map_err(map_student_conflict)?;
        }

        if let Some(advisors) = &input.advisor_ids {
            let existing = AdvisorResponseRepo::advisor_ids(&mut *tx, id).await?;
            if advisor_set_changed(&existing, advisors) {
                AdvisorResponseRepo::delete_all_tx(&mut tx, id).await?;
                AdvisorResponseRepo::insert_pending_tx(&mut tx, id, advisors).await?;
                PreProjectRepo::clear_accepted_advisor_tx(&mut tx, id).await?;
                tracing::info!(
                    pre_project_id = id,
                    previous_accepted = ?current.accepted_advisor,
                    "Advisor list replaced, arbitration reopened"
                );
            }
        }

        // Absent list clears discussants.
        let discussants = input.discussant_ids.as_deref().unwrap_or(&[]);
        PreProjectRepo::replace_discussants_tx(&mut tx, id, discussants).await?;

        let updated = PreProjectRepo::update_tx(&mut tx, id, input).await?;
        tx.commit().await.map_err(map_student_conflict)?;

        tracing::info!(pre_project_id = id, user_id = caller.user_id, "Pre-project updated");

        let replaced_file = match (&current.file, &input.file) {
            (Some(old), Some(new)) if old != new => Some(old.clone()),
            _ => None,
        };
        Ok((updated, replaced_file))
    }

    // -----------------------------------------------------------------------
    // Delete / admin toggles
    // -----------------------------------------------------------------------

    /// Delete a pre-project. Only the owner or an admin may do so. The
    /// attached file is removed after commit on a best-effort basis.
    pub async fn delete(
        &self,
        id: DbId,
        requester: DbId,
        is_admin: bool,
    ) -> Result<(), LifecycleError> {
        let mut tx = self.pool.begin().await?;
        let current = PreProjectRepo::find_for_update_tx(&mut tx, id)
            .await?
            .ok_or(LifecycleError::pre_project_not_found(id))?;

        if !is_admin && current.project_owner != requester {
            return Err(LifecycleError::Forbidden(
                "Unauthorized to delete this pre-project".into(),
            ));
        }

        PreProjectRepo::delete_tx(&mut tx, id).await?;
        tx.commit().await?;
        tracing::info!(pre_project_id = id, requester, "Pre-project deleted");

        if let Some(file) = &current.file {
            self.remove_file(file).await;
        }
        Ok(())
    }

    /// Open or close a pre-project for owner edits.
    pub async fn set_can_update(
        &self,
        id: DbId,
        can_update: bool,
    ) -> Result<PreProject, LifecycleError> {
        let mut tx = self.pool.begin().await?;
        PreProjectRepo::find_for_update_tx(&mut tx, id)
            .await?
            .ok_or(LifecycleError::pre_project_not_found(id))?;
        let updated = PreProjectRepo::set_can_update_tx(&mut tx, id, can_update).await?;
        tx.commit().await?;
        tracing::info!(pre_project_id = id, can_update, "Pre-project update flag changed");
        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub async fn get_details(&self, id: DbId) -> Result<PreProjectDetails, LifecycleError> {
        let pre_project = PreProjectRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or(LifecycleError::pre_project_not_found(id))?;
        self.details_for(pre_project).await
    }

    pub async fn list(&self, params: &ListQuery) -> Result<Page<PreProjectDetails>, LifecycleError> {
        let rows = PreProjectRepo::list(&self.pool, params).await?;
        let total = PreProjectRepo::count(&self.pool, params).await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(self.details_for(row).await?);
        }
        Ok(Page { items, total })
    }

    /// Pre-projects the user owns, advises, studies in, or discusses.
    pub async fn list_associated(
        &self,
        user_id: DbId,
    ) -> Result<Vec<PreProjectDetails>, LifecycleError> {
        let rows = PreProjectRepo::list_associated(&self.pool, user_id).await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(self.details_for(row).await?);
        }
        Ok(items)
    }

    async fn details_for(
        &self,
        pre_project: PreProject,
    ) -> Result<PreProjectDetails, LifecycleError> {
        let id = pre_project.id;
        let owner = UserRepo::find_summary(&self.pool, pre_project.project_owner).await?;
        let accepted_advisor_info = match pre_project.accepted_advisor {
            Some(advisor_id) => UserRepo::find_summary(&self.pool, advisor_id).await?,
            None => None,
        };
        let advisors = AdvisorResponseRepo::advisors_with_status(&self.pool, id).await?;
        let students = PreProjectRepo::students(&self.pool, id).await?;
        let discussants = PreProjectRepo::discussants(&self.pool, id).await?;
        Ok(PreProjectDetails {
            pre_project,
            owner,
            accepted_advisor_info,
            advisors,
            students,
            discussants,
        })
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn ensure_users_exist(&self, field: &str, ids: &[DbId]) -> Result<(), LifecycleError> {
        if ids.is_empty() {
            return Ok(());
        }
        let missing = UserRepo::missing_ids(&self.pool, ids).await?;
        if missing.is_empty() {
            return Ok(());
        }
        let listed = missing
            .iter()
            .map(DbId::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Err(LifecycleError::field(field, format!("Unknown user id(s): {listed}")))
    }

    async fn remove_file(&self, path: &str) {
        if let Err(e) = self.storage.delete(path).await {
            tracing::warn!(path, error = %e, "Failed to delete pre-project file");
        }
    }
}

/// Student list with the owner enrolled first if missing.
fn with_owner(owner: DbId, student_ids: &[DbId]) -> Vec<DbId> {
    let mut students = Vec::with_capacity(student_ids.len() + 1);
    if !student_ids.contains(&owner) {
        students.push(owner);
    }
    students.extend_from_slice(student_ids);
    students
}

fn current_year() -> i32 {
    chrono::Utc::now().year()
}
