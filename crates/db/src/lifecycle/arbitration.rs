//! Advisor response arbitration.
//!
//! Any number of invited advisors may respond concurrently; at most one
//! acceptance wins. The winner is decided by the conditional update in
//! [`PreProjectRepo::claim_acceptance_tx`], and the winner's ledger row plus
//! the rejection of every other row commit in the same transaction.

use gradhub_core::pre_project::{arbitrate, ResponseOutcome, ResponseStatus};
use gradhub_core::types::DbId;

use super::error::LifecycleError;
use super::PreProjectLifecycle;
use crate::models::pre_project::AdvisorResponse;
use crate::repositories::{AdvisorResponseRepo, PreProjectRepo};

const NOT_INVITED: &str = "You are not an advisor of this pre-project";

impl PreProjectLifecycle {
    /// Record an advisor's response (`pending`, `accepted`, or `rejected`).
    pub async fn respond(
        &self,
        pre_project_id: DbId,
        advisor_id: DbId,
        status: &str,
    ) -> Result<AdvisorResponse, LifecycleError> {
        let status: ResponseStatus = status
            .parse()
            .map_err(|msg: String| LifecycleError::field("status", msg))?;

        let project = PreProjectRepo::find_by_id(&self.pool, pre_project_id)
            .await?
            .ok_or(LifecycleError::pre_project_not_found(pre_project_id))?;

        let invited = AdvisorResponseRepo::advisor_ids(&self.pool, pre_project_id).await?;
        if !invited.contains(&advisor_id) {
            return Err(LifecycleError::field("advisor_id", NOT_INVITED));
        }

        match arbitrate(project.accepted_advisor, advisor_id, status) {
            ResponseOutcome::AlreadyAccepted => Err(LifecycleError::AlreadyAccepted),
            ResponseOutcome::AcceptedByOther => Err(LifecycleError::AcceptedByOther),
            ResponseOutcome::Record(status) => {
                self.record_response(pre_project_id, advisor_id, status).await
            }
            ResponseOutcome::Accept => self.accept(pre_project_id, advisor_id).await,
        }
    }

    /// Write a non-winning status. The share lock keeps a concurrent claim
    /// from slipping in between the pointer check and the write.
    async fn record_response(
        &self,
        pre_project_id: DbId,
        advisor_id: DbId,
        status: ResponseStatus,
    ) -> Result<AdvisorResponse, LifecycleError> {
        let mut tx = self.pool.begin().await?;

        let holder = PreProjectRepo::accepted_advisor_shared_tx(&mut tx, pre_project_id)
            .await?
            .ok_or(LifecycleError::pre_project_not_found(pre_project_id))?;
        if holder == Some(advisor_id) {
            return Err(LifecycleError::AlreadyAccepted);
        }
        if AdvisorResponseRepo::find(&mut *tx, pre_project_id, advisor_id)
            .await?
            .is_none()
        {
            return Err(LifecycleError::field("advisor_id", NOT_INVITED));
        }

        let row = AdvisorResponseRepo::upsert_tx(&mut tx, pre_project_id, advisor_id, status).await?;
        tx.commit().await?;

        tracing::debug!(pre_project_id, advisor_id, status = %status, "Advisor response recorded");
        Ok(row)
    }

    async fn accept(
        &self,
        pre_project_id: DbId,
        advisor_id: DbId,
    ) -> Result<AdvisorResponse, LifecycleError> {
        let mut tx = self.pool.begin().await?;

        match PreProjectRepo::accepted_advisor_tx(&mut tx, pre_project_id).await? {
            None => return Err(LifecycleError::pre_project_not_found(pre_project_id)),
            Some(Some(holder)) if holder == advisor_id => {
                return Err(LifecycleError::AlreadyAccepted)
            }
            Some(Some(_)) => return Err(LifecycleError::AcceptedByOther),
            Some(None) => {}
        }

        if !PreProjectRepo::claim_acceptance_tx(&mut tx, pre_project_id, advisor_id).await? {
            tracing::info!(pre_project_id, advisor_id, "Acceptance lost to another advisor");
            return Err(LifecycleError::AcceptedByOther);
        }

        // The advisor list may have been replaced while we waited on the row lock.
        if AdvisorResponseRepo::find(&mut *tx, pre_project_id, advisor_id)
            .await?
            .is_none()
        {
            return Err(LifecycleError::field("advisor_id", NOT_INVITED));
        }

        let row = AdvisorResponseRepo::upsert_tx(
            &mut tx,
            pre_project_id,
            advisor_id,
            ResponseStatus::Accepted,
        )
        .await?;
        let rejected = AdvisorResponseRepo::reject_others_tx(&mut tx, pre_project_id, advisor_id).await?;
        tx.commit().await?;

        tracing::info!(pre_project_id, advisor_id, rejected, "Pre-project accepted");
        Ok(row)
    }

    /// Reopen arbitration: drop every response and clear the acceptance.
    /// Idempotent.
    pub async fn reset_advisors(&self, pre_project_id: DbId) -> Result<(), LifecycleError> {
        let mut tx = self.pool.begin().await?;
        PreProjectRepo::find_for_update_tx(&mut tx, pre_project_id)
            .await?
            .ok_or(LifecycleError::pre_project_not_found(pre_project_id))?;

        let removed = AdvisorResponseRepo::delete_all_tx(&mut tx, pre_project_id).await?;
        PreProjectRepo::clear_accepted_advisor_tx(&mut tx, pre_project_id).await?;
        tx.commit().await?;

        tracing::info!(pre_project_id, removed, "Advisor responses reset");
        Ok(())
    }
}
