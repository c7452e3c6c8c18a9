// services/milestone_service.rs
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{contractdb::ContractExt, db::DBClient, userdb::UserExt},
    models::contractmodel::*,
    models::usermodel::User,
    service::{
        error::ServiceError, escrow_service::EscrowService,
        notification_service::NotificationService,
    },
};

/// Per-milestone state machine: submit (freelancer), approve/reject (client),
/// release (system only, driven by confirmed transfer events).
#[derive(Clone)]
pub struct MilestoneService {
    db_client: Arc<DBClient>,
    escrow_service: Arc<EscrowService>,
    notification_service: Arc<NotificationService>,
}

impl MilestoneService {
    pub fn new(
        db_client: Arc<DBClient>,
        escrow_service: Arc<EscrowService>,
        notification_service: Arc<NotificationService>,
    ) -> Self {
        Self {
            db_client,
            escrow_service,
            notification_service,
        }
    }

    async fn load(&self, milestone_id: Uuid) -> Result<(Milestone, Contract), ServiceError> {
        let milestone = self
            .db_client
            .get_milestone_by_id(milestone_id)
            .await?
            .ok_or(ServiceError::MilestoneNotFound(milestone_id))?;

        let contract = self
            .db_client
            .get_contract_by_id(milestone.contract_id)
            .await?
            .ok_or(ServiceError::ContractNotFound(milestone.contract_id))?;

        Ok((milestone, contract))
    }

    /// Freelancer submits (or resubmits) work for review.
    pub async fn submit(
        &self,
        actor: &User,
        milestone_id: Uuid,
        submission_note: String,
    ) -> Result<Milestone, ServiceError> {
        let (milestone, contract) = self.load(milestone_id).await?;

        let party = contract
            .party_of(actor.id)
            .ok_or(ServiceError::NotContractParty(actor.id, contract.id))?;
        if party != ContractParty::Freelancer {
            return Err(ServiceError::Forbidden(
                "Only the freelancer may submit a milestone".to_string(),
            ));
        }

        if contract.status != ContractStatus::Active {
            return Err(ServiceError::InvalidState(format!(
                "Milestones cannot be submitted while the contract is {}",
                contract.status.to_str()
            )));
        }

        if !milestone.status.can_submit() {
            return Err(ServiceError::InvalidState(format!(
                "Milestone cannot be submitted from {}",
                milestone.status.to_str()
            )));
        }

        let submitted = self
            .db_client
            .submit_milestone(milestone_id, submission_note)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidState(
                    "Milestone cannot be submitted in its current state".to_string(),
                )
            })?;

        if let Err(e) = self
            .notification_service
            .notify_milestone_submitted(&contract, &submitted)
            .await
        {
            tracing::warn!("Failed to record submission notification: {}", e);
        }

        Ok(submitted)
    }

    /// Client approves submitted work, which kicks off the payout transfer
    /// (amount minus platform fee). The milestone moves to released when the
    /// processor confirms the transfer.
    pub async fn approve(
        &self,
        actor: &User,
        milestone_id: Uuid,
    ) -> Result<Milestone, ServiceError> {
        let (milestone, contract) = self.load(milestone_id).await?;

        let party = contract
            .party_of(actor.id)
            .ok_or(ServiceError::NotContractParty(actor.id, contract.id))?;
        if party != ContractParty::Client {
            return Err(ServiceError::Forbidden(
                "Only the client may approve a milestone".to_string(),
            ));
        }

        if milestone.status != MilestoneStatus::Submitted {
            return Err(ServiceError::InvalidState(format!(
                "Milestone cannot be approved from {}",
                milestone.status.to_str()
            )));
        }

        let freelancer = self
            .db_client
            .get_user(Some(contract.freelancer_id), None, None)
            .await?
            .ok_or_else(|| {
                ServiceError::Validation("Freelancer account no longer exists".to_string())
            })?;

        // Provider call first: an external failure must leave no local change
        self.escrow_service
            .initiate_milestone_payout(&contract, &milestone, &freelancer)
            .await?;

        let approved = self
            .db_client
            .approve_milestone(milestone_id)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidState(
                    "Milestone cannot be approved in its current state".to_string(),
                )
            })?;

        if let Err(e) = self
            .notification_service
            .notify_milestone_approved(&contract, &approved)
            .await
        {
            tracing::warn!("Failed to record approval notification: {}", e);
        }

        Ok(approved)
    }

    /// Client sends submitted work back; the freelancer may resubmit.
    pub async fn reject(
        &self,
        actor: &User,
        milestone_id: Uuid,
        feedback: Option<String>,
    ) -> Result<Milestone, ServiceError> {
        let (milestone, contract) = self.load(milestone_id).await?;

        let party = contract
            .party_of(actor.id)
            .ok_or(ServiceError::NotContractParty(actor.id, contract.id))?;
        if party != ContractParty::Client {
            return Err(ServiceError::Forbidden(
                "Only the client may reject a milestone".to_string(),
            ));
        }

        if milestone.status != MilestoneStatus::Submitted {
            return Err(ServiceError::InvalidState(format!(
                "Milestone cannot be rejected from {}",
                milestone.status.to_str()
            )));
        }

        let rejected = self
            .db_client
            .reject_milestone(milestone_id)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidState(
                    "Milestone cannot be rejected in its current state".to_string(),
                )
            })?;

        if let Err(e) = self
            .notification_service
            .notify_milestone_rejected(&contract, &rejected, feedback.as_deref())
            .await
        {
            tracing::warn!("Failed to record rejection notification: {}", e);
        }

        Ok(rejected)
    }
}
