// services/dispute_service.rs
use num_traits::ToPrimitive;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{contractdb::ContractExt, db::DBClient, disputedb::DisputeExt, userdb::UserExt},
    dtos::disputedtos::{OpenDisputeDto, ResolveDisputeDto},
    models::{contractmodel::*, disputemodel::*, usermodel::User},
    service::{
        error::ServiceError, escrow_service::EscrowService,
        notification_service::NotificationService,
    },
    utils::currency::dollars_to_cents,
};

/// Opens disputes against a contract, freezes the normal lifecycle behind a
/// monitoring flag, and on admin resolution drives one of three terminal
/// outcomes: full refund, payment released, or a partial split supplied by
/// the resolver.
#[derive(Clone)]
pub struct DisputeService {
    db_client: Arc<DBClient>,
    escrow_service: Arc<EscrowService>,
    notification_service: Arc<NotificationService>,
}

impl DisputeService {
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

    pub async fn get_dispute(
        &self,
        actor: &User,
        dispute_id: Uuid,
    ) -> Result<Dispute, ServiceError> {
        let dispute = self
            .db_client
            .get_dispute_by_id(dispute_id)
            .await?
            .ok_or(ServiceError::DisputeNotFound(dispute_id))?;

        let contract = self
            .db_client
            .get_contract_by_id(dispute.contract_id)
            .await?
            .ok_or(ServiceError::ContractNotFound(dispute.contract_id))?;

        if contract.party_of(actor.id).is_none() && !actor.role.is_admin() {
            return Err(ServiceError::NotContractParty(actor.id, contract.id));
        }

        Ok(dispute)
    }

    /// Either contract party may open a dispute while the contract is not
    /// cancelled. A high-severity monitoring flag is raised automatically.
    pub async fn open_dispute(
        &self,
        actor: &User,
        contract_id: Uuid,
        body: OpenDisputeDto,
    ) -> Result<Dispute, ServiceError> {
        let contract = self
            .db_client
            .get_contract_by_id(contract_id)
            .await?
            .ok_or(ServiceError::ContractNotFound(contract_id))?;

        contract
            .party_of(actor.id)
            .ok_or(ServiceError::NotContractParty(actor.id, contract_id))?;

        if contract.status == ContractStatus::Cancelled {
            return Err(ServiceError::InvalidState(
                "Disputes cannot be opened on a cancelled contract".to_string(),
            ));
        }

        // One live dispute per contract
        if self
            .db_client
            .get_open_dispute_for_contract(contract_id)
            .await?
            .is_some()
        {
            return Err(ServiceError::AlreadyDone(
                "This contract already has an open dispute".to_string(),
            ));
        }

        let evidence = body.evidence.map(|urls| json!(urls));

        let dispute = self
            .db_client
            .create_dispute(
                contract_id,
                actor.id,
                body.dispute_type,
                body.reason,
                evidence,
                body.amount_disputed,
            )
            .await?;

        self.db_client
            .create_monitoring_flag(contract_id, dispute.id)
            .await?;

        tracing::info!(
            "Dispute {} opened on contract {} by {}",
            dispute.id,
            contract_id,
            actor.id
        );

        let counterparty = contract.counterparty_id(actor.id);
        if let Err(e) = self
            .notification_service
            .notify_dispute_opened(counterparty, &contract, &dispute)
            .await
        {
            tracing::warn!("Failed to record dispute notification: {}", e);
        }

        Ok(dispute)
    }

    /// Admin-only resolution. Money movements go through the payment provider
    /// first; an external failure leaves the dispute open and untouched.
    pub async fn resolve_dispute(
        &self,
        actor: &User,
        dispute_id: Uuid,
        body: ResolveDisputeDto,
    ) -> Result<Dispute, ServiceError> {
        if !actor.role.is_admin() {
            return Err(ServiceError::Forbidden(
                "Only an admin may resolve a dispute".to_string(),
            ));
        }

        let dispute = self
            .db_client
            .get_dispute_by_id(dispute_id)
            .await?
            .ok_or(ServiceError::DisputeNotFound(dispute_id))?;

        if dispute.status != DisputeStatus::Open {
            return Err(ServiceError::InvalidState(
                "Dispute has already been resolved".to_string(),
            ));
        }

        let contract = self
            .db_client
            .get_contract_by_id(dispute.contract_id)
            .await?
            .ok_or(ServiceError::ContractNotFound(dispute.contract_id))?;

        let mut resolution_details = body.resolution_details.clone();

        match body.resolution_type {
            ResolutionType::FullRefund => {
                self.escrow_service.initiate_refund(&contract, None).await?;

                let reason = format!("Dispute {} resolved: full refund to client", dispute.id);
                if self
                    .db_client
                    .cancel_contract(contract.id, reason)
                    .await?
                    .is_none()
                {
                    tracing::warn!(
                        "Contract {} was already terminal during dispute resolution",
                        contract.id
                    );
                }
            }
            ResolutionType::PaymentReleased => {
                self.release_all_delivered(&contract).await?;
            }
            ResolutionType::PartialRefund => {
                let total = contract.total_amount.to_f64().unwrap_or(0.0);
                let refund_amount = Self::validate_partial_refund(body.refund_amount, total)?;

                self.escrow_service
                    .initiate_refund(&contract, Some(dollars_to_cents(refund_amount)))
                    .await?;

                let remainder = total - refund_amount;
                let freelancer = self.load_freelancer(&contract).await?;
                self.escrow_service
                    .initiate_contract_payout(&contract, &freelancer, remainder)
                    .await?;

                let split_note = format!(
                    "Refunded {:.2} to client, released {:.2} to freelancer",
                    refund_amount, remainder
                );
                resolution_details = Some(match resolution_details {
                    Some(details) => format!("{} ({})", details, split_note),
                    None => split_note,
                });
            }
        }

        let resolved = self
            .db_client
            .resolve_dispute(
                dispute_id,
                actor.id,
                body.resolution_type,
                resolution_details,
                body.refund_amount,
            )
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidState("Dispute has already been resolved".to_string())
            })?;

        self.db_client
            .close_monitoring_flag_for_dispute(dispute_id)
            .await?;

        tracing::info!(
            "Dispute {} resolved by {} as {}",
            dispute_id,
            actor.id,
            body.resolution_type.to_str()
        );

        if let Err(e) = self
            .notification_service
            .notify_dispute_resolved(&contract, &resolved)
            .await
        {
            tracing::warn!("Failed to record resolution notification: {}", e);
        }

        Ok(resolved)
    }

    /// The partial split is resolver input, never computed here: the amount
    /// must be present and strictly inside the contract total.
    fn validate_partial_refund(
        refund_amount: Option<f64>,
        total: f64,
    ) -> Result<f64, ServiceError> {
        let refund_amount = refund_amount.ok_or_else(|| {
            ServiceError::Validation("A partial refund requires refund_amount".to_string())
        })?;

        if refund_amount <= 0.0 || refund_amount >= total {
            return Err(ServiceError::Validation(
                "Refund amount must be between zero and the contract total".to_string(),
            ));
        }

        Ok(refund_amount)
    }

    async fn load_freelancer(&self, contract: &Contract) -> Result<User, ServiceError> {
        self.db_client
            .get_user(Some(contract.freelancer_id), None, None)
            .await?
            .ok_or_else(|| {
                ServiceError::Validation("Freelancer account no longer exists".to_string())
            })
    }

    /// payment_released outcome: everything the freelancer has delivered is
    /// force-approved and paid out.
    async fn release_all_delivered(&self, contract: &Contract) -> Result<(), ServiceError> {
        let freelancer = self.load_freelancer(contract).await?;

        match contract.payment_type {
            PaymentType::Milestone => {
                let delivered = self.db_client.get_delivered_milestones(contract.id).await?;

                for milestone in delivered {
                    if milestone.status == MilestoneStatus::Submitted {
                        self.db_client.approve_milestone(milestone.id).await?;
                    }

                    self.escrow_service
                        .initiate_milestone_payout(contract, &milestone, &freelancer)
                        .await?;

                    // Force-released at resolution time rather than waiting
                    // for the transfer confirmation
                    self.db_client.release_milestone(milestone.id).await?;

                    if let Err(e) = self
                        .notification_service
                        .notify_milestone_released(contract, &milestone)
                        .await
                    {
                        tracing::warn!("Failed to record release notification: {}", e);
                    }
                }

                self.escrow_service.complete_if_fully_released(contract).await?;
            }
            PaymentType::Fixed => {
                let amount = contract.total_amount.to_f64().unwrap_or(0.0);
                self.escrow_service
                    .initiate_contract_payout(contract, &freelancer, amount)
                    .await?;

                // Close out the contract whichever completion path it was on
                let completed = match contract.status {
                    ContractStatus::PendingCompletion => {
                        self.db_client.approve_contract_completion(contract.id).await?
                    }
                    _ => self.db_client.complete_contract(contract.id).await?,
                };

                if let Some(completed) = completed {
                    if let Err(e) = self
                        .notification_service
                        .notify_contract_completed(&completed)
                        .await
                    {
                        tracing::warn!("Failed to record completion notification: {}", e);
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_refund_requires_amount() {
        let result = DisputeService::validate_partial_refund(None, 1000.0);
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn test_partial_refund_must_be_inside_total() {
        assert!(DisputeService::validate_partial_refund(Some(0.0), 1000.0).is_err());
        assert!(DisputeService::validate_partial_refund(Some(-5.0), 1000.0).is_err());
        assert!(DisputeService::validate_partial_refund(Some(1000.0), 1000.0).is_err());
        assert!(DisputeService::validate_partial_refund(Some(1500.0), 1000.0).is_err());
        assert_eq!(
            DisputeService::validate_partial_refund(Some(400.0), 1000.0).unwrap(),
            400.0
        );
    }

    #[test]
    fn test_resolution_type_labels() {
        assert_eq!(ResolutionType::FullRefund.to_str(), "full_refund");
        assert_eq!(ResolutionType::PaymentReleased.to_str(), "payment_released");
        assert_eq!(ResolutionType::PartialRefund.to_str(), "partial_refund");
    }
}
