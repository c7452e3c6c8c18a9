// services/contract_service.rs
use num_traits::ToPrimitive;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{contractdb::ContractExt, db::DBClient, userdb::UserExt},
    dtos::contractdtos::EditContractDto,
    models::{contractmodel::*, usermodel::*},
    service::{
        error::ServiceError, escrow_service::EscrowService,
        notification_service::NotificationService,
    },
    utils::currency::dollars_to_cents,
};

/// Owns the contract status state machine and the signing/editing invariants.
/// Every operation re-derives the actor's party from the persisted row; a
/// caller-supplied role is never trusted.
#[derive(Clone)]
pub struct ContractService {
    db_client: Arc<DBClient>,
    escrow_service: Arc<EscrowService>,
    notification_service: Arc<NotificationService>,
}

impl ContractService {
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

    async fn load_contract(&self, contract_id: Uuid) -> Result<Contract, ServiceError> {
        self.db_client
            .get_contract_by_id(contract_id)
            .await?
            .ok_or(ServiceError::ContractNotFound(contract_id))
    }

    pub async fn get_contract(
        &self,
        actor: &User,
        contract_id: Uuid,
    ) -> Result<(Contract, Vec<Milestone>), ServiceError> {
        let contract = self.load_contract(contract_id).await?;

        if contract.party_of(actor.id).is_none() && !actor.role.is_admin() {
            return Err(ServiceError::NotContractParty(actor.id, contract_id));
        }

        let milestones = self.db_client.get_contract_milestones(contract_id).await?;
        Ok((contract, milestones))
    }

    pub async fn get_contract_edits(
        &self,
        actor: &User,
        contract_id: Uuid,
    ) -> Result<Vec<ContractEdit>, ServiceError> {
        let contract = self.load_contract(contract_id).await?;

        if contract.party_of(actor.id).is_none() && !actor.role.is_admin() {
            return Err(ServiceError::NotContractParty(actor.id, contract_id));
        }

        Ok(self.db_client.get_contract_edits(contract_id).await?)
    }

    /// Record the actor's signature. The second signature atomically flips the
    /// contract to active in the same update as the timestamp; there is no
    /// intermediate single-signed-active state.
    pub async fn sign(&self, actor: &User, contract_id: Uuid) -> Result<Contract, ServiceError> {
        let contract = self.load_contract(contract_id).await?;

        let party = contract
            .party_of(actor.id)
            .ok_or(ServiceError::NotContractParty(actor.id, contract_id))?;

        let already_signed = match party {
            ContractParty::Client => contract.client_signed_at.is_some(),
            ContractParty::Freelancer => contract.freelancer_signed_at.is_some(),
        };
        if already_signed {
            return Err(ServiceError::AlreadyDone(
                "You have already signed this contract".to_string(),
            ));
        }

        if contract.status != ContractStatus::Pending {
            return Err(ServiceError::InvalidState(format!(
                "Contract cannot be signed while {}",
                contract.status.to_str()
            )));
        }

        let signed = match party {
            ContractParty::Client => self.db_client.record_client_signature(contract_id).await?,
            ContractParty::Freelancer => {
                self.db_client.record_freelancer_signature(contract_id).await?
            }
        };

        let signed = match signed {
            Some(contract) => contract,
            // Lost a race between the pre-check and the write; re-read to
            // classify the outcome
            None => {
                let current = self.load_contract(contract_id).await?;
                let now_signed = match party {
                    ContractParty::Client => current.client_signed_at.is_some(),
                    ContractParty::Freelancer => current.freelancer_signed_at.is_some(),
                };
                if now_signed {
                    return Err(ServiceError::AlreadyDone(
                        "You have already signed this contract".to_string(),
                    ));
                }
                return Err(ServiceError::InvalidState(format!(
                    "Contract cannot be signed while {}",
                    current.status.to_str()
                )));
            }
        };

        let counterparty = signed.counterparty_id(actor.id);
        if let Err(e) = self
            .notification_service
            .notify_contract_signed(counterparty, &signed, &actor.name)
            .await
        {
            tracing::warn!("Failed to record signature notification: {}", e);
        }

        if signed.status == ContractStatus::Active {
            if let Err(e) = self.notification_service.notify_contract_activated(&signed).await {
                tracing::warn!("Failed to record activation notification: {}", e);
            }
        }

        Ok(signed)
    }

    /// Edit the contract terms. Permitted only to the client and only while
    /// the freelancer has not signed, regardless of status. Appends an
    /// immutable before/after snapshot and notifies the freelancer.
    pub async fn edit(
        &self,
        actor: &User,
        contract_id: Uuid,
        changes: EditContractDto,
    ) -> Result<(Contract, Vec<Milestone>), ServiceError> {
        let contract = self.load_contract(contract_id).await?;

        let party = contract
            .party_of(actor.id)
            .ok_or(ServiceError::NotContractParty(actor.id, contract_id))?;
        if party != ContractParty::Client {
            return Err(ServiceError::Forbidden(
                "Only the client may edit a contract".to_string(),
            ));
        }

        if !contract.editable() {
            return Err(ServiceError::Forbidden(
                "Contract can no longer be edited once the freelancer has signed".to_string(),
            ));
        }

        let existing_milestones = self.db_client.get_contract_milestones(contract_id).await?;
        Self::validate_edit(&changes, &existing_milestones)?;

        let previous = Self::snapshot(&contract, &existing_milestones);
        let updated_snapshot = Self::snapshot_from_changes(&changes);

        let updated = self
            .db_client
            .edit_contract(contract_id, actor.id, &changes, previous, updated_snapshot)
            .await?;

        if let Err(e) = self
            .notification_service
            .notify_contract_edited(updated.freelancer_id, &updated)
            .await
        {
            tracing::warn!("Failed to record edit notification: {}", e);
        }

        let milestones = self.db_client.get_contract_milestones(contract_id).await?;
        Ok((updated, milestones))
    }

    fn validate_edit(
        changes: &EditContractDto,
        existing: &[Milestone],
    ) -> Result<(), ServiceError> {
        match changes.payment_type {
            PaymentType::Milestone => {
                if changes.milestones.is_empty() {
                    return Err(ServiceError::Validation(
                        "A milestone contract needs at least one milestone".to_string(),
                    ));
                }

                // Sum check on whole cents so float noise cannot sneak past
                let total_cents = dollars_to_cents(changes.total_amount);
                let sum_cents: i64 = changes
                    .milestones
                    .iter()
                    .map(|m| dollars_to_cents(m.amount))
                    .sum();
                if sum_cents != total_cents {
                    return Err(ServiceError::Validation(
                        "Milestone amounts must sum to the contract total".to_string(),
                    ));
                }
            }
            PaymentType::Fixed => {
                if !changes.milestones.is_empty() {
                    return Err(ServiceError::Validation(
                        "A fixed-price contract cannot carry milestones".to_string(),
                    ));
                }
            }
        }

        // Every id named in the payload must belong to this contract
        for milestone in &changes.milestones {
            if let Some(id) = milestone.id {
                if !existing.iter().any(|m| m.id == id) {
                    return Err(ServiceError::Validation(format!(
                        "Milestone {} does not belong to this contract",
                        id
                    )));
                }
            }
        }

        Ok(())
    }

    fn snapshot(contract: &Contract, milestones: &[Milestone]) -> serde_json::Value {
        json!({
            "title": contract.title,
            "description": contract.description,
            "total_amount": contract.total_amount.to_f64().unwrap_or(0.0),
            "payment_type": contract.payment_type.to_str(),
            "deadline": contract.deadline,
            "milestones": milestones.iter().map(|m| json!({
                "id": m.id,
                "title": m.title,
                "amount": m.amount.to_f64().unwrap_or(0.0),
                "deadline": m.deadline,
            })).collect::<Vec<_>>(),
        })
    }

    fn snapshot_from_changes(changes: &EditContractDto) -> serde_json::Value {
        json!({
            "title": changes.title,
            "description": changes.description,
            "total_amount": changes.total_amount,
            "payment_type": changes.payment_type.to_str(),
            "deadline": changes.deadline,
            "milestones": changes.milestones.iter().map(|m| json!({
                "id": m.id,
                "title": m.title,
                "amount": m.amount,
                "deadline": m.deadline,
            })).collect::<Vec<_>>(),
        })
    }

    /// Client starts funding the escrow. Returns the processor's payment
    /// intent id; the deposit lands on the ledger when the processor confirms
    /// it asynchronously.
    pub async fn fund_escrow(
        &self,
        actor: &User,
        contract_id: Uuid,
    ) -> Result<String, ServiceError> {
        let contract = self.load_contract(contract_id).await?;

        let party = contract
            .party_of(actor.id)
            .ok_or(ServiceError::NotContractParty(actor.id, contract_id))?;
        if party != ContractParty::Client {
            return Err(ServiceError::Forbidden(
                "Only the client may fund the escrow".to_string(),
            ));
        }

        if contract.escrow_funded_at.is_some() {
            return Err(ServiceError::AlreadyDone(
                "Escrow is already funded for this contract".to_string(),
            ));
        }

        if !matches!(
            contract.status,
            ContractStatus::Pending | ContractStatus::Active
        ) {
            return Err(ServiceError::InvalidState(format!(
                "Escrow cannot be funded while {}",
                contract.status.to_str()
            )));
        }

        self.escrow_service.initiate_deposit(&contract).await
    }

    /// Freelancer submits the whole contract for completion (fixed-price
    /// contracts; milestone contracts complete through their milestones).
    pub async fn submit_completion(
        &self,
        actor: &User,
        contract_id: Uuid,
        completion_note: Option<String>,
    ) -> Result<Contract, ServiceError> {
        let contract = self.load_contract(contract_id).await?;

        let party = contract
            .party_of(actor.id)
            .ok_or(ServiceError::NotContractParty(actor.id, contract_id))?;
        if party != ContractParty::Freelancer {
            return Err(ServiceError::Forbidden(
                "Only the freelancer may submit the contract for completion".to_string(),
            ));
        }

        if contract.payment_type != PaymentType::Fixed {
            return Err(ServiceError::InvalidState(
                "Milestone contracts complete through their milestones".to_string(),
            ));
        }

        if contract.status != ContractStatus::Active {
            return Err(ServiceError::InvalidState(format!(
                "Completion cannot be requested while {}",
                contract.status.to_str()
            )));
        }

        let updated = self
            .db_client
            .submit_contract_completion(contract_id, completion_note)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidState(
                    "Completion cannot be requested in the contract's current state".to_string(),
                )
            })?;

        if let Err(e) = self
            .notification_service
            .notify_completion_submitted(&updated)
            .await
        {
            tracing::warn!("Failed to record completion notification: {}", e);
        }

        Ok(updated)
    }

    /// Client approves a pending completion; the remaining escrow is released
    /// to the freelancer minus the platform fee.
    pub async fn approve_completion(
        &self,
        actor: &User,
        contract_id: Uuid,
    ) -> Result<Contract, ServiceError> {
        let contract = self.load_contract(contract_id).await?;

        let party = contract
            .party_of(actor.id)
            .ok_or(ServiceError::NotContractParty(actor.id, contract_id))?;
        if party != ContractParty::Client {
            return Err(ServiceError::Forbidden(
                "Only the client may approve completion".to_string(),
            ));
        }

        if contract.status != ContractStatus::PendingCompletion {
            return Err(ServiceError::InvalidState(format!(
                "Completion cannot be approved while {}",
                contract.status.to_str()
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
        let amount = contract.total_amount.to_f64().unwrap_or(0.0);
        self.escrow_service
            .initiate_contract_payout(&contract, &freelancer, amount)
            .await?;

        let completed = self
            .db_client
            .approve_contract_completion(contract_id)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidState(
                    "Completion cannot be approved in the contract's current state".to_string(),
                )
            })?;

        if let Err(e) = self
            .notification_service
            .notify_contract_completed(&completed)
            .await
        {
            tracing::warn!("Failed to record completion notification: {}", e);
        }

        Ok(completed)
    }

    /// Administrative cancellation. Terminal; super_admin only.
    pub async fn cancel(
        &self,
        actor: &User,
        contract_id: Uuid,
        reason: String,
    ) -> Result<Contract, ServiceError> {
        if actor.role != UserRole::SuperAdmin {
            return Err(ServiceError::Forbidden(
                "Only a super admin may cancel a contract".to_string(),
            ));
        }

        let contract = self.load_contract(contract_id).await?;

        if contract.status == ContractStatus::Cancelled {
            return Err(ServiceError::AlreadyDone(
                "Contract is already cancelled".to_string(),
            ));
        }

        if !matches!(
            contract.status,
            ContractStatus::Pending | ContractStatus::Active
        ) {
            return Err(ServiceError::InvalidState(format!(
                "Contract cannot be cancelled while {}",
                contract.status.to_str()
            )));
        }

        let cancelled = self
            .db_client
            .cancel_contract(contract_id, reason.clone())
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidState(
                    "Contract cannot be cancelled in its current state".to_string(),
                )
            })?;

        if let Err(e) = self
            .notification_service
            .notify_contract_cancelled(&cancelled, &reason)
            .await
        {
            tracing::warn!("Failed to record cancellation notification: {}", e);
        }

        Ok(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtos::contractdtos::MilestoneInputDto;

    fn edit_dto(total: f64, amounts: &[f64]) -> EditContractDto {
        EditContractDto {
            title: "Site redesign".to_string(),
            description: "Full redesign of the marketing site with new branding".to_string(),
            total_amount: total,
            payment_type: if amounts.is_empty() {
                PaymentType::Fixed
            } else {
                PaymentType::Milestone
            },
            deadline: None,
            milestones: amounts
                .iter()
                .map(|amount| MilestoneInputDto {
                    id: None,
                    title: "Milestone".to_string(),
                    amount: *amount,
                    deadline: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_milestone_sum_must_match_total() {
        let ok = ContractService::validate_edit(&edit_dto(1000.0, &[400.0, 600.0]), &[]);
        assert!(ok.is_ok());

        let short = ContractService::validate_edit(&edit_dto(1000.0, &[400.0, 500.0]), &[]);
        assert!(matches!(short, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn test_sum_check_is_exact_on_cents() {
        // 0.1 + 0.2 style float noise must not pass
        let ok = ContractService::validate_edit(&edit_dto(0.3, &[0.1, 0.2]), &[]);
        assert!(ok.is_ok());

        let off_by_a_cent = ContractService::validate_edit(&edit_dto(0.3, &[0.1, 0.21]), &[]);
        assert!(off_by_a_cent.is_err());
    }

    #[test]
    fn test_milestone_contract_requires_milestones() {
        let mut dto = edit_dto(1000.0, &[]);
        dto.payment_type = PaymentType::Milestone;
        assert!(ContractService::validate_edit(&dto, &[]).is_err());
    }

    #[test]
    fn test_fixed_contract_rejects_milestones() {
        let mut dto = edit_dto(1000.0, &[1000.0]);
        dto.payment_type = PaymentType::Fixed;
        assert!(ContractService::validate_edit(&dto, &[]).is_err());
    }

    #[test]
    fn test_unknown_milestone_id_rejected() {
        let mut dto = edit_dto(1000.0, &[1000.0]);
        dto.milestones[0].id = Some(Uuid::new_v4());
        let result = ContractService::validate_edit(&dto, &[]);
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }
}
