// services/notification_service.rs
use num_traits::ToPrimitive;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, notificationdb::NotificationExt},
    models::{contractmodel::*, disputemodel::Dispute},
    service::error::ServiceError,
};

/// Persists lifecycle events for user-facing display. All notify_* calls are
/// fire-and-forget from the caller's point of view: a failed insert is logged
/// and must never roll back the state change that triggered it.
#[derive(Debug, Clone)]
pub struct NotificationService {
    db_client: Arc<DBClient>,
}

impl NotificationService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    async fn store_notification(
        &self,
        user_id: Uuid,
        notif_type: &str,
        title: &str,
        message: &str,
        link: Option<String>,
    ) -> Result<(), ServiceError> {
        self.db_client
            .create_notification(user_id, notif_type, title, message, link)
            .await
            .map_err(|e| ServiceError::Notification(e.to_string()))?;

        Ok(())
    }

    fn contract_link(contract_id: Uuid) -> Option<String> {
        Some(format!("/contracts/{}", contract_id))
    }

    pub async fn notify_contract_signed(
        &self,
        user_id: Uuid,
        contract: &Contract,
        signer_name: &str,
    ) -> Result<(), ServiceError> {
        tracing::info!(
            "Contract {} signed, notifying counter-party {}",
            contract.id,
            user_id
        );

        self.store_notification(
            user_id,
            "contract_signed",
            "Contract signed",
            &format!("{} signed the contract \"{}\"", signer_name, contract.title),
            Self::contract_link(contract.id),
        )
        .await
    }

    pub async fn notify_contract_activated(
        &self,
        contract: &Contract,
    ) -> Result<(), ServiceError> {
        tracing::info!("Contract {} is now active", contract.id);

        for user_id in [contract.client_id, contract.freelancer_id] {
            self.store_notification(
                user_id,
                "contract_active",
                "Contract active",
                &format!(
                    "Both parties have signed \"{}\". Work can begin.",
                    contract.title
                ),
                Self::contract_link(contract.id),
            )
            .await?;
        }

        Ok(())
    }

    pub async fn notify_contract_edited(
        &self,
        user_id: Uuid,
        contract: &Contract,
    ) -> Result<(), ServiceError> {
        self.store_notification(
            user_id,
            "contract_edited",
            "Contract updated",
            &format!(
                "The terms of \"{}\" were changed. Review them before signing.",
                contract.title
            ),
            Self::contract_link(contract.id),
        )
        .await
    }

    pub async fn notify_completion_submitted(
        &self,
        contract: &Contract,
    ) -> Result<(), ServiceError> {
        self.store_notification(
            contract.client_id,
            "completion_submitted",
            "Completion requested",
            &format!(
                "The freelancer marked \"{}\" as complete. Review and approve to release payment.",
                contract.title
            ),
            Self::contract_link(contract.id),
        )
        .await
    }

    pub async fn notify_contract_completed(
        &self,
        contract: &Contract,
    ) -> Result<(), ServiceError> {
        tracing::info!("Contract {} completed", contract.id);

        for user_id in [contract.client_id, contract.freelancer_id] {
            self.store_notification(
                user_id,
                "contract_completed",
                "Contract completed",
                &format!("\"{}\" is complete.", contract.title),
                Self::contract_link(contract.id),
            )
            .await?;
        }

        Ok(())
    }

    pub async fn notify_contract_cancelled(
        &self,
        contract: &Contract,
        reason: &str,
    ) -> Result<(), ServiceError> {
        tracing::info!("Contract {} cancelled: {}", contract.id, reason);

        for user_id in [contract.client_id, contract.freelancer_id] {
            self.store_notification(
                user_id,
                "contract_cancelled",
                "Contract cancelled",
                &format!("\"{}\" was cancelled: {}", contract.title, reason),
                Self::contract_link(contract.id),
            )
            .await?;
        }

        Ok(())
    }

    pub async fn notify_milestone_submitted(
        &self,
        contract: &Contract,
        milestone: &Milestone,
    ) -> Result<(), ServiceError> {
        self.store_notification(
            contract.client_id,
            "milestone_submitted",
            "Milestone submitted",
            &format!(
                "\"{}\" was submitted for review on contract \"{}\"",
                milestone.title, contract.title
            ),
            Self::contract_link(contract.id),
        )
        .await
    }

    pub async fn notify_milestone_approved(
        &self,
        contract: &Contract,
        milestone: &Milestone,
    ) -> Result<(), ServiceError> {
        self.store_notification(
            contract.freelancer_id,
            "milestone_approved",
            "Milestone approved",
            &format!(
                "\"{}\" was approved. Your payout is on the way.",
                milestone.title
            ),
            Self::contract_link(contract.id),
        )
        .await
    }

    pub async fn notify_milestone_rejected(
        &self,
        contract: &Contract,
        milestone: &Milestone,
        feedback: Option<&str>,
    ) -> Result<(), ServiceError> {
        let message = match feedback {
            Some(feedback) => format!(
                "\"{}\" was sent back for changes: {}",
                milestone.title, feedback
            ),
            None => format!("\"{}\" was sent back for changes.", milestone.title),
        };

        self.store_notification(
            contract.freelancer_id,
            "milestone_rejected",
            "Milestone needs changes",
            &message,
            Self::contract_link(contract.id),
        )
        .await
    }

    pub async fn notify_milestone_released(
        &self,
        contract: &Contract,
        milestone: &Milestone,
    ) -> Result<(), ServiceError> {
        tracing::info!(
            "Milestone {} released on contract {}",
            milestone.id,
            contract.id
        );

        self.store_notification(
            contract.freelancer_id,
            "milestone_released",
            "Payment released",
            &format!(
                "Payment of ${:.2} for \"{}\" was released to your account",
                milestone.amount.to_f64().unwrap_or(0.0),
                milestone.title
            ),
            Self::contract_link(contract.id),
        )
        .await
    }

    pub async fn notify_escrow_funded(&self, contract: &Contract) -> Result<(), ServiceError> {
        self.store_notification(
            contract.freelancer_id,
            "escrow_funded",
            "Escrow funded",
            &format!(
                "The client funded the escrow for \"{}\". Work is safe to start.",
                contract.title
            ),
            Self::contract_link(contract.id),
        )
        .await
    }

    pub async fn notify_payment_failed(
        &self,
        user_id: Uuid,
        contract: &Contract,
    ) -> Result<(), ServiceError> {
        self.store_notification(
            user_id,
            "payment_failed",
            "Payment failed",
            &format!(
                "A payment on \"{}\" failed. Please check your payment method.",
                contract.title
            ),
            Self::contract_link(contract.id),
        )
        .await
    }

    pub async fn notify_refund_issued(
        &self,
        user_id: Uuid,
        contract: &Contract,
        amount: f64,
    ) -> Result<(), ServiceError> {
        self.store_notification(
            user_id,
            "refund_issued",
            "Refund issued",
            &format!("${:.2} was refunded on \"{}\"", amount, contract.title),
            Self::contract_link(contract.id),
        )
        .await
    }

    pub async fn notify_payouts_enabled(&self, user_id: Uuid) -> Result<(), ServiceError> {
        self.store_notification(
            user_id,
            "payouts_enabled",
            "Payout account active",
            "Your payout account is fully set up. You can now receive payments.",
            None,
        )
        .await
    }

    pub async fn notify_dispute_opened(
        &self,
        user_id: Uuid,
        contract: &Contract,
        dispute: &Dispute,
    ) -> Result<(), ServiceError> {
        tracing::info!(
            "Dispute {} opened on contract {}, notifying {}",
            dispute.id,
            contract.id,
            user_id
        );

        self.store_notification(
            user_id,
            "dispute_opened",
            "Dispute opened",
            &format!(
                "A dispute was opened on \"{}\": {}",
                contract.title, dispute.reason
            ),
            Self::contract_link(contract.id),
        )
        .await
    }

    pub async fn notify_dispute_resolved(
        &self,
        contract: &Contract,
        dispute: &Dispute,
    ) -> Result<(), ServiceError> {
        let outcome = dispute
            .resolution_type
            .map(|r| r.to_str().replace('_', " "))
            .unwrap_or_else(|| "resolved".to_string());

        for user_id in [contract.client_id, contract.freelancer_id] {
            self.store_notification(
                user_id,
                "dispute_resolved",
                "Dispute resolved",
                &format!(
                    "The dispute on \"{}\" was resolved: {}",
                    contract.title, outcome
                ),
                Self::contract_link(contract.id),
            )
            .await?;
        }

        Ok(())
    }
}
