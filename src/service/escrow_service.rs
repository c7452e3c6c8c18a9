// services/escrow_service.rs
use num_traits::ToPrimitive;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{
        contractdb::ContractExt,
        db::DBClient,
        paymentdb::PaymentExt,
        userdb::UserExt,
    },
    models::{contractmodel::*, paymentmodel::*, usermodel::User},
    service::{
        error::ServiceError,
        notification_service::NotificationService,
        payment_provider::{PaymentMetadata, PaymentProviderService},
    },
    utils::currency::{cents_to_dollars, dollars_to_cents, freelancer_payout_cents, platform_fee_cents},
};

/// The escrow / payment bridge. The only component that writes Transaction
/// ledger rows or marks milestones paid: outbound it initiates transfers and
/// refunds, inbound it translates verified processor events into ledger and
/// contract state changes.
///
/// With no locking anywhere, reference-based deduplication is the safety net
/// against duplicate webhook delivery: an external reference already recorded
/// as completed is never applied twice.
#[derive(Clone)]
pub struct EscrowService {
    db_client: Arc<DBClient>,
    payment_provider: Arc<PaymentProviderService>,
    notification_service: Arc<NotificationService>,
    fee_percent: i64,
}

impl EscrowService {
    pub fn new(
        db_client: Arc<DBClient>,
        payment_provider: Arc<PaymentProviderService>,
        notification_service: Arc<NotificationService>,
        fee_percent: i64,
    ) -> Self {
        Self {
            db_client,
            payment_provider,
            notification_service,
            fee_percent,
        }
    }

    fn new_reference(prefix: &str) -> String {
        format!("{}_{}", prefix, Uuid::new_v4().simple())
    }

    fn amount_of(value: &sqlx::types::BigDecimal) -> f64 {
        value.to_f64().unwrap_or(0.0)
    }

    /// Split an amount into (payout, fee) in dollars, computed on whole cents.
    pub fn split_payout(&self, amount: f64) -> (f64, f64) {
        let amount_cents = dollars_to_cents(amount);
        let payout = freelancer_payout_cents(amount_cents, self.fee_percent);
        let fee = platform_fee_cents(amount_cents, self.fee_percent);
        (cents_to_dollars(payout), cents_to_dollars(fee))
    }

    // ---- Outbound -------------------------------------------------------

    /// Create the payment intent for the client's escrow deposit. No ledger
    /// row is written here; the deposit is recorded when the processor
    /// confirms it via payment_intent.succeeded.
    pub async fn initiate_deposit(&self, contract: &Contract) -> Result<String, ServiceError> {
        let amount = Self::amount_of(&contract.total_amount);

        let metadata = PaymentMetadata {
            contract_id: contract.id,
            milestone_id: None,
            client_id: Some(contract.client_id),
        };

        let intent_id = self
            .payment_provider
            .create_payment_intent(dollars_to_cents(amount), "usd", &metadata)
            .await?;

        tracing::info!(
            "Deposit intent {} created for contract {} ({})",
            intent_id,
            contract.id,
            amount
        );

        Ok(intent_id)
    }

    /// Create the payout transfer for an approved milestone and record the
    /// pending release. The ledger row is completed by the transfer.created
    /// event.
    pub async fn initiate_milestone_payout(
        &self,
        contract: &Contract,
        milestone: &Milestone,
        freelancer: &User,
    ) -> Result<Transaction, ServiceError> {
        let destination = freelancer.stripe_account_id.as_deref().ok_or_else(|| {
            ServiceError::Validation("Freelancer has no payout account on file".to_string())
        })?;

        let amount = Self::amount_of(&milestone.amount);
        let amount_cents = dollars_to_cents(amount);
        let payout_cents = freelancer_payout_cents(amount_cents, self.fee_percent);
        let fee_cents = platform_fee_cents(amount_cents, self.fee_percent);

        let metadata = PaymentMetadata {
            contract_id: contract.id,
            milestone_id: Some(milestone.id),
            client_id: Some(contract.client_id),
        };

        let transfer_id = self
            .payment_provider
            .create_transfer(payout_cents, destination, &metadata)
            .await?;

        tracing::info!(
            "Transfer {} created for milestone {} ({} cents, fee {} cents)",
            transfer_id,
            milestone.id,
            payout_cents,
            fee_cents
        );

        let transaction = self
            .db_client
            .create_transaction(
                contract.id,
                Some(milestone.id),
                Some(contract.client_id),
                Some(contract.freelancer_id),
                amount,
                cents_to_dollars(fee_cents),
                TransactionType::Release,
                TransactionStatus::Pending,
                Self::new_reference("rel"),
                Some(transfer_id),
            )
            .await?;

        Ok(transaction)
    }

    /// Payout of a fixed-price contract's remaining balance (completion
    /// approval or dispute resolution).
    pub async fn initiate_contract_payout(
        &self,
        contract: &Contract,
        freelancer: &User,
        amount: f64,
    ) -> Result<Transaction, ServiceError> {
        let destination = freelancer.stripe_account_id.as_deref().ok_or_else(|| {
            ServiceError::Validation("Freelancer has no payout account on file".to_string())
        })?;

        let amount_cents = dollars_to_cents(amount);
        let payout_cents = freelancer_payout_cents(amount_cents, self.fee_percent);
        let fee_cents = platform_fee_cents(amount_cents, self.fee_percent);

        let metadata = PaymentMetadata {
            contract_id: contract.id,
            milestone_id: None,
            client_id: Some(contract.client_id),
        };

        let transfer_id = self
            .payment_provider
            .create_transfer(payout_cents, destination, &metadata)
            .await?;

        let transaction = self
            .db_client
            .create_transaction(
                contract.id,
                None,
                Some(contract.client_id),
                Some(contract.freelancer_id),
                amount,
                cents_to_dollars(fee_cents),
                TransactionType::Release,
                TransactionStatus::Pending,
                Self::new_reference("rel"),
                Some(transfer_id),
            )
            .await?;

        Ok(transaction)
    }

    /// Refund the escrow deposit, in full when amount_cents is None. The
    /// refund ledger row is written when charge.refunded comes back.
    pub async fn initiate_refund(
        &self,
        contract: &Contract,
        amount_cents: Option<i64>,
    ) -> Result<String, ServiceError> {
        let deposit = self
            .db_client
            .get_completed_deposit_for_contract(contract.id)
            .await?
            .ok_or_else(|| {
                ServiceError::Validation(
                    "No completed escrow deposit found for this contract".to_string(),
                )
            })?;

        let intent_id = deposit.external_reference.ok_or_else(|| {
            ServiceError::Validation("Escrow deposit has no processor reference".to_string())
        })?;

        self.payment_provider
            .create_refund(&intent_id, amount_cents)
            .await
    }

    // ---- Inbound (webhook-driven) ---------------------------------------

    /// Deposit succeeded: escrow is live. Records the deposit and notifies
    /// the freelancer that funds are secured.
    pub async fn apply_deposit_succeeded(
        &self,
        contract_id: Uuid,
        amount: f64,
        intent_id: &str,
    ) -> Result<(), ServiceError> {
        if self.already_applied(intent_id).await? {
            return Ok(());
        }

        let contract = self
            .db_client
            .get_contract_by_id(contract_id)
            .await?
            .ok_or(ServiceError::ContractNotFound(contract_id))?;

        self.db_client
            .create_transaction(
                contract.id,
                None,
                Some(contract.client_id),
                None,
                amount,
                0.0,
                TransactionType::Deposit,
                TransactionStatus::Completed,
                Self::new_reference("dep"),
                Some(intent_id.to_string()),
            )
            .await?;

        let funded = self.db_client.mark_escrow_funded(contract.id).await?;

        tracing::info!(
            "Escrow deposit of {} recorded for contract {} (intent {})",
            amount,
            contract.id,
            intent_id
        );

        if let Some(contract) = funded {
            if let Err(e) = self.notification_service.notify_escrow_funded(&contract).await {
                tracing::warn!("Failed to record escrow-funded notification: {}", e);
            }
        }

        Ok(())
    }

    /// Per-milestone payment succeeded: the milestone is approved and its
    /// release is on the ledger.
    pub async fn apply_milestone_payment_succeeded(
        &self,
        milestone_id: Uuid,
        amount: f64,
        intent_id: &str,
    ) -> Result<(), ServiceError> {
        if self.already_applied(intent_id).await? {
            return Ok(());
        }

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

        // Conditional updates: a milestone past these states is left alone
        self.db_client.approve_milestone(milestone.id).await?;
        self.db_client.mark_milestone_funded(milestone.id).await?;

        let (_, fee) = self.split_payout(amount);

        self.db_client
            .create_transaction(
                contract.id,
                Some(milestone.id),
                Some(contract.client_id),
                Some(contract.freelancer_id),
                amount,
                fee,
                TransactionType::Release,
                TransactionStatus::Completed,
                Self::new_reference("rel"),
                Some(intent_id.to_string()),
            )
            .await?;

        tracing::info!(
            "Milestone payment of {} recorded for milestone {} (intent {})",
            amount,
            milestone.id,
            intent_id
        );

        if let Err(e) = self
            .notification_service
            .notify_milestone_approved(&contract, &milestone)
            .await
        {
            tracing::warn!("Failed to record milestone-approved notification: {}", e);
        }

        Ok(())
    }

    /// Payment failed: mark the pending transaction failed and tell the
    /// paying party. The contract itself never regresses.
    pub async fn apply_payment_failed(
        &self,
        intent_id: &str,
        contract_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let transaction = self
            .db_client
            .get_transaction_by_external_reference(intent_id)
            .await?;

        let (contract_id, payer_id) = match &transaction {
            Some(transaction) => (transaction.contract_id, transaction.payer_id),
            // A failed deposit attempt has no ledger row yet; fall back to
            // the event's metadata correlation
            None => match contract_id {
                Some(contract_id) => (contract_id, None),
                None => {
                    tracing::warn!("Payment failure for unknown reference {}", intent_id);
                    return Ok(());
                }
            },
        };

        if let Some(transaction) = transaction {
            if transaction.status != Some(TransactionStatus::Pending) {
                tracing::info!(
                    "Payment failure for {} ignored, transaction already {:?}",
                    intent_id,
                    transaction.status
                );
                return Ok(());
            }
            self.db_client.fail_transaction(transaction.id).await?;
            tracing::warn!(
                "Transaction {} marked failed (intent {})",
                transaction.reference,
                intent_id
            );
        }

        let contract = self
            .db_client
            .get_contract_by_id(contract_id)
            .await?
            .ok_or(ServiceError::ContractNotFound(contract_id))?;

        let payer = payer_id.unwrap_or(contract.client_id);
        if let Err(e) = self
            .notification_service
            .notify_payment_failed(payer, &contract)
            .await
        {
            tracing::warn!("Failed to record payment-failed notification: {}", e);
        }

        Ok(())
    }

    /// Payout confirmed by the processor: the milestone becomes released and
    /// the pending ledger row completes. Replays of the same transfer id
    /// no-op.
    pub async fn apply_transfer_created(
        &self,
        transfer_id: &str,
        milestone_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut target_milestone = milestone_id;

        match self
            .db_client
            .get_transaction_by_external_reference(transfer_id)
            .await?
        {
            Some(transaction) => {
                if transaction.status == Some(TransactionStatus::Completed) {
                    tracing::info!("Transfer {} already applied, skipping", transfer_id);
                    return Ok(());
                }
                self.db_client
                    .complete_transaction(transaction.id, Some(transfer_id.to_string()))
                    .await?;
                if target_milestone.is_none() {
                    target_milestone = transaction.milestone_id;
                }
            }
            None => {
                // No local row for this transfer; fall back to the metadata
                // correlation and complete the pending release if one exists
                if let Some(milestone_id) = target_milestone {
                    if let Some(pending) = self
                        .db_client
                        .get_pending_release_for_milestone(milestone_id)
                        .await?
                    {
                        self.db_client
                            .complete_transaction(pending.id, Some(transfer_id.to_string()))
                            .await?;
                    }
                }
            }
        }

        let milestone_id = match target_milestone {
            Some(milestone_id) => milestone_id,
            None => {
                tracing::info!("Transfer {} has no milestone correlation", transfer_id);
                return Ok(());
            }
        };

        let released = self.db_client.release_milestone(milestone_id).await?;

        let milestone = match released {
            Some(milestone) => milestone,
            None => {
                tracing::info!(
                    "Milestone {} not in approved state, release skipped",
                    milestone_id
                );
                return Ok(());
            }
        };

        let contract = self
            .db_client
            .get_contract_by_id(milestone.contract_id)
            .await?
            .ok_or(ServiceError::ContractNotFound(milestone.contract_id))?;

        if let Err(e) = self
            .notification_service
            .notify_milestone_released(&contract, &milestone)
            .await
        {
            tracing::warn!("Failed to record milestone-released notification: {}", e);
        }

        // Releasing the last milestone completes the contract
        self.complete_if_fully_released(&contract).await?;

        Ok(())
    }

    /// Charge refunded: mirror the original deposit with a refund row and
    /// notify the original payer.
    pub async fn apply_charge_refunded(
        &self,
        refund_reference: &str,
        payment_intent_id: &str,
        amount: f64,
    ) -> Result<(), ServiceError> {
        if self.already_applied(refund_reference).await? {
            return Ok(());
        }

        let original = self
            .db_client
            .get_transaction_by_external_reference(payment_intent_id)
            .await?
            .ok_or_else(|| {
                ServiceError::Validation(format!(
                    "Refund received for unknown payment {}",
                    payment_intent_id
                ))
            })?;

        self.db_client
            .create_transaction(
                original.contract_id,
                original.milestone_id,
                original.payee_id,
                original.payer_id,
                amount,
                0.0,
                TransactionType::Refund,
                TransactionStatus::Completed,
                Self::new_reference("ref"),
                Some(refund_reference.to_string()),
            )
            .await?;

        tracing::info!(
            "Refund of {} recorded against payment {} on contract {}",
            amount,
            payment_intent_id,
            original.contract_id
        );

        let contract = self
            .db_client
            .get_contract_by_id(original.contract_id)
            .await?
            .ok_or(ServiceError::ContractNotFound(original.contract_id))?;

        let payer = original.payer_id.unwrap_or(contract.client_id);
        if let Err(e) = self
            .notification_service
            .notify_refund_issued(payer, &contract, amount)
            .await
        {
            tracing::warn!("Failed to record refund notification: {}", e);
        }

        Ok(())
    }

    /// Payout account capability change. The freelancer is congratulated
    /// exactly once, on the flip to fully enabled.
    pub async fn apply_account_updated(
        &self,
        stripe_account_id: &str,
        charges_enabled: bool,
        payouts_enabled: bool,
    ) -> Result<(), ServiceError> {
        let before = self
            .db_client
            .get_user(None, None, Some(stripe_account_id))
            .await?;

        let updated = self
            .db_client
            .update_payout_capabilities(stripe_account_id, charges_enabled, payouts_enabled)
            .await?;

        let (before, updated) = match (before, updated) {
            (Some(before), Some(updated)) => (before, updated),
            _ => {
                tracing::warn!(
                    "Account update for unknown payout account {}",
                    stripe_account_id
                );
                return Ok(());
            }
        };

        if updated.payout_ready() && !before.payout_ready() {
            tracing::info!("Payout account {} fully enabled", stripe_account_id);
            if let Err(e) = self
                .notification_service
                .notify_payouts_enabled(updated.id)
                .await
            {
                tracing::warn!("Failed to record payouts-enabled notification: {}", e);
            }
        }

        Ok(())
    }

    /// Auto-completion: a milestone contract with nothing left unreleased is
    /// done.
    pub async fn complete_if_fully_released(
        &self,
        contract: &Contract,
    ) -> Result<(), ServiceError> {
        if contract.payment_type != PaymentType::Milestone {
            return Ok(());
        }

        let remaining = self
            .db_client
            .count_unreleased_milestones(contract.id)
            .await?;

        if remaining > 0 {
            return Ok(());
        }

        if let Some(completed) = self.db_client.complete_contract(contract.id).await? {
            tracing::info!("All milestones released, contract {} completed", contract.id);
            if let Err(e) = self
                .notification_service
                .notify_contract_completed(&completed)
                .await
            {
                tracing::warn!("Failed to record contract-completed notification: {}", e);
            }
        }

        Ok(())
    }

    /// True when this external reference has already been applied. Pending
    /// rows are not a hit; their own conditional updates make re-application
    /// harmless.
    async fn already_applied(&self, external_reference: &str) -> Result<bool, ServiceError> {
        if let Some(existing) = self
            .db_client
            .get_transaction_by_external_reference(external_reference)
            .await?
        {
            if existing.status == Some(TransactionStatus::Completed) {
                tracing::info!(
                    "Event reference {} already processed, skipping",
                    external_reference
                );
                return Ok(true);
            }
        }
        Ok(false)
    }
}
