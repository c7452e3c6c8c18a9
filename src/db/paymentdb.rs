// db/paymentdb.rs
use async_trait::async_trait;
use sqlx::types::BigDecimal;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::paymentmodel::*;

#[async_trait]
pub trait PaymentExt {
    #[allow(clippy::too_many_arguments)]
    async fn create_transaction(
        &self,
        contract_id: Uuid,
        milestone_id: Option<Uuid>,
        payer_id: Option<Uuid>,
        payee_id: Option<Uuid>,
        amount: f64,
        fee_amount: f64,
        transaction_type: TransactionType,
        status: TransactionStatus,
        reference: String,
        external_reference: Option<String>,
    ) -> Result<Transaction, Error>;

    async fn get_transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Transaction>, Error>;

    async fn get_transaction_by_external_reference(
        &self,
        external_reference: &str,
    ) -> Result<Option<Transaction>, Error>;

    async fn complete_transaction(
        &self,
        transaction_id: Uuid,
        external_reference: Option<String>,
    ) -> Result<Option<Transaction>, Error>;

    async fn fail_transaction(&self, transaction_id: Uuid) -> Result<Option<Transaction>, Error>;

    async fn get_pending_release_for_milestone(
        &self,
        milestone_id: Uuid,
    ) -> Result<Option<Transaction>, Error>;

    async fn get_completed_deposit_for_contract(
        &self,
        contract_id: Uuid,
    ) -> Result<Option<Transaction>, Error>;

    async fn get_contract_transactions(&self, contract_id: Uuid)
        -> Result<Vec<Transaction>, Error>;
}

#[async_trait]
impl PaymentExt for DBClient {
    async fn create_transaction(
        &self,
        contract_id: Uuid,
        milestone_id: Option<Uuid>,
        payer_id: Option<Uuid>,
        payee_id: Option<Uuid>,
        amount: f64,
        fee_amount: f64,
        transaction_type: TransactionType,
        status: TransactionStatus,
        reference: String,
        external_reference: Option<String>,
    ) -> Result<Transaction, Error> {
        let amount_bd = BigDecimal::try_from(amount).unwrap_or_default();
        let fee_bd = BigDecimal::try_from(fee_amount).unwrap_or_default();

        sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions
                (contract_id, milestone_id, payer_id, payee_id, amount, fee_amount,
                 transaction_type, status, reference, external_reference,
                 completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    CASE WHEN $8 = 'completed'::transaction_status THEN NOW() ELSE NULL END)
            RETURNING id, contract_id, milestone_id, payer_id, payee_id, amount,
                      fee_amount, transaction_type, status, reference,
                      external_reference, created_at, completed_at
            "#,
        )
        .bind(contract_id)
        .bind(milestone_id)
        .bind(payer_id)
        .bind(payee_id)
        .bind(amount_bd)
        .bind(fee_bd)
        .bind(transaction_type)
        .bind(status)
        .bind(reference)
        .bind(external_reference)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Transaction>, Error> {
        sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, contract_id, milestone_id, payer_id, payee_id, amount,
                   fee_amount, transaction_type, status, reference,
                   external_reference, created_at, completed_at
            FROM transactions
            WHERE reference = $1
            "#,
        )
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_transaction_by_external_reference(
        &self,
        external_reference: &str,
    ) -> Result<Option<Transaction>, Error> {
        sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, contract_id, milestone_id, payer_id, payee_id, amount,
                   fee_amount, transaction_type, status, reference,
                   external_reference, created_at, completed_at
            FROM transactions
            WHERE external_reference = $1
            "#,
        )
        .bind(external_reference)
        .fetch_optional(&self.pool)
        .await
    }

    async fn complete_transaction(
        &self,
        transaction_id: Uuid,
        external_reference: Option<String>,
    ) -> Result<Option<Transaction>, Error> {
        // Completed rows are immutable; the guard keeps replays from touching them
        sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions
            SET status = 'completed', completed_at = NOW(),
                external_reference = COALESCE($2, external_reference)
            WHERE id = $1 AND status = 'pending'
            RETURNING id, contract_id, milestone_id, payer_id, payee_id, amount,
                      fee_amount, transaction_type, status, reference,
                      external_reference, created_at, completed_at
            "#,
        )
        .bind(transaction_id)
        .bind(external_reference)
        .fetch_optional(&self.pool)
        .await
    }

    async fn fail_transaction(&self, transaction_id: Uuid) -> Result<Option<Transaction>, Error> {
        sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions
            SET status = 'failed'
            WHERE id = $1 AND status = 'pending'
            RETURNING id, contract_id, milestone_id, payer_id, payee_id, amount,
                      fee_amount, transaction_type, status, reference,
                      external_reference, created_at, completed_at
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_pending_release_for_milestone(
        &self,
        milestone_id: Uuid,
    ) -> Result<Option<Transaction>, Error> {
        sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, contract_id, milestone_id, payer_id, payee_id, amount,
                   fee_amount, transaction_type, status, reference,
                   external_reference, created_at, completed_at
            FROM transactions
            WHERE milestone_id = $1
              AND transaction_type = 'release'
              AND status = 'pending'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(milestone_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_completed_deposit_for_contract(
        &self,
        contract_id: Uuid,
    ) -> Result<Option<Transaction>, Error> {
        sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, contract_id, milestone_id, payer_id, payee_id, amount,
                   fee_amount, transaction_type, status, reference,
                   external_reference, created_at, completed_at
            FROM transactions
            WHERE contract_id = $1
              AND transaction_type = 'deposit'
              AND status = 'completed'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(contract_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_contract_transactions(
        &self,
        contract_id: Uuid,
    ) -> Result<Vec<Transaction>, Error> {
        sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, contract_id, milestone_id, payer_id, payee_id, amount,
                   fee_amount, transaction_type, status, reference,
                   external_reference, created_at, completed_at
            FROM transactions
            WHERE contract_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(contract_id)
        .fetch_all(&self.pool)
        .await
    }
}
