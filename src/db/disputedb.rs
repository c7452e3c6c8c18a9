// db/disputedb.rs
use async_trait::async_trait;
use sqlx::types::BigDecimal;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::disputemodel::*;

#[async_trait]
pub trait DisputeExt {
    async fn create_dispute(
        &self,
        contract_id: Uuid,
        opened_by: Uuid,
        dispute_type: DisputeType,
        reason: String,
        evidence: Option<serde_json::Value>,
        amount_disputed: Option<f64>,
    ) -> Result<Dispute, Error>;

    async fn get_dispute_by_id(&self, dispute_id: Uuid) -> Result<Option<Dispute>, Error>;

    async fn get_open_dispute_for_contract(
        &self,
        contract_id: Uuid,
    ) -> Result<Option<Dispute>, Error>;

    // Conditional on status = 'open' so a concurrent double-resolve can only
    // succeed once.
    async fn resolve_dispute(
        &self,
        dispute_id: Uuid,
        admin_id: Uuid,
        resolution_type: ResolutionType,
        resolution_details: Option<String>,
        refund_amount: Option<f64>,
    ) -> Result<Option<Dispute>, Error>;

    async fn create_monitoring_flag(
        &self,
        contract_id: Uuid,
        dispute_id: Uuid,
    ) -> Result<MonitoringFlag, Error>;

    async fn close_monitoring_flag_for_dispute(&self, dispute_id: Uuid) -> Result<(), Error>;
}

#[async_trait]
impl DisputeExt for DBClient {
    async fn create_dispute(
        &self,
        contract_id: Uuid,
        opened_by: Uuid,
        dispute_type: DisputeType,
        reason: String,
        evidence: Option<serde_json::Value>,
        amount_disputed: Option<f64>,
    ) -> Result<Dispute, Error> {
        let amount_bd = amount_disputed.and_then(|a| BigDecimal::try_from(a).ok());

        sqlx::query_as::<_, Dispute>(
            r#"
            INSERT INTO disputes
                (contract_id, opened_by, dispute_type, reason, evidence, amount_disputed)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, contract_id, opened_by, dispute_type, reason, evidence,
                      amount_disputed, status, resolution_type, resolution_details,
                      refund_amount, admin_assigned, created_at, resolved_at
            "#,
        )
        .bind(contract_id)
        .bind(opened_by)
        .bind(dispute_type)
        .bind(reason)
        .bind(evidence)
        .bind(amount_bd)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_dispute_by_id(&self, dispute_id: Uuid) -> Result<Option<Dispute>, Error> {
        sqlx::query_as::<_, Dispute>(
            r#"
            SELECT id, contract_id, opened_by, dispute_type, reason, evidence,
                   amount_disputed, status, resolution_type, resolution_details,
                   refund_amount, admin_assigned, created_at, resolved_at
            FROM disputes
            WHERE id = $1
            "#,
        )
        .bind(dispute_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_open_dispute_for_contract(
        &self,
        contract_id: Uuid,
    ) -> Result<Option<Dispute>, Error> {
        sqlx::query_as::<_, Dispute>(
            r#"
            SELECT id, contract_id, opened_by, dispute_type, reason, evidence,
                   amount_disputed, status, resolution_type, resolution_details,
                   refund_amount, admin_assigned, created_at, resolved_at
            FROM disputes
            WHERE contract_id = $1 AND status = 'open'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(contract_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn resolve_dispute(
        &self,
        dispute_id: Uuid,
        admin_id: Uuid,
        resolution_type: ResolutionType,
        resolution_details: Option<String>,
        refund_amount: Option<f64>,
    ) -> Result<Option<Dispute>, Error> {
        let refund_bd = refund_amount.and_then(|a| BigDecimal::try_from(a).ok());

        sqlx::query_as::<_, Dispute>(
            r#"
            UPDATE disputes
            SET status = 'resolved', resolution_type = $3, resolution_details = $4,
                refund_amount = $5, admin_assigned = $2, resolved_at = NOW()
            WHERE id = $1 AND status = 'open'
            RETURNING id, contract_id, opened_by, dispute_type, reason, evidence,
                      amount_disputed, status, resolution_type, resolution_details,
                      refund_amount, admin_assigned, created_at, resolved_at
            "#,
        )
        .bind(dispute_id)
        .bind(admin_id)
        .bind(resolution_type)
        .bind(resolution_details)
        .bind(refund_bd)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_monitoring_flag(
        &self,
        contract_id: Uuid,
        dispute_id: Uuid,
    ) -> Result<MonitoringFlag, Error> {
        sqlx::query_as::<_, MonitoringFlag>(
            r#"
            INSERT INTO monitoring_flags (contract_id, dispute_id, flag_type, severity)
            VALUES ($1, $2, 'dispute', 'high')
            RETURNING id, contract_id, dispute_id, flag_type, severity, status,
                      created_at, closed_at
            "#,
        )
        .bind(contract_id)
        .bind(dispute_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn close_monitoring_flag_for_dispute(&self, dispute_id: Uuid) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE monitoring_flags
            SET status = 'closed', closed_at = NOW()
            WHERE dispute_id = $1 AND status = 'active'
            "#,
        )
        .bind(dispute_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
