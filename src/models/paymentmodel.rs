use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "transaction_type", rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Release,
    Refund,
}

impl TransactionType {
    pub fn to_str(&self) -> &str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Release => "release",
            TransactionType::Refund => "refund",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "transaction_status", rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// One row per escrow money movement. Rows are created only by the payment
/// bridge in response to verified processor events or confirmed outbound
/// calls, and are immutable once `completed`. `external_reference` is the
/// processor-side id used for replay deduplication.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub milestone_id: Option<Uuid>,
    pub payer_id: Option<Uuid>,
    pub payee_id: Option<Uuid>,
    pub amount: BigDecimal,
    pub fee_amount: Option<BigDecimal>,
    pub transaction_type: TransactionType,
    pub status: Option<TransactionStatus>,  // Database has DEFAULT 'pending', can be NULL
    pub reference: String,
    pub external_reference: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}
