use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "dispute_status", rename_all = "snake_case")]
pub enum DisputeStatus {
    Open,
    Resolved,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "dispute_type", rename_all = "snake_case")]
pub enum DisputeType {
    WorkQuality,
    Payment,
    Deadline,
    Communication,
    Other,
}

impl DisputeType {
    pub fn to_str(&self) -> &str {
        match self {
            DisputeType::WorkQuality => "work_quality",
            DisputeType::Payment => "payment",
            DisputeType::Deadline => "deadline",
            DisputeType::Communication => "communication",
            DisputeType::Other => "other",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "resolution_type", rename_all = "snake_case")]
pub enum ResolutionType {
    FullRefund,
    PaymentReleased,
    PartialRefund,
}

impl ResolutionType {
    pub fn to_str(&self) -> &str {
        match self {
            ResolutionType::FullRefund => "full_refund",
            ResolutionType::PaymentReleased => "payment_released",
            ResolutionType::PartialRefund => "partial_refund",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Dispute {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub opened_by: Uuid,
    pub dispute_type: DisputeType,
    pub reason: String,
    pub evidence: Option<serde_json::Value>,
    pub amount_disputed: Option<BigDecimal>,
    pub status: DisputeStatus,
    pub resolution_type: Option<ResolutionType>,
    pub resolution_details: Option<String>,
    pub refund_amount: Option<BigDecimal>,
    pub admin_assigned: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "flag_status", rename_all = "snake_case")]
pub enum FlagStatus {
    Active,
    Closed,
}

/// Administrative risk record opened alongside a dispute; distinct from the
/// contract's own status.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct MonitoringFlag {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub dispute_id: Option<Uuid>,
    pub flag_type: String,
    pub severity: String,
    pub status: FlagStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}
