use num_traits::ToPrimitive;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::disputemodel::*;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct OpenDisputeDto {
    pub dispute_type: DisputeType,

    #[validate(length(min = 20, max = 2000, message = "Reason must be between 20 and 2000 characters"))]
    pub reason: String,

    /// Links to uploaded evidence (screenshots, deliverables, chat exports)
    pub evidence: Option<Vec<String>>,

    #[validate(range(min = 0.01, message = "Disputed amount must be positive"))]
    pub amount_disputed: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ResolveDisputeDto {
    pub resolution_type: ResolutionType,

    #[validate(length(max = 2000, message = "Resolution details must be at most 2000 characters"))]
    pub resolution_details: Option<String>,

    /// Required for partial_refund; the split is resolver input, never computed
    #[validate(range(min = 0.01, message = "Refund amount must be positive"))]
    pub refund_amount: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DisputeResponseDto {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub opened_by: Uuid,
    pub dispute_type: DisputeType,
    pub reason: String,
    pub evidence: Option<serde_json::Value>,
    pub amount_disputed: Option<f64>,
    pub status: DisputeStatus,
    pub resolution_type: Option<ResolutionType>,
    pub resolution_details: Option<String>,
    pub refund_amount: Option<f64>,
    pub admin_assigned: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<Dispute> for DisputeResponseDto {
    fn from(d: Dispute) -> Self {
        Self {
            id: d.id,
            contract_id: d.contract_id,
            opened_by: d.opened_by,
            dispute_type: d.dispute_type,
            reason: d.reason,
            evidence: d.evidence,
            amount_disputed: d.amount_disputed.as_ref().and_then(|a| a.to_f64()),
            status: d.status,
            resolution_type: d.resolution_type,
            resolution_details: d.resolution_details,
            refund_amount: d.refund_amount.as_ref().and_then(|a| a.to_f64()),
            admin_assigned: d.admin_assigned,
            created_at: d.created_at,
            resolved_at: d.resolved_at,
        }
    }
}
