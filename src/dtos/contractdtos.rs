use chrono::{DateTime, Utc};
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::contractmodel::*;

//Contract edit DTOs
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct EditContractDto {
    #[validate(length(min = 1, max = 150, message = "Title must be between 1 and 150 characters"))]
    pub title: String,

    #[validate(length(min = 20, max = 5000, message = "Description must be between 20 and 5000 characters"))]
    pub description: String,

    #[validate(range(min = 1.0, message = "Total amount must be positive"))]
    pub total_amount: f64,

    pub payment_type: PaymentType,

    pub deadline: Option<DateTime<Utc>>,

    #[validate]
    pub milestones: Vec<MilestoneInputDto>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct MilestoneInputDto {
    /// Present for an existing milestone (updated in place), absent for a new
    /// one. Rows missing from the payload are removed.
    pub id: Option<Uuid>,

    #[validate(length(min = 1, max = 150, message = "Milestone title must be between 1 and 150 characters"))]
    pub title: String,

    #[validate(range(min = 0.01, message = "Milestone amount must be positive"))]
    pub amount: f64,

    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CompleteContractDto {
    #[validate(length(max = 2000, message = "Completion note must be at most 2000 characters"))]
    pub completion_note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CancelContractDto {
    #[validate(length(min = 3, max = 500, message = "Cancellation reason must be between 3 and 500 characters"))]
    pub reason: String,
}

//Milestone action DTOs
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SubmitMilestoneDto {
    #[validate(length(min = 1, max = 2000, message = "Submission note must be between 1 and 2000 characters"))]
    pub submission_note: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RejectMilestoneDto {
    #[validate(length(max = 2000, message = "Feedback must be at most 2000 characters"))]
    pub feedback: Option<String>,
}

//Response DTOs
#[derive(Debug, Serialize, Deserialize)]
pub struct MilestoneResponseDto {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub title: String,
    pub amount: f64,
    pub deadline: Option<DateTime<Utc>>,
    pub position: i32,
    pub status: MilestoneStatus,
    pub payment_status: Option<MilestonePaymentStatus>,
    pub submission_note: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
}

impl From<Milestone> for MilestoneResponseDto {
    fn from(m: Milestone) -> Self {
        Self {
            id: m.id,
            contract_id: m.contract_id,
            title: m.title,
            amount: m.amount.to_f64().unwrap_or(0.0),
            deadline: m.deadline,
            position: m.position,
            status: m.status,
            payment_status: m.payment_status,
            submission_note: m.submission_note,
            completed_at: m.completed_at,
            approved_at: m.approved_at,
            released_at: m.released_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContractResponseDto {
    pub id: Uuid,
    pub job_id: Uuid,
    pub client_id: Uuid,
    pub freelancer_id: Uuid,
    pub title: String,
    pub description: String,
    pub total_amount: f64,
    pub payment_type: PaymentType,
    pub status: ContractStatus,
    pub client_signed_at: Option<DateTime<Utc>>,
    pub freelancer_signed_at: Option<DateTime<Utc>>,
    pub is_editable: bool,
    pub deadline: Option<DateTime<Utc>>,
    pub escrow_funded_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completion_note: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_edited_at: Option<DateTime<Utc>>,
    pub milestones: Vec<MilestoneResponseDto>,
}

impl ContractResponseDto {
    pub fn from_parts(contract: Contract, milestones: Vec<Milestone>) -> Self {
        Self {
            id: contract.id,
            job_id: contract.job_id,
            client_id: contract.client_id,
            freelancer_id: contract.freelancer_id,
            title: contract.title,
            description: contract.description,
            total_amount: contract.total_amount.to_f64().unwrap_or(0.0),
            payment_type: contract.payment_type,
            status: contract.status,
            client_signed_at: contract.client_signed_at,
            freelancer_signed_at: contract.freelancer_signed_at,
            is_editable: contract.is_editable.unwrap_or(false),
            deadline: contract.deadline,
            escrow_funded_at: contract.escrow_funded_at,
            completed_at: contract.completed_at,
            completion_note: contract.completion_note,
            cancelled_at: contract.cancelled_at,
            cancellation_reason: contract.cancellation_reason,
            created_at: contract.created_at,
            last_edited_at: contract.last_edited_at,
            milestones: milestones.into_iter().map(Into::into).collect(),
        }
    }
}

//Response wrappers
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: &str) -> ApiResponse<()> {
        ApiResponse {
            status: "error".to_string(),
            message: message.to_string(),
            data: None,
        }
    }
}
