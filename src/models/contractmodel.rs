use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "contract_status", rename_all = "snake_case")]
pub enum ContractStatus {
    Draft,
    Pending,
    Active,
    PendingCompletion,
    Completed,
    Cancelled,
}

impl ContractStatus {
    pub fn to_str(&self) -> &str {
        match self {
            ContractStatus::Draft => "draft",
            ContractStatus::Pending => "pending",
            ContractStatus::Active => "active",
            ContractStatus::PendingCompletion => "pending_completion",
            ContractStatus::Completed => "completed",
            ContractStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ContractStatus::Completed | ContractStatus::Cancelled)
    }

    pub fn can_transition_to(&self, to: ContractStatus) -> bool {
        match (self, to) {
            (ContractStatus::Draft, ContractStatus::Pending) => true,
            (ContractStatus::Pending, ContractStatus::Active) => true,
            (ContractStatus::Pending, ContractStatus::Cancelled) => true,
            (ContractStatus::Active, ContractStatus::PendingCompletion) => true,
            (ContractStatus::Active, ContractStatus::Completed) => true,
            (ContractStatus::Active, ContractStatus::Cancelled) => true,
            (ContractStatus::PendingCompletion, ContractStatus::Completed) => true,
            (ContractStatus::PendingCompletion, ContractStatus::Cancelled) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "payment_type", rename_all = "snake_case")]
pub enum PaymentType {
    Fixed,
    Milestone,
}

impl PaymentType {
    pub fn to_str(&self) -> &str {
        match self {
            PaymentType::Fixed => "fixed",
            PaymentType::Milestone => "milestone",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "milestone_status", rename_all = "snake_case")]
pub enum MilestoneStatus {
    Pending,
    InProgress,
    Submitted,
    Rejected,
    Approved,
    Released,
}

impl MilestoneStatus {
    pub fn to_str(&self) -> &str {
        match self {
            MilestoneStatus::Pending => "pending",
            MilestoneStatus::InProgress => "in_progress",
            MilestoneStatus::Submitted => "submitted",
            MilestoneStatus::Rejected => "rejected",
            MilestoneStatus::Approved => "approved",
            MilestoneStatus::Released => "released",
        }
    }

    /// A freelancer may (re)submit work from these states only.
    pub fn can_submit(&self) -> bool {
        matches!(
            self,
            MilestoneStatus::Pending | MilestoneStatus::InProgress | MilestoneStatus::Rejected
        )
    }

    /// Force-approval during dispute resolution covers work that was handed
    /// over but not yet paid out.
    pub fn is_delivered(&self) -> bool {
        matches!(self, MilestoneStatus::Submitted | MilestoneStatus::Approved)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "milestone_payment_status", rename_all = "snake_case")]
pub enum MilestonePaymentStatus {
    Pending,
    Funded,
    Released,
    Refunded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contract {
    pub id: Uuid,
    pub job_id: Uuid,
    pub client_id: Uuid,
    pub freelancer_id: Uuid,
    pub title: String,
    pub description: String,
    pub total_amount: BigDecimal,
    pub payment_type: PaymentType,
    pub status: ContractStatus,
    pub client_signed_at: Option<DateTime<Utc>>,
    pub freelancer_signed_at: Option<DateTime<Utc>>,
    pub is_editable: Option<bool>,          // Database has DEFAULT TRUE, can be NULL
    pub deadline: Option<DateTime<Utc>>,
    pub escrow_funded_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completion_note: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub created_at: Option<DateTime<Utc>>,  // Database has DEFAULT NOW(), can be NULL
    pub last_edited_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContractParty {
    Client,
    Freelancer,
}

impl Contract {
    /// Re-derive the actor's party from the persisted row. Callers must never
    /// trust a client-supplied role claim.
    pub fn party_of(&self, user_id: Uuid) -> Option<ContractParty> {
        if self.client_id == user_id {
            Some(ContractParty::Client)
        } else if self.freelancer_id == user_id {
            Some(ContractParty::Freelancer)
        } else {
            None
        }
    }

    pub fn counterparty_id(&self, user_id: Uuid) -> Uuid {
        if self.client_id == user_id {
            self.freelancer_id
        } else {
            self.client_id
        }
    }

    pub fn editable(&self) -> bool {
        self.is_editable.unwrap_or(false) && self.freelancer_signed_at.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Milestone {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub title: String,
    pub amount: BigDecimal,
    pub deadline: Option<DateTime<Utc>>,
    pub position: i32,
    pub status: MilestoneStatus,
    pub payment_status: Option<MilestonePaymentStatus>, // Database has DEFAULT 'pending', can be NULL
    pub submission_note: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Immutable snapshot written on every successful contract edit. `previous`
/// and `updated` hold the full editable field set including milestones.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContractEdit {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub edited_by: Uuid,
    pub previous: serde_json::Value,
    pub updated: serde_json::Value,
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_activates_only_forward() {
        assert!(ContractStatus::Pending.can_transition_to(ContractStatus::Active));
        assert!(!ContractStatus::Active.can_transition_to(ContractStatus::Pending));
        assert!(!ContractStatus::Pending.can_transition_to(ContractStatus::Completed));
    }

    #[test]
    fn test_terminal_states_admit_nothing() {
        for to in [
            ContractStatus::Draft,
            ContractStatus::Pending,
            ContractStatus::Active,
            ContractStatus::PendingCompletion,
            ContractStatus::Completed,
            ContractStatus::Cancelled,
        ] {
            assert!(!ContractStatus::Completed.can_transition_to(to));
            assert!(!ContractStatus::Cancelled.can_transition_to(to));
        }
    }

    #[test]
    fn test_cancel_reachable_from_pending_and_active() {
        assert!(ContractStatus::Pending.can_transition_to(ContractStatus::Cancelled));
        assert!(ContractStatus::Active.can_transition_to(ContractStatus::Cancelled));
        assert!(!ContractStatus::Draft.can_transition_to(ContractStatus::Cancelled));
    }

    #[test]
    fn test_milestone_submit_window() {
        assert!(MilestoneStatus::Pending.can_submit());
        assert!(MilestoneStatus::InProgress.can_submit());
        assert!(MilestoneStatus::Rejected.can_submit());
        assert!(!MilestoneStatus::Submitted.can_submit());
        assert!(!MilestoneStatus::Approved.can_submit());
        assert!(!MilestoneStatus::Released.can_submit());
    }
}
