use chrono::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum UserRole {
    SuperAdmin,
    Admin,
    Client,
    Freelancer,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::SuperAdmin => "super_admin",
            UserRole::Admin => "admin",
            UserRole::Client => "client",
            UserRole::Freelancer => "freelancer",
        }
    }

    /// Back-office staff: allowed to resolve disputes and inspect any contract.
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::SuperAdmin)
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: uuid::Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub role: UserRole,

    // Payout account fields, kept in sync by the payment bridge's
    // account.updated handler
    pub stripe_account_id: Option<String>,
    pub charges_enabled: Option<bool>,
    pub payouts_enabled: Option<bool>,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn payout_ready(&self) -> bool {
        self.charges_enabled.unwrap_or(false) && self.payouts_enabled.unwrap_or(false)
    }
}
