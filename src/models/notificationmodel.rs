use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notif_type: String,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub read: Option<bool>,                 // Database has DEFAULT FALSE, can be NULL
    pub created_at: Option<DateTime<Utc>>,
}
