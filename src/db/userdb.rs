// db/userdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::usermodel::User;

#[async_trait]
pub trait UserExt {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
        stripe_account_id: Option<&str>,
    ) -> Result<Option<User>, Error>;

    async fn update_payout_capabilities(
        &self,
        stripe_account_id: &str,
        charges_enabled: bool,
        payouts_enabled: bool,
    ) -> Result<Option<User>, Error>;
}

#[async_trait]
impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
        stripe_account_id: Option<&str>,
    ) -> Result<Option<User>, Error> {
        let mut user: Option<User> = None;

        if let Some(user_id) = user_id {
            user = sqlx::query_as::<_, User>(
                r#"
                SELECT id, name, username, email, role, stripe_account_id,
                       charges_enabled, payouts_enabled, created_at, updated_at
                FROM users
                WHERE id = $1
                "#,
            )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(email) = email {
            user = sqlx::query_as::<_, User>(
                r#"
                SELECT id, name, username, email, role, stripe_account_id,
                       charges_enabled, payouts_enabled, created_at, updated_at
                FROM users
                WHERE email = $1
                "#,
            )
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(stripe_account_id) = stripe_account_id {
            user = sqlx::query_as::<_, User>(
                r#"
                SELECT id, name, username, email, role, stripe_account_id,
                       charges_enabled, payouts_enabled, created_at, updated_at
                FROM users
                WHERE stripe_account_id = $1
                "#,
            )
            .bind(stripe_account_id)
            .fetch_optional(&self.pool)
            .await?;
        }

        Ok(user)
    }

    async fn update_payout_capabilities(
        &self,
        stripe_account_id: &str,
        charges_enabled: bool,
        payouts_enabled: bool,
    ) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET charges_enabled = $2, payouts_enabled = $3, updated_at = NOW()
            WHERE stripe_account_id = $1
            RETURNING id, name, username, email, role, stripe_account_id,
                      charges_enabled, payouts_enabled, created_at, updated_at
            "#,
        )
        .bind(stripe_account_id)
        .bind(charges_enabled)
        .bind(payouts_enabled)
        .fetch_optional(&self.pool)
        .await
    }
}
