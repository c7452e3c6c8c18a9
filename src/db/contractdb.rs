// db/contractdb.rs
use async_trait::async_trait;
use sqlx::types::BigDecimal;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::dtos::contractdtos::EditContractDto;
use crate::models::contractmodel::*;

#[async_trait]
pub trait ContractExt {
    async fn get_contract_by_id(&self, contract_id: Uuid) -> Result<Option<Contract>, Error>;

    async fn get_contract_milestones(&self, contract_id: Uuid) -> Result<Vec<Milestone>, Error>;

    async fn get_milestone_by_id(&self, milestone_id: Uuid) -> Result<Option<Milestone>, Error>;

    // Signing. Both updates are conditional on the current signature state so
    // a concurrent duplicate sign cannot overwrite a timestamp; when the
    // counter-party has already signed, status flips to active in the same
    // statement. Returns None when the condition did not match.
    async fn record_client_signature(&self, contract_id: Uuid) -> Result<Option<Contract>, Error>;

    async fn record_freelancer_signature(&self, contract_id: Uuid)
        -> Result<Option<Contract>, Error>;

    // Full-contract completion for fixed-price contracts
    async fn submit_contract_completion(
        &self,
        contract_id: Uuid,
        completion_note: Option<String>,
    ) -> Result<Option<Contract>, Error>;

    async fn approve_contract_completion(&self, contract_id: Uuid)
        -> Result<Option<Contract>, Error>;

    // Auto-completion once every milestone has been released
    async fn complete_contract(&self, contract_id: Uuid) -> Result<Option<Contract>, Error>;

    async fn cancel_contract(
        &self,
        contract_id: Uuid,
        reason: String,
    ) -> Result<Option<Contract>, Error>;

    async fn mark_escrow_funded(&self, contract_id: Uuid) -> Result<Option<Contract>, Error>;

    // Applies an edit atomically: contract fields, milestone diff/merge and
    // the immutable history snapshot all commit together.
    async fn edit_contract(
        &self,
        contract_id: Uuid,
        edited_by: Uuid,
        changes: &EditContractDto,
        previous: serde_json::Value,
        updated: serde_json::Value,
    ) -> Result<Contract, Error>;

    async fn get_contract_edits(&self, contract_id: Uuid) -> Result<Vec<ContractEdit>, Error>;

    //Milestone state machine
    async fn submit_milestone(
        &self,
        milestone_id: Uuid,
        submission_note: String,
    ) -> Result<Option<Milestone>, Error>;

    async fn approve_milestone(&self, milestone_id: Uuid) -> Result<Option<Milestone>, Error>;

    async fn reject_milestone(&self, milestone_id: Uuid) -> Result<Option<Milestone>, Error>;

    async fn release_milestone(&self, milestone_id: Uuid) -> Result<Option<Milestone>, Error>;

    async fn mark_milestone_funded(&self, milestone_id: Uuid) -> Result<Option<Milestone>, Error>;

    async fn count_unreleased_milestones(&self, contract_id: Uuid) -> Result<i64, Error>;

    async fn get_delivered_milestones(&self, contract_id: Uuid) -> Result<Vec<Milestone>, Error>;
}

#[async_trait]
impl ContractExt for DBClient {
    async fn get_contract_by_id(&self, contract_id: Uuid) -> Result<Option<Contract>, Error> {
        sqlx::query_as::<_, Contract>(
            r#"
            SELECT id, job_id, client_id, freelancer_id, title, description,
                   total_amount, payment_type, status,
                   client_signed_at, freelancer_signed_at, is_editable, deadline,
                   escrow_funded_at, completed_at, completion_note,
                   cancelled_at, cancellation_reason, created_at, last_edited_at
            FROM contracts
            WHERE id = $1
            "#,
        )
        .bind(contract_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_contract_milestones(&self, contract_id: Uuid) -> Result<Vec<Milestone>, Error> {
        sqlx::query_as::<_, Milestone>(
            r#"
            SELECT id, contract_id, title, amount, deadline, position, status,
                   payment_status, submission_note, completed_at, approved_at,
                   released_at, created_at, updated_at
            FROM milestones
            WHERE contract_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(contract_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_milestone_by_id(&self, milestone_id: Uuid) -> Result<Option<Milestone>, Error> {
        sqlx::query_as::<_, Milestone>(
            r#"
            SELECT id, contract_id, title, amount, deadline, position, status,
                   payment_status, submission_note, completed_at, approved_at,
                   released_at, created_at, updated_at
            FROM milestones
            WHERE id = $1
            "#,
        )
        .bind(milestone_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn record_client_signature(&self, contract_id: Uuid) -> Result<Option<Contract>, Error> {
        sqlx::query_as::<_, Contract>(
            r#"
            UPDATE contracts
            SET client_signed_at = NOW(),
                status = CASE
                    WHEN freelancer_signed_at IS NOT NULL THEN 'active'::contract_status
                    ELSE status
                END
            WHERE id = $1
              AND status = 'pending'
              AND client_signed_at IS NULL
            RETURNING id, job_id, client_id, freelancer_id, title, description,
                      total_amount, payment_type, status,
                      client_signed_at, freelancer_signed_at, is_editable, deadline,
                      escrow_funded_at, completed_at, completion_note,
                      cancelled_at, cancellation_reason, created_at, last_edited_at
            "#,
        )
        .bind(contract_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn record_freelancer_signature(
        &self,
        contract_id: Uuid,
    ) -> Result<Option<Contract>, Error> {
        // The freelancer's signature also freezes editing
        sqlx::query_as::<_, Contract>(
            r#"
            UPDATE contracts
            SET freelancer_signed_at = NOW(),
                is_editable = FALSE,
                status = CASE
                    WHEN client_signed_at IS NOT NULL THEN 'active'::contract_status
                    ELSE status
                END
            WHERE id = $1
              AND status = 'pending'
              AND freelancer_signed_at IS NULL
            RETURNING id, job_id, client_id, freelancer_id, title, description,
                      total_amount, payment_type, status,
                      client_signed_at, freelancer_signed_at, is_editable, deadline,
                      escrow_funded_at, completed_at, completion_note,
                      cancelled_at, cancellation_reason, created_at, last_edited_at
            "#,
        )
        .bind(contract_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn submit_contract_completion(
        &self,
        contract_id: Uuid,
        completion_note: Option<String>,
    ) -> Result<Option<Contract>, Error> {
        sqlx::query_as::<_, Contract>(
            r#"
            UPDATE contracts
            SET status = 'pending_completion', completion_note = $2
            WHERE id = $1 AND status = 'active'
            RETURNING id, job_id, client_id, freelancer_id, title, description,
                      total_amount, payment_type, status,
                      client_signed_at, freelancer_signed_at, is_editable, deadline,
                      escrow_funded_at, completed_at, completion_note,
                      cancelled_at, cancellation_reason, created_at, last_edited_at
            "#,
        )
        .bind(contract_id)
        .bind(completion_note)
        .fetch_optional(&self.pool)
        .await
    }

    async fn approve_contract_completion(
        &self,
        contract_id: Uuid,
    ) -> Result<Option<Contract>, Error> {
        sqlx::query_as::<_, Contract>(
            r#"
            UPDATE contracts
            SET status = 'completed', completed_at = NOW()
            WHERE id = $1 AND status = 'pending_completion'
            RETURNING id, job_id, client_id, freelancer_id, title, description,
                      total_amount, payment_type, status,
                      client_signed_at, freelancer_signed_at, is_editable, deadline,
                      escrow_funded_at, completed_at, completion_note,
                      cancelled_at, cancellation_reason, created_at, last_edited_at
            "#,
        )
        .bind(contract_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn complete_contract(&self, contract_id: Uuid) -> Result<Option<Contract>, Error> {
        sqlx::query_as::<_, Contract>(
            r#"
            UPDATE contracts
            SET status = 'completed', completed_at = NOW()
            WHERE id = $1 AND status = 'active'
            RETURNING id, job_id, client_id, freelancer_id, title, description,
                      total_amount, payment_type, status,
                      client_signed_at, freelancer_signed_at, is_editable, deadline,
                      escrow_funded_at, completed_at, completion_note,
                      cancelled_at, cancellation_reason, created_at, last_edited_at
            "#,
        )
        .bind(contract_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn cancel_contract(
        &self,
        contract_id: Uuid,
        reason: String,
    ) -> Result<Option<Contract>, Error> {
        sqlx::query_as::<_, Contract>(
            r#"
            UPDATE contracts
            SET status = 'cancelled', cancelled_at = NOW(), cancellation_reason = $2
            WHERE id = $1 AND status IN ('pending', 'active', 'pending_completion')
            RETURNING id, job_id, client_id, freelancer_id, title, description,
                      total_amount, payment_type, status,
                      client_signed_at, freelancer_signed_at, is_editable, deadline,
                      escrow_funded_at, completed_at, completion_note,
                      cancelled_at, cancellation_reason, created_at, last_edited_at
            "#,
        )
        .bind(contract_id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await
    }

    async fn mark_escrow_funded(&self, contract_id: Uuid) -> Result<Option<Contract>, Error> {
        sqlx::query_as::<_, Contract>(
            r#"
            UPDATE contracts
            SET escrow_funded_at = NOW()
            WHERE id = $1 AND escrow_funded_at IS NULL
            RETURNING id, job_id, client_id, freelancer_id, title, description,
                      total_amount, payment_type, status,
                      client_signed_at, freelancer_signed_at, is_editable, deadline,
                      escrow_funded_at, completed_at, completion_note,
                      cancelled_at, cancellation_reason, created_at, last_edited_at
            "#,
        )
        .bind(contract_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn edit_contract(
        &self,
        contract_id: Uuid,
        edited_by: Uuid,
        changes: &EditContractDto,
        previous: serde_json::Value,
        updated: serde_json::Value,
    ) -> Result<Contract, Error> {
        let total_amount = BigDecimal::try_from(changes.total_amount).unwrap_or_default();

        let mut tx = self.pool.begin().await?;

        let contract = sqlx::query_as::<_, Contract>(
            r#"
            UPDATE contracts
            SET title = $2, description = $3, total_amount = $4,
                payment_type = $5, deadline = $6, last_edited_at = NOW()
            WHERE id = $1
            RETURNING id, job_id, client_id, freelancer_id, title, description,
                      total_amount, payment_type, status,
                      client_signed_at, freelancer_signed_at, is_editable, deadline,
                      escrow_funded_at, completed_at, completion_note,
                      cancelled_at, cancellation_reason, created_at, last_edited_at
            "#,
        )
        .bind(contract_id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(total_amount)
        .bind(changes.payment_type)
        .bind(changes.deadline)
        .fetch_one(&mut *tx)
        .await?;

        // Milestone diff/merge keyed on stable ids: rows named in the payload
        // are updated, id-less entries inserted, the rest deleted.
        let keep_ids: Vec<Uuid> = changes.milestones.iter().filter_map(|m| m.id).collect();

        sqlx::query(
            r#"
            DELETE FROM milestones
            WHERE contract_id = $1 AND NOT (id = ANY($2))
            "#,
        )
        .bind(contract_id)
        .bind(&keep_ids)
        .execute(&mut *tx)
        .await?;

        for (position, milestone) in changes.milestones.iter().enumerate() {
            let amount = BigDecimal::try_from(milestone.amount).unwrap_or_default();

            match milestone.id {
                Some(milestone_id) => {
                    sqlx::query(
                        r#"
                        UPDATE milestones
                        SET title = $3, amount = $4, deadline = $5, position = $6,
                            updated_at = NOW()
                        WHERE id = $1 AND contract_id = $2
                        "#,
                    )
                    .bind(milestone_id)
                    .bind(contract_id)
                    .bind(&milestone.title)
                    .bind(amount)
                    .bind(milestone.deadline)
                    .bind(position as i32)
                    .execute(&mut *tx)
                    .await?;
                }
                None => {
                    sqlx::query(
                        r#"
                        INSERT INTO milestones (contract_id, title, amount, deadline, position)
                        VALUES ($1, $2, $3, $4, $5)
                        "#,
                    )
                    .bind(contract_id)
                    .bind(&milestone.title)
                    .bind(amount)
                    .bind(milestone.deadline)
                    .bind(position as i32)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        sqlx::query(
            r#"
            INSERT INTO contract_edits (contract_id, edited_by, previous, updated)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(contract_id)
        .bind(edited_by)
        .bind(previous)
        .bind(updated)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(contract)
    }

    async fn get_contract_edits(&self, contract_id: Uuid) -> Result<Vec<ContractEdit>, Error> {
        sqlx::query_as::<_, ContractEdit>(
            r#"
            SELECT id, contract_id, edited_by, previous, updated, created_at
            FROM contract_edits
            WHERE contract_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(contract_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn submit_milestone(
        &self,
        milestone_id: Uuid,
        submission_note: String,
    ) -> Result<Option<Milestone>, Error> {
        sqlx::query_as::<_, Milestone>(
            r#"
            UPDATE milestones
            SET status = 'submitted', submission_note = $2, completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'in_progress', 'rejected')
            RETURNING id, contract_id, title, amount, deadline, position, status,
                      payment_status, submission_note, completed_at, approved_at,
                      released_at, created_at, updated_at
            "#,
        )
        .bind(milestone_id)
        .bind(submission_note)
        .fetch_optional(&self.pool)
        .await
    }

    async fn approve_milestone(&self, milestone_id: Uuid) -> Result<Option<Milestone>, Error> {
        sqlx::query_as::<_, Milestone>(
            r#"
            UPDATE milestones
            SET status = 'approved', approved_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'submitted'
            RETURNING id, contract_id, title, amount, deadline, position, status,
                      payment_status, submission_note, completed_at, approved_at,
                      released_at, created_at, updated_at
            "#,
        )
        .bind(milestone_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn reject_milestone(&self, milestone_id: Uuid) -> Result<Option<Milestone>, Error> {
        sqlx::query_as::<_, Milestone>(
            r#"
            UPDATE milestones
            SET status = 'rejected', updated_at = NOW()
            WHERE id = $1 AND status = 'submitted'
            RETURNING id, contract_id, title, amount, deadline, position, status,
                      payment_status, submission_note, completed_at, approved_at,
                      released_at, created_at, updated_at
            "#,
        )
        .bind(milestone_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn release_milestone(&self, milestone_id: Uuid) -> Result<Option<Milestone>, Error> {
        sqlx::query_as::<_, Milestone>(
            r#"
            UPDATE milestones
            SET status = 'released', payment_status = 'released',
                released_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'approved'
            RETURNING id, contract_id, title, amount, deadline, position, status,
                      payment_status, submission_note, completed_at, approved_at,
                      released_at, created_at, updated_at
            "#,
        )
        .bind(milestone_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn mark_milestone_funded(&self, milestone_id: Uuid) -> Result<Option<Milestone>, Error> {
        sqlx::query_as::<_, Milestone>(
            r#"
            UPDATE milestones
            SET payment_status = 'funded', updated_at = NOW()
            WHERE id = $1 AND payment_status = 'pending'
            RETURNING id, contract_id, title, amount, deadline, position, status,
                      payment_status, submission_note, completed_at, approved_at,
                      released_at, created_at, updated_at
            "#,
        )
        .bind(milestone_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn count_unreleased_milestones(&self, contract_id: Uuid) -> Result<i64, Error> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM milestones
            WHERE contract_id = $1 AND status <> 'released'
            "#,
        )
        .bind(contract_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    async fn get_delivered_milestones(&self, contract_id: Uuid) -> Result<Vec<Milestone>, Error> {
        sqlx::query_as::<_, Milestone>(
            r#"
            SELECT id, contract_id, title, amount, deadline, position, status,
                   payment_status, submission_note, completed_at, approved_at,
                   released_at, created_at, updated_at
            FROM milestones
            WHERE contract_id = $1 AND status IN ('submitted', 'approved')
            ORDER BY position ASC
            "#,
        )
        .bind(contract_id)
        .fetch_all(&self.pool)
        .await
    }
}
