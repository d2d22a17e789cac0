// src/db/feedback_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_unique_violation, error::AppError},
    models::lead::{Bid, FeedbackHeaderRow, FeedbackItem, LeadBid, LeadFeedback, NewFeedbackItem},
};

// Feedbacks por (lead, membro) e os lances dados nos leads
#[derive(Clone)]
pub struct FeedbackRepository {
    pool: PgPool,
}

impl FeedbackRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  FEEDBACK
    // =========================================================================

    /// Garante o registro de feedback do par (lead, membro).
    /// Se já existir, só troca as imagens; o nome do formulário original é mantido.
    pub async fn upsert_feedback<'e, E>(
        &self,
        executor: E,
        lead_id: Uuid,
        member_id: Uuid,
        dept_id: Uuid,
        form_name: Option<&str>,
        image_urls: &[String],
    ) -> Result<LeadFeedback, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let feedback = sqlx::query_as::<_, LeadFeedback>(
            r#"
            INSERT INTO lead_feedbacks (lead_id, member_id, dept_id, form_name, image_urls)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (lead_id, member_id) DO UPDATE
            SET image_urls = EXCLUDED.image_urls,
                form_name = COALESCE(lead_feedbacks.form_name, EXCLUDED.form_name),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .bind(member_id)
        .bind(dept_id)
        .bind(form_name)
        .bind(image_urls)
        .fetch_one(executor)
        .await?;

        Ok(feedback)
    }

    pub async fn list_items<'e, E>(
        &self,
        executor: E,
        feedback_id: Uuid,
    ) -> Result<Vec<FeedbackItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, FeedbackItem>(
            "SELECT * FROM feedback_items WHERE lead_feedback_id = $1 ORDER BY created_at ASC, name ASC",
        )
        .bind(feedback_id)
        .fetch_all(executor)
        .await?;

        Ok(items)
    }

    pub async fn delete_items<'e, E>(&self, executor: E, item_ids: &[Uuid]) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if item_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM feedback_items WHERE id = ANY($1)")
            .bind(item_ids)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn insert_item<'e, E>(
        &self,
        executor: E,
        feedback_id: Uuid,
        lead_id: Uuid,
        item: &NewFeedbackItem,
    ) -> Result<FeedbackItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, FeedbackItem>(
            r#"
            INSERT INTO feedback_items (lead_feedback_id, lead_id, name, value, field_type)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(feedback_id)
        .bind(lead_id)
        .bind(&item.name)
        .bind(&item.value)
        .bind(item.field_type)
        .fetch_one(executor)
        .await?;

        Ok(item)
    }

    /// Cabeçalhos de feedback (com autor e cargo) de vários leads.
    pub async fn list_feedback_headers<'e, E>(
        &self,
        executor: E,
        lead_ids: &[Uuid],
    ) -> Result<Vec<FeedbackHeaderRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, FeedbackHeaderRow>(
            r#"
            SELECT
                lf.id, lf.lead_id, lf.member_id, lf.dept_id, lf.form_name, lf.image_urls,
                lf.created_at, lf.updated_at,
                m.name AS member_name,
                r.name AS role_name
            FROM lead_feedbacks lf
            JOIN members m ON m.id = lf.member_id
            LEFT JOIN roles r ON r.id = m.role_id
            WHERE lf.lead_id = ANY($1)
            ORDER BY lf.created_at ASC
            "#,
        )
        .bind(lead_ids)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }

    pub async fn list_items_for_feedbacks<'e, E>(
        &self,
        executor: E,
        feedback_ids: &[Uuid],
    ) -> Result<Vec<FeedbackItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, FeedbackItem>(
            r#"
            SELECT * FROM feedback_items
            WHERE lead_feedback_id = ANY($1)
            ORDER BY created_at ASC, name ASC
            "#,
        )
        .bind(feedback_ids)
        .fetch_all(executor)
        .await?;

        Ok(items)
    }

    // =========================================================================
    //  LANCES
    // =========================================================================

    pub async fn find_bid<'e, E>(
        &self,
        executor: E,
        lead_id: Uuid,
        member_id: Uuid,
    ) -> Result<Option<Bid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let bid = sqlx::query_as::<_, Bid>("SELECT * FROM bids WHERE lead_id = $1 AND member_id = $2")
            .bind(lead_id)
            .bind(member_id)
            .fetch_optional(executor)
            .await?;

        Ok(bid)
    }

    pub async fn create_bid<'e, E>(
        &self,
        executor: E,
        lead_id: Uuid,
        member_id: Uuid,
        bid_amount: Decimal,
        description: Option<&str>,
    ) -> Result<Bid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // A constraint UNIQUE (lead_id, member_id) cobre a corrida entre duas requisições
        sqlx::query_as::<_, Bid>(
            r#"
            INSERT INTO bids (lead_id, member_id, bid_amount, description)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .bind(member_id)
        .bind(bid_amount)
        .bind(description)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, "Lance já enviado para este lead."))
    }

    /// Lances de um lead, só se o lead for da empresa informada.
    pub async fn list_lead_bids(&self, company_id: Uuid, lead_id: Uuid) -> Result<Vec<LeadBid>, AppError> {
        let bids = sqlx::query_as::<_, LeadBid>(
            r#"
            SELECT
                b.id, b.lead_id, b.member_id, b.bid_amount, b.description, b.created_at,
                m.name AS member_name, m.email AS member_email
            FROM bids b
            JOIN members m ON m.id = b.member_id
            JOIN leads l ON l.id = b.lead_id
            WHERE b.lead_id = $1 AND l.company_id = $2
            ORDER BY b.created_at ASC
            "#,
        )
        .bind(lead_id)
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bids)
    }
}
