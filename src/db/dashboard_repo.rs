// src/db/dashboard_repo.rs

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::dashboard::{FeedbackActivityRow, LeadActivityRow},
};

#[derive(Clone)]
pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Leads criados em `[from, until)` e todos os feedbacks deles (com cargo do autor).
    /// As duas consultas rodam na mesma transação para enxergarem o mesmo snapshot.
    pub async fn load_lead_activity(
        &self,
        company_id: Uuid,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<(Vec<LeadActivityRow>, Vec<FeedbackActivityRow>), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;

        let leads = sqlx::query_as::<_, LeadActivityRow>(
            r#"
            SELECT id, call_status, created_at
            FROM leads
            WHERE company_id = $1
              AND created_at >= $2
              AND created_at < $3
            ORDER BY created_at ASC
            "#,
        )
        .bind(company_id)
        .bind(from)
        .bind(until)
        .fetch_all(&mut *tx)
        .await?;

        let feedback = sqlx::query_as::<_, FeedbackActivityRow>(
            r#"
            SELECT
                lf.id AS feedback_id,
                lf.lead_id,
                lf.form_name,
                r.name AS role_name,
                fi.name AS item_name,
                fi.value AS item_value
            FROM lead_feedbacks lf
            JOIN leads l ON l.id = lf.lead_id
            LEFT JOIN members m ON m.id = lf.member_id
            LEFT JOIN roles r ON r.id = m.role_id
            LEFT JOIN feedback_items fi ON fi.lead_feedback_id = lf.id
            WHERE l.company_id = $1
              AND l.created_at >= $2
              AND l.created_at < $3
            ORDER BY lf.id, fi.created_at
            "#,
        )
        .bind(company_id)
        .bind(from)
        .bind(until)
        .fetch_all(&mut *tx)
        .await?;

        // Só leitura; o commit apenas fecha a transação
        tx.commit().await?;

        Ok((leads, feedback))
    }
}
