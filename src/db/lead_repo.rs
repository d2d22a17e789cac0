// src/db/lead_repo.rs

use chrono::NaiveDate;
use serde_json::Value;
use sqlx::{Executor, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::lead::{
        CallStatus, Lead, LeadAssignee, LeadFields, LeadTransfer, LeadTransferEntry, PaymentStatus,
    },
};

#[derive(Clone)]
pub struct LeadRepository {
    pool: PgPool,
}

impl LeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  LEADS
    // =========================================================================

    pub async fn create_lead<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        fields: &LeadFields,
    ) -> Result<Lead, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (
                company_id, name, email, phone, alternate_phone,
                address, city, state, zip, rating,
                vehicle_date, vehicle_name, vehicle_model,
                call_status, payment_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(&fields.name)
        .bind(&fields.email)
        .bind(&fields.phone)
        .bind(fields.alternate_phone.as_deref())
        .bind(&fields.address)
        .bind(&fields.city)
        .bind(&fields.state)
        .bind(&fields.zip)
        .bind(fields.rating)
        .bind(fields.vehicle_date)
        .bind(fields.vehicle_name.as_deref())
        .bind(fields.vehicle_model.as_deref())
        .bind(CallStatus::Pending)
        .bind(PaymentStatus::Pending)
        .fetch_one(executor)
        .await?;

        Ok(lead)
    }

    pub async fn update_lead<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        lead_id: Uuid,
        fields: &LeadFields,
        next_follow_up_date: Option<NaiveDate>,
    ) -> Result<Option<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            UPDATE leads
            SET name = $3, email = $4, phone = $5, alternate_phone = $6,
                address = $7, city = $8, state = $9, zip = $10, rating = $11,
                vehicle_date = $12, vehicle_name = $13, vehicle_model = $14,
                next_follow_up_date = COALESCE($15, next_follow_up_date),
                updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .bind(company_id)
        .bind(&fields.name)
        .bind(&fields.email)
        .bind(&fields.phone)
        .bind(fields.alternate_phone.as_deref())
        .bind(&fields.address)
        .bind(&fields.city)
        .bind(&fields.state)
        .bind(&fields.zip)
        .bind(fields.rating)
        .bind(fields.vehicle_date)
        .bind(fields.vehicle_name.as_deref())
        .bind(fields.vehicle_model.as_deref())
        .bind(next_follow_up_date)
        .fetch_optional(executor)
        .await?;

        Ok(lead)
    }

    /// Busca o lead sempre dentro do escopo da empresa.
    pub async fn find_lead<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        lead_id: Uuid,
    ) -> Result<Option<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lead = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = $1 AND company_id = $2")
            .bind(lead_id)
            .bind(company_id)
            .fetch_optional(executor)
            .await?;

        Ok(lead)
    }

    /// Dos ids pedidos, devolve os que existem na empresa.
    pub async fn find_existing_lead_ids<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        lead_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM leads WHERE company_id = $1 AND id = ANY($2)",
        )
        .bind(company_id)
        .bind(lead_ids)
        .fetch_all(executor)
        .await?;

        Ok(ids)
    }

    pub async fn list_leads_by_ids<'e, E>(
        &self,
        executor: E,
        lead_ids: &[Uuid],
    ) -> Result<Vec<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let leads = sqlx::query_as::<_, Lead>(
            "SELECT * FROM leads WHERE id = ANY($1) ORDER BY created_at DESC",
        )
        .bind(lead_ids)
        .fetch_all(executor)
        .await?;

        Ok(leads)
    }

    pub async fn list_company_leads<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
    ) -> Result<Vec<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let leads = sqlx::query_as::<_, Lead>(
            "SELECT * FROM leads WHERE company_id = $1 ORDER BY created_at DESC",
        )
        .bind(company_id)
        .fetch_all(executor)
        .await?;

        Ok(leads)
    }

    /// Leads em que o membro está entre os responsáveis atuais.
    pub async fn list_assigned_leads<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        member_id: Uuid,
    ) -> Result<Vec<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let leads = sqlx::query_as::<_, Lead>(
            r#"
            SELECT l.*
            FROM leads l
            WHERE l.company_id = $1
              AND EXISTS (
                SELECT 1 FROM lead_members lm
                WHERE lm.lead_id = l.id AND lm.member_id = $2
              )
            ORDER BY l.created_at DESC
            "#,
        )
        .bind(company_id)
        .bind(member_id)
        .fetch_all(executor)
        .await?;

        Ok(leads)
    }

    /// Leads que o membro já transferiu para outra pessoa.
    pub async fn list_transferred_leads(
        &self,
        company_id: Uuid,
        member_id: Uuid,
    ) -> Result<Vec<Lead>, AppError> {
        let leads = sqlx::query_as::<_, Lead>(
            r#"
            SELECT l.*
            FROM leads l
            WHERE l.company_id = $2
              AND EXISTS (
                SELECT 1 FROM lead_transfers t
                WHERE t.lead_id = l.id AND t.transfer_by_id = $1
            )
            ORDER BY l.created_at DESC
            "#,
        )
        .bind(member_id)
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(leads)
    }

    pub async fn set_lead_approved<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        lead_id: Uuid,
        approved: bool,
    ) -> Result<Option<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            UPDATE leads SET is_lead_approved = $3, updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .bind(company_id)
        .bind(approved)
        .fetch_optional(executor)
        .await?;

        Ok(lead)
    }

    pub async fn set_financed_approved<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        lead_id: Uuid,
        approved: bool,
    ) -> Result<Option<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            UPDATE leads SET is_financed_approved = $3, updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .bind(company_id)
        .bind(approved)
        .fetch_optional(executor)
        .await?;

        Ok(lead)
    }

    pub async fn set_follow_up_date<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        lead_id: Uuid,
        follow_up_date: NaiveDate,
    ) -> Result<Option<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            UPDATE leads SET next_follow_up_date = $3, updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .bind(company_id)
        .bind(follow_up_date)
        .fetch_optional(executor)
        .await?;

        Ok(lead)
    }

    /// Resultado da ligação: status e próxima data de retorno.
    pub async fn update_call_outcome<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        lead_id: Uuid,
        call_status: CallStatus,
        payment_status: PaymentStatus,
        next_follow_up_date: Option<NaiveDate>,
    ) -> Result<Option<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            UPDATE leads
            SET call_status = $3, payment_status = $4,
                next_follow_up_date = $5, updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .bind(company_id)
        .bind(call_status)
        .bind(payment_status)
        .bind(next_follow_up_date)
        .fetch_optional(executor)
        .await?;

        Ok(lead)
    }

    // =========================================================================
    //  RESPONSÁVEIS (lead_members)
    // =========================================================================

    /// Atribuição em massa: apaga os responsáveis atuais dos leads e grava
    /// exatamente os pares informados. Um lead pode ficar com vários membros.
    /// Deve rodar dentro de uma transação (recebe a conexão dela).
    pub async fn replace_assignees(
        &self,
        conn: &mut PgConnection,
        lead_ids: &[Uuid],
        pairs: &[(Uuid, Uuid)],
    ) -> Result<u64, AppError> {
        sqlx::query("DELETE FROM lead_members WHERE lead_id = ANY($1)")
            .bind(lead_ids)
            .execute(&mut *conn)
            .await?;

        let (leads, members): (Vec<Uuid>, Vec<Uuid>) = pairs.iter().copied().unzip();

        let result = sqlx::query(
            r#"
            INSERT INTO lead_members (lead_id, member_id)
            SELECT * FROM UNNEST($1::uuid[], $2::uuid[])
            ON CONFLICT (lead_id, member_id) DO NOTHING
            "#,
        )
        .bind(&leads)
        .bind(&members)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Dono único: o lead passa a ter só `member_id` como responsável.
    /// Deve rodar dentro de uma transação (recebe a conexão dela).
    pub async fn set_sole_assignee(
        &self,
        conn: &mut PgConnection,
        lead_id: Uuid,
        member_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM lead_members WHERE lead_id = $1")
            .bind(lead_id)
            .execute(&mut *conn)
            .await?;

        sqlx::query("INSERT INTO lead_members (lead_id, member_id) VALUES ($1, $2)")
            .bind(lead_id)
            .bind(member_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    pub async fn remove_assignee<'e, E>(
        &self,
        executor: E,
        lead_id: Uuid,
        member_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM lead_members WHERE lead_id = $1 AND member_id = $2")
            .bind(lead_id)
            .bind(member_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn list_assignees<'e, E>(
        &self,
        executor: E,
        lead_ids: &[Uuid],
    ) -> Result<Vec<LeadAssignee>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let assignees = sqlx::query_as::<_, LeadAssignee>(
            r#"
            SELECT lm.lead_id, lm.member_id, m.name, m.email, lm.created_at AS assigned_at
            FROM lead_members lm
            JOIN members m ON m.id = lm.member_id
            WHERE lm.lead_id = ANY($1)
            ORDER BY lm.created_at ASC, m.name ASC
            "#,
        )
        .bind(lead_ids)
        .fetch_all(executor)
        .await?;

        Ok(assignees)
    }

    // =========================================================================
    //  TRANSFERÊNCIAS
    // =========================================================================

    pub async fn create_transfer<'e, E>(
        &self,
        executor: E,
        lead_id: Uuid,
        transfer_by_id: Uuid,
        transfer_to_id: Uuid,
        lead_data: &Value,
    ) -> Result<LeadTransfer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let transfer = sqlx::query_as::<_, LeadTransfer>(
            r#"
            INSERT INTO lead_transfers (lead_id, transfer_by_id, transfer_to_id, lead_data)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .bind(transfer_by_id)
        .bind(transfer_to_id)
        .bind(lead_data)
        .fetch_one(executor)
        .await?;

        Ok(transfer)
    }

    pub async fn list_transfers_by(
        &self,
        company_id: Uuid,
        member_id: Uuid,
    ) -> Result<Vec<LeadTransferEntry>, AppError> {
        let transfers = sqlx::query_as::<_, LeadTransferEntry>(
            r#"
            SELECT
                t.id, t.lead_id,
                t.transfer_by_id, mb.name AS transfer_by_name,
                t.transfer_to_id, mt.name AS transfer_to_name,
                t.lead_data, t.created_at
            FROM lead_transfers t
            JOIN leads l ON l.id = t.lead_id
            JOIN members mb ON mb.id = t.transfer_by_id
            JOIN members mt ON mt.id = t.transfer_to_id
            WHERE t.transfer_by_id = $1 AND l.company_id = $2
            ORDER BY t.created_at ASC
            "#,
        )
        .bind(member_id)
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transfers)
    }
}
