// src/db/member_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::{Company, CompanyDept, Member},
};

// Leitura de empresas, departamentos e membros (o cadastro é feito por outro sistema)
#[derive(Clone)]
pub struct MemberRepository {
    pool: PgPool,
}

impl MemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um membro pelo seu e-mail (login)
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Member>, AppError> {
        let member = sqlx::query_as::<_, Member>("SELECT * FROM members WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(member)
    }

    pub async fn find_company<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
    ) -> Result<Option<Company>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let company = sqlx::query_as::<_, Company>(
            "SELECT id, name, company_manager_id FROM companies WHERE id = $1",
        )
        .bind(company_id)
        .fetch_optional(executor)
        .await?;

        Ok(company)
    }

    pub async fn find_dept<'e, E>(
        &self,
        executor: E,
        dept_id: Uuid,
    ) -> Result<Option<CompanyDept>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let dept = sqlx::query_as::<_, CompanyDept>(
            "SELECT id, company_id, name FROM company_depts WHERE id = $1",
        )
        .bind(dept_id)
        .fetch_optional(executor)
        .await?;

        Ok(dept)
    }

    /// Só encontra o membro se ele pertencer à empresa.
    pub async fn find_member_in_company<'e, E>(
        &self,
        executor: E,
        member_id: Uuid,
        company_id: Uuid,
    ) -> Result<Option<Member>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let member = sqlx::query_as::<_, Member>(
            "SELECT * FROM members WHERE id = $1 AND company_id = $2",
        )
        .bind(member_id)
        .bind(company_id)
        .fetch_optional(executor)
        .await?;

        Ok(member)
    }

    /// Dos ids pedidos, devolve os membros que estão na empresa E no departamento.
    pub async fn find_existing_member_ids<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        dept_id: Uuid,
        member_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM members
            WHERE company_id = $1 AND dept_id = $2 AND id = ANY($3)
            "#,
        )
        .bind(company_id)
        .bind(dept_id)
        .bind(member_ids)
        .fetch_all(executor)
        .await?;

        Ok(ids)
    }
}
