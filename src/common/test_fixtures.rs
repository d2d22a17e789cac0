// src/common/test_fixtures.rs

use sqlx::PgPool;
use uuid::Uuid;

/// Empresa mínima para os testes de banco: um gerente, membros no mesmo
/// departamento e um lead que começa com o gerente como responsável.
pub struct SeededCompany {
    pub company_id: Uuid,
    pub dept_id: Uuid,
    pub manager_id: Uuid,
    pub member_ids: Vec<Uuid>,
    pub lead_id: Uuid,
}

pub async fn seed_company(pool: &PgPool, members: usize) -> SeededCompany {
    let company_id: Uuid = sqlx::query_scalar("INSERT INTO companies (name) VALUES ('Concessionária') RETURNING id")
        .fetch_one(pool)
        .await
        .unwrap();

    let dept_id: Uuid = sqlx::query_scalar(
        "INSERT INTO company_depts (company_id, name) VALUES ($1, 'Vendas') RETURNING id",
    )
    .bind(company_id)
    .fetch_one(pool)
    .await
    .unwrap();

    let manager_id = insert_member(pool, company_id, dept_id, "Gerente").await;
    sqlx::query("UPDATE companies SET company_manager_id = $1 WHERE id = $2")
        .bind(manager_id)
        .bind(company_id)
        .execute(pool)
        .await
        .unwrap();

    let mut member_ids = Vec::with_capacity(members);
    for i in 0..members {
        member_ids.push(insert_member(pool, company_id, dept_id, &format!("Vendedor {i}")).await);
    }

    let lead_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO leads (company_id, name, email, phone, address, city, state, zip)
        VALUES ($1, 'Cliente', 'cliente@example.com', '5511999999999', 'Rua A, 1', 'São Paulo', 'SP', '01000-000')
        RETURNING id
        "#,
    )
    .bind(company_id)
    .fetch_one(pool)
    .await
    .unwrap();

    assign(pool, lead_id, manager_id).await;

    SeededCompany { company_id, dept_id, manager_id, member_ids, lead_id }
}

async fn insert_member(pool: &PgPool, company_id: Uuid, dept_id: Uuid, name: &str) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO members (company_id, dept_id, name, email, password_hash)
        VALUES ($1, $2, $3, $4, 'x')
        RETURNING id
        "#,
    )
    .bind(company_id)
    .bind(dept_id)
    .bind(name)
    .bind(format!("{}@lead-desk.test", Uuid::new_v4()))
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn assign(pool: &PgPool, lead_id: Uuid, member_id: Uuid) {
    sqlx::query("INSERT INTO lead_members (lead_id, member_id) VALUES ($1, $2)")
        .bind(lead_id)
        .bind(member_id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn assignee_ids(pool: &PgPool, lead_id: Uuid) -> Vec<Uuid> {
    sqlx::query_scalar("SELECT member_id FROM lead_members WHERE lead_id = $1 ORDER BY created_at")
        .bind(lead_id)
        .fetch_all(pool)
        .await
        .unwrap()
}

pub async fn count_rows(pool: &PgPool, table: &str, lead_id: Uuid) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE lead_id = $1"))
        .bind(lead_id)
        .fetch_one(pool)
        .await
        .unwrap()
}
