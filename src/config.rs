// src/config.rs

use crate::{
    db::{DashboardRepository, FeedbackRepository, LeadRepository, MemberRepository},
    services::{auth::AuthService, AssignmentService, DashboardService, FeedbackService, LeadService},
};
use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("DB_MAX_CONNECTIONS inválido: '{}'", raw))?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self { database_url, jwt_secret, bind_addr, max_connections })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub lead_service: LeadService,
    pub assignment_service: AssignmentService,
    pub feedback_service: FeedbackService,
    pub dashboard_service: DashboardService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::from_pool(db_pool, config.jwt_secret.clone()))
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_pool(db_pool: PgPool, jwt_secret: String) -> Self {
        let lead_repo = LeadRepository::new(db_pool.clone());
        let member_repo = MemberRepository::new(db_pool.clone());
        let feedback_repo = FeedbackRepository::new(db_pool.clone());
        let dashboard_repo = DashboardRepository::new(db_pool.clone());

        Self {
            auth_service: AuthService::new(member_repo.clone(), jwt_secret),
            lead_service: LeadService::new(lead_repo.clone(), member_repo.clone(), feedback_repo.clone()),
            assignment_service: AssignmentService::new(
                lead_repo.clone(),
                member_repo.clone(),
                feedback_repo.clone(),
            ),
            feedback_service: FeedbackService::new(lead_repo, member_repo, feedback_repo),
            dashboard_service: DashboardService::new(dashboard_repo),
            db_pool,
        }
    }
}
