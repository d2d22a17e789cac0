//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Config};
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

pub fn app(app_state: AppState) -> Router {
    // Define as rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/login", post(handlers::auth::login));

    // Rotas de leads (protegidas pelo middleware)
    let lead_routes = Router::new()
        .route("/"
               ,post(handlers::lead::create_lead)
               .get(handlers::lead::get_company_leads)
        )
        .route("/assigned", get(handlers::lead::get_assigned_leads))
        .route("/transferred", get(handlers::lead::get_transferred_leads))
        .route("/assign", post(handlers::lead::assign_leads))
        .route("/{id}"
               ,get(handlers::lead::get_company_lead_by_id)
               .put(handlers::lead::update_lead)
        )
        .route("/{id}/transfer", post(handlers::lead::transfer_lead))
        .route("/{id}/approve", post(handlers::lead::approve_lead))
        .route("/{id}/finance", post(handlers::lead::update_finance_status))
        .route("/{id}/follow-up", post(handlers::lead::update_follow_up_date))
        .route("/{id}/feedback", post(handlers::lead::submit_feedback))
        .route("/{id}/bids"
               ,post(handlers::lead::submit_bid)
               .get(handlers::lead::get_lead_bids)
        )
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let dashboard_routes = Router::new()
        .route("/leads", get(handlers::dashboard::get_leads_by_date_range))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/leads", lead_routes)
        .nest("/api/dashboard", dashboard_routes)
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let config = Config::from_env()?;
    let app_state = AppState::new(&config).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app(app_state)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    const TEST_SECRET: &str = "segredo-de-teste";

    // Pool preguiçoso: as rotas testadas aqui respondem antes de tocar no banco
    fn test_state() -> AppState {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        AppState::from_pool(pool, TEST_SECRET.to_string())
    }

    fn bearer(state: &AppState, company_id: Uuid) -> String {
        let token = state.auth_service.create_token(Uuid::new_v4(), company_id).unwrap();
        format!("Bearer {token}")
    }

    async fn json_body(resp: axum::response::Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let resp = app(test_state())
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn lead_routes_reject_missing_token() {
        let resp = app(test_state())
            .oneshot(Request::builder().uri("/api/leads").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn lead_routes_reject_forged_token() {
        let resp = app(test_state())
            .oneshot(
                Request::builder()
                    .uri("/api/leads/assigned")
                    .header(header::AUTHORIZATION, "Bearer nao.e.um.jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_assignment_payload_lists_field_errors() {
        let state = test_state();
        let company_id = Uuid::new_v4();
        let auth = bearer(&state, company_id);
        let payload = json!({
            "companyId": company_id,
            "deptId": Uuid::new_v4(),
            "leadIds": [],
            "userIds": [Uuid::new_v4()],
        });

        let resp = app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/leads/assign")
                    .header(header::AUTHORIZATION, auth)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(
            body,
            json!({ "errors": [{ "message": "Selecione ao menos um lead", "path": ["leadIds"] }] })
        );
    }

    #[tokio::test]
    async fn bid_for_another_company_is_not_found() {
        let state = test_state();
        let auth = bearer(&state, Uuid::new_v4());
        let payload = json!({
            "companyId": Uuid::new_v4(),
            "deptId": Uuid::new_v4(),
            "bidAmount": 150.0,
        });

        let resp = app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/leads/{}/bids", Uuid::new_v4()))
                    .header(header::AUTHORIZATION, auth)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_dashboard_range_is_a_bad_request() {
        let state = test_state();
        let auth = bearer(&state, Uuid::new_v4());

        let resp = app(state)
            .oneshot(
                Request::builder()
                    .uri("/api/dashboard/leads?fromDate=10/01/2025&toDate=2025-01-31")
                    .header(header::AUTHORIZATION, auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert!(body["error"].as_str().unwrap().contains("fromDate"));
    }

    #[tokio::test]
    async fn unknown_call_status_is_a_field_error() {
        let state = test_state();
        let auth = bearer(&state, Uuid::new_v4());
        let payload = json!({
            "deptId": Uuid::new_v4(),
            "callStatus": "DONE",
            "paymentStatus": "PAID",
        });

        let resp = app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/leads/{}/feedback", Uuid::new_v4()))
                    .header(header::AUTHORIZATION, auth)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        let errors = body["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["path"], json!(["callStatus"]));
        assert!(errors[0]["message"].as_str().unwrap().contains("DONE"));
    }

    #[tokio::test]
    async fn dashboard_without_to_date_lists_the_missing_field() {
        let state = test_state();
        let auth = bearer(&state, Uuid::new_v4());

        let resp = app(state)
            .oneshot(
                Request::builder()
                    .uri("/api/dashboard/leads?fromDate=2025-01-01")
                    .header(header::AUTHORIZATION, auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(
            body,
            json!({ "errors": [{ "message": "Campo obrigatório", "path": ["toDate"] }] })
        );
    }

    #[tokio::test]
    async fn login_without_json_content_type_is_a_bad_request() {
        let resp = app(test_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/login")
                    .body(Body::from(r#"{"email":"a@b.com","password":"x"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(body["errors"][0]["path"], json!([]));
    }
}
