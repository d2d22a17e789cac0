// src/handlers/dashboard.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::dashboard::LeadRangeSummary,
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LeadRangeQuery {
    /// Primeiro dia (YYYY-MM-DD), inclusivo
    pub from_date: String,
    /// Último dia (YYYY-MM-DD), inclusivo
    pub to_date: String,
}

// GET /api/dashboard/leads
#[utoipa::path(
    get,
    path = "/api/dashboard/leads",
    tag = "Dashboard",
    params(LeadRangeQuery),
    responses(
        (status = 200, description = "Indicadores dos leads criados no intervalo", body = LeadRangeSummary),
        (status = 400, description = "Intervalo de datas inválido"),
        (status = 401, description = "Não autorizado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_leads_by_date_range(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    WithRejection(Query(range), _): WithRejection<Query<LeadRangeQuery>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let summary = app_state.dashboard_service
        .get_leads_by_date_range(user.company_id, &range.from_date, &range.to_date)
        .await?;

    Ok((StatusCode::OK, Json(summary)))
}
