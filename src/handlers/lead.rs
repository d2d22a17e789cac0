// src/handlers/lead.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::WithRejection;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::{
        dates::{parse_wire_date, validate_wire_date},
        error::AppError,
    },
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::lead::{
        Bid, CallStatus, CompanyLeads, FeedbackSubmission, Lead, LeadBid, LeadDetail, LeadFields,
        LeadWithMembers, NewFeedbackItem, PaymentStatus, SubmitType, TransferredLead,
    },
    services::feedback_service::NewFeedback,
};

// O companyId do payload tem que ser o mesmo do token
fn ensure_same_company(user: &AuthenticatedUser, company_id: Uuid) -> Result<(), AppError> {
    if user.company_id != company_id {
        return Err(AppError::not_found("Empresa"));
    }
    Ok(())
}

// Teto da coluna bids.amount, NUMERIC(14,2)
const MAX_BID_AMOUNT_UNITS: i64 = 1_000_000_000_000;

fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    let (code, message) = if !amount.is_sign_positive() || amount.is_zero() {
        ("positive", "O valor do lance deve ser positivo")
    } else if *amount >= Decimal::new(MAX_BID_AMOUNT_UNITS, 0) {
        ("max_amount", "O valor do lance deve ser menor que 1.000.000.000.000")
    } else if amount.normalize().scale() > 2 {
        ("max_scale", "O valor do lance aceita no máximo 2 casas decimais")
    } else {
        return Ok(());
    };

    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    Err(err)
}

// Datas já validadas pelo `validator`; aqui só convertem
fn wire_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(parse_wire_date)
}

// =============================================================================
//  ÁREA 1: CADASTRO DE LEADS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadPayload {
    pub company_id: Uuid,

    #[validate(length(min = 1, message = "O nome é obrigatório"))]
    #[schema(example = "João Pereira")]
    pub name: String,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "joao@cliente.com")]
    pub email: String,

    #[validate(length(min = 8, max = 20, message = "Telefone inválido"))]
    #[schema(example = "5511999999999")]
    pub phone: String,

    #[validate(length(min = 8, max = 20, message = "Telefone alternativo inválido"))]
    pub alternate_phone: Option<String>,

    #[validate(length(min = 1, message = "O endereço é obrigatório"))]
    pub address: String,
    #[validate(length(min = 1, message = "A cidade é obrigatória"))]
    pub city: String,
    #[validate(length(min = 1, message = "O estado é obrigatório"))]
    pub state: String,
    #[validate(length(min = 1, message = "O CEP é obrigatório"))]
    pub zip: String,

    #[validate(range(min = 0, max = 5, message = "A nota deve estar entre 0 e 5"))]
    pub rating: Option<i32>,

    #[validate(custom(function = "validate_wire_date"))]
    #[schema(example = "2024-06-30")]
    pub vehicle_date: Option<String>,
    pub vehicle_name: Option<String>,
    pub vehicle_model: Option<String>,
}

impl LeadPayload {
    fn fields(&self) -> LeadFields {
        LeadFields {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            alternate_phone: self.alternate_phone.clone(),
            address: self.address.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            zip: self.zip.clone(),
            rating: self.rating,
            vehicle_date: wire_date(self.vehicle_date.as_deref()),
            vehicle_name: self.vehicle_name.clone(),
            vehicle_model: self.vehicle_model.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeadPayload {
    #[serde(flatten)]
    #[validate(nested)]
    pub lead: LeadPayload,

    #[validate(custom(function = "validate_wire_date"))]
    #[schema(example = "2025-02-01")]
    pub next_follow_up_date: Option<String>,
}

// POST /api/leads
#[utoipa::path(
    post,
    path = "/api/leads",
    tag = "Leads",
    request_body = LeadPayload,
    responses(
        (status = 201, description = "Lead criado e atribuído ao gerente", body = LeadWithMembers),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Empresa ou gerente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_lead(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    WithRejection(Json(payload), _): WithRejection<Json<LeadPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    ensure_same_company(&user, payload.company_id)?;

    let lead = app_state.lead_service
        .create_lead(&app_state.db_pool, payload.company_id, &payload.fields())
        .await?;

    Ok((StatusCode::CREATED, Json(lead)))
}

// GET /api/leads
#[utoipa::path(
    get,
    path = "/api/leads",
    tag = "Leads",
    responses(
        (status = 200, description = "Leads da empresa com responsáveis e feedbacks", body = CompanyLeads)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_company_leads(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let leads = app_state.lead_service
        .get_company_leads(&app_state.db_pool, user.company_id)
        .await?;

    Ok((StatusCode::OK, Json(leads)))
}

// GET /api/leads/{id}
#[utoipa::path(
    get,
    path = "/api/leads/{id}",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 200, description = "Lead com responsáveis e feedbacks", body = LeadDetail),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_company_lead_by_id(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state.lead_service
        .get_company_lead_by_id(&app_state.db_pool, user.company_id, lead_id)
        .await?;

    Ok((StatusCode::OK, Json(lead)))
}

// PUT /api/leads/{id}
#[utoipa::path(
    put,
    path = "/api/leads/{id}",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    request_body = UpdateLeadPayload,
    responses(
        (status = 200, description = "Lead atualizado", body = Lead),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_lead(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateLeadPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    ensure_same_company(&user, payload.lead.company_id)?;

    let lead = app_state.lead_service
        .update_lead(
            &app_state.db_pool,
            user.company_id,
            lead_id,
            &payload.lead.fields(),
            wire_date(payload.next_follow_up_date.as_deref()),
        )
        .await?;

    Ok((StatusCode::OK, Json(lead)))
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AssignedLeadsQuery {
    /// Membro consultado; sem ele, quem está chamando
    pub user_id: Option<Uuid>,
}

// GET /api/leads/assigned
#[utoipa::path(
    get,
    path = "/api/leads/assigned",
    tag = "Leads",
    params(AssignedLeadsQuery),
    responses(
        (status = 200, description = "Leads atribuídos ao membro", body = Vec<LeadDetail>)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_assigned_leads(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    WithRejection(Query(query), _): WithRejection<Query<AssignedLeadsQuery>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let member_id = query.user_id.unwrap_or(user.id);

    let leads = app_state.lead_service
        .get_assigned_leads(&app_state.db_pool, user.company_id, member_id)
        .await?;

    Ok((StatusCode::OK, Json(leads)))
}

// GET /api/leads/transferred
#[utoipa::path(
    get,
    path = "/api/leads/transferred",
    tag = "Leads",
    responses(
        (status = 200, description = "Leads transferidos por quem está chamando", body = Vec<TransferredLead>)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_transferred_leads(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let leads = app_state.lead_service
        .get_transferred_leads(user.company_id, user.id)
        .await?;

    Ok((StatusCode::OK, Json(leads)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpPayload {
    #[schema(value_type = String, format = Date, example = "2025-02-01")]
    pub follow_up_date: NaiveDate,
}

// POST /api/leads/{id}/follow-up
#[utoipa::path(
    post,
    path = "/api/leads/{id}/follow-up",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    request_body = FollowUpPayload,
    responses(
        (status = 200, description = "Data de retorno atualizada", body = Lead),
        (status = 400, description = "Data inválida"),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_follow_up_date(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
    WithRejection(Json(payload), _): WithRejection<Json<FollowUpPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state.lead_service
        .update_follow_up_date(&app_state.db_pool, user.company_id, lead_id, payload.follow_up_date)
        .await?;

    Ok((StatusCode::OK, Json(lead)))
}

// =============================================================================
//  ÁREA 2: ATRIBUIÇÃO, TRANSFERÊNCIA E APROVAÇÕES
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignLeadsPayload {
    pub company_id: Uuid,
    pub dept_id: Uuid,

    #[validate(length(min = 1, message = "Selecione ao menos um lead"))]
    pub lead_ids: Vec<Uuid>,

    #[validate(length(min = 1, message = "Selecione ao menos um membro"))]
    pub user_ids: Vec<Uuid>,

    #[schema(example = "Campanha de janeiro")]
    pub description: Option<String>,
}

// POST /api/leads/assign
#[utoipa::path(
    post,
    path = "/api/leads/assign",
    tag = "Leads",
    request_body = AssignLeadsPayload,
    responses(
        (status = 200, description = "Leads com os novos responsáveis", body = Vec<LeadWithMembers>),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Lead ou membro fora da empresa/departamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_leads(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    WithRejection(Json(payload), _): WithRejection<Json<AssignLeadsPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    ensure_same_company(&user, payload.company_id)?;

    let leads = app_state.assignment_service
        .assign_leads(
            &app_state.db_pool,
            payload.company_id,
            payload.dept_id,
            &payload.lead_ids,
            &payload.user_ids,
            payload.description.as_deref(),
        )
        .await?;

    Ok((StatusCode::OK, Json(leads)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferLeadPayload {
    pub transfer_to_id: Uuid,
}

// POST /api/leads/{id}/transfer
#[utoipa::path(
    post,
    path = "/api/leads/{id}/transfer",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    request_body = TransferLeadPayload,
    responses(
        (status = 200, description = "Lead com o novo responsável", body = LeadWithMembers),
        (status = 404, description = "Lead ou membro não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn transfer_lead(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
    WithRejection(Json(payload), _): WithRejection<Json<TransferLeadPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state.assignment_service
        .transfer_lead(&app_state.db_pool, user.company_id, user.id, lead_id, payload.transfer_to_id)
        .await?;

    Ok((StatusCode::OK, Json(lead)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApproveLeadPayload {
    pub approved: bool,
}

// POST /api/leads/{id}/approve
#[utoipa::path(
    post,
    path = "/api/leads/{id}/approve",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    request_body = ApproveLeadPayload,
    responses(
        (status = 200, description = "Lead aprovado/reprovado", body = Lead),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn approve_lead(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
    WithRejection(Json(payload), _): WithRejection<Json<ApproveLeadPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state.assignment_service
        .approve_lead(&app_state.db_pool, user.company_id, lead_id, payload.approved)
        .await?;

    Ok((StatusCode::OK, Json(lead)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinanceStatusPayload {
    pub finance_status: bool,
}

// POST /api/leads/{id}/finance
#[utoipa::path(
    post,
    path = "/api/leads/{id}/finance",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    request_body = FinanceStatusPayload,
    responses(
        (status = 200, description = "Status financeiro atualizado; lead volta ao gerente", body = Lead),
        (status = 404, description = "Empresa, gerente ou lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_finance_status(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
    WithRejection(Json(payload), _): WithRejection<Json<FinanceStatusPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state.assignment_service
        .update_finance_status(
            &app_state.db_pool,
            user.company_id,
            user.id,
            lead_id,
            payload.finance_status,
        )
        .await?;

    Ok((StatusCode::OK, Json(lead)))
}

// =============================================================================
//  ÁREA 3: FEEDBACK E LANCES
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFeedbackPayload {
    pub dept_id: Uuid,
    pub call_status: CallStatus,
    pub payment_status: PaymentStatus,

    #[validate(nested)]
    #[serde(default)]
    pub feedback: Vec<NewFeedbackItem>,

    #[serde(default)]
    pub urls: Vec<String>,

    #[serde(default)]
    pub submit_type: SubmitType,

    #[schema(example = "Payment Collection")]
    pub form_name: Option<String>,

    #[validate(custom(function = "validate_wire_date"))]
    #[schema(example = "2025-02-01")]
    pub next_follow_up_date: Option<String>,
}

// POST /api/leads/{id}/feedback
#[utoipa::path(
    post,
    path = "/api/leads/{id}/feedback",
    tag = "Feedback",
    params(("id" = Uuid, Path, description = "ID do lead")),
    request_body = SubmitFeedbackPayload,
    responses(
        (status = 200, description = "Feedback gravado", body = FeedbackSubmission),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Departamento, empresa, gerente ou lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn submit_feedback(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
    WithRejection(Json(payload), _): WithRejection<Json<SubmitFeedbackPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let next_follow_up_date = wire_date(payload.next_follow_up_date.as_deref());
    let input = NewFeedback {
        dept_id: payload.dept_id,
        lead_id,
        call_status: payload.call_status,
        payment_status: payload.payment_status,
        items: payload.feedback,
        image_urls: payload.urls,
        submit_type: payload.submit_type,
        form_name: payload.form_name,
        next_follow_up_date,
    };

    let result = app_state.feedback_service
        .submit_feedback(&app_state.db_pool, user.id, user.company_id, input)
        .await?;

    Ok((StatusCode::OK, Json(result)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBidPayload {
    pub company_id: Uuid,
    pub dept_id: Uuid,

    #[validate(custom(function = "validate_positive_amount"))]
    #[schema(example = 1500.0)]
    pub bid_amount: Decimal,

    pub description: Option<String>,
}

// POST /api/leads/{id}/bids
#[utoipa::path(
    post,
    path = "/api/leads/{id}/bids",
    tag = "Feedback",
    params(("id" = Uuid, Path, description = "ID do lead")),
    request_body = SubmitBidPayload,
    responses(
        (status = 201, description = "Lance registrado; o membro sai dos responsáveis", body = Bid),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Departamento, empresa, membro ou lead não encontrado"),
        (status = 409, description = "Lance já enviado para este lead")
    ),
    security(("api_jwt" = []))
)]
pub async fn submit_bid(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
    WithRejection(Json(payload), _): WithRejection<Json<SubmitBidPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    ensure_same_company(&user, payload.company_id)?;

    let bid = app_state.feedback_service
        .submit_bid(
            &app_state.db_pool,
            user.id,
            payload.dept_id,
            payload.company_id,
            lead_id,
            payload.bid_amount,
            payload.description.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(bid)))
}

// GET /api/leads/{id}/bids
#[utoipa::path(
    get,
    path = "/api/leads/{id}/bids",
    tag = "Feedback",
    params(("id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 200, description = "Lances do lead com quem deu cada um", body = Vec<LeadBid>)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_lead_bids(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let bids = app_state.feedback_service
        .get_lead_bids(user.company_id, lead_id)
        .await?;

    Ok((StatusCode::OK, Json(bids)))
}
