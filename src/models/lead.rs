// src/models/lead.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;
use validator::Validate;

// --- ENUMS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "call_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallStatus {
    Pending,
    Busy,
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

// Tipo do campo do formulário de onde o feedback veio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "feedback_field_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Input,
    Date,
    Textarea,
    Image,
    Select,
    Radio,
    Checkbox,
}

/// O que acontece com o lead depois do feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmitType {
    // Só grava; o lead continua com quem está
    #[default]
    Save,
    // Devolve o lead para o gerente da empresa
    SubmitToManager,
}

// --- LEAD ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    pub company_id: Uuid,

    #[schema(example = "João Pereira")]
    pub name: String,
    pub email: String,
    pub phone: String,
    pub alternate_phone: Option<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub rating: Option<i32>,

    pub vehicle_date: Option<NaiveDate>,
    pub vehicle_name: Option<String>,
    pub vehicle_model: Option<String>,

    pub call_status: CallStatus,
    pub payment_status: PaymentStatus,
    pub is_lead_approved: bool,
    pub is_financed_approved: bool,
    pub next_follow_up_date: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Campos de contato/veículo usados tanto na criação quanto na edição
#[derive(Debug, Clone)]
pub struct LeadFields {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub alternate_phone: Option<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub rating: Option<i32>,
    pub vehicle_date: Option<NaiveDate>,
    pub vehicle_name: Option<String>,
    pub vehicle_model: Option<String>,
}

// Um responsável atual pelo lead (linha de lead_members + dados do membro)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadAssignee {
    #[serde(skip)]
    pub lead_id: Uuid,
    pub member_id: Uuid,
    pub name: String,
    pub email: String,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadWithMembers {
    #[serde(flatten)]
    pub lead: Lead,
    pub members: Vec<LeadAssignee>,
}

// --- LANCES ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub member_id: Uuid,
    #[schema(example = 1500.0)]
    pub bid_amount: Decimal,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Lance com a identidade de quem deu
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadBid {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub member_id: Uuid,
    pub bid_amount: Decimal,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub member_name: String,
    pub member_email: String,
}

// --- FEEDBACK ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadFeedback {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub member_id: Uuid,
    pub dept_id: Uuid,
    #[schema(example = "Payment Collection")]
    pub form_name: Option<String>,
    pub image_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackItem {
    pub id: Uuid,
    pub lead_feedback_id: Uuid,
    pub lead_id: Uuid,
    #[schema(example = "amount")]
    pub name: String,
    #[schema(example = "250.00")]
    pub value: String,
    pub field_type: FieldType,
    pub created_at: DateTime<Utc>,
}

// Item de feedback como chega na requisição
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewFeedbackItem {
    #[validate(length(min = 1, message = "O nome do campo é obrigatório"))]
    #[schema(example = "amount")]
    pub name: String,
    #[schema(example = "250.00")]
    pub value: String,
    pub field_type: FieldType,
}

// Registro de feedback de um membro com seus itens
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackWithItems {
    #[serde(flatten)]
    pub feedback: LeadFeedback,
    pub member_name: String,
    pub role_name: Option<String>,
    pub items: Vec<FeedbackItem>,
}

// Linha auxiliar de consulta: feedback + autor + cargo
#[derive(Debug, Clone, FromRow)]
pub struct FeedbackHeaderRow {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub member_id: Uuid,
    pub dept_id: Uuid,
    pub form_name: Option<String>,
    pub image_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub member_name: String,
    pub role_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadDetail {
    #[serde(flatten)]
    pub lead: Lead,
    pub members: Vec<LeadAssignee>,
    pub feedback: Vec<FeedbackWithItems>,
}

// Itens de feedback de todos os leads agrupados pelo nome do formulário
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackGroup {
    pub form_name: Option<String>,
    pub feedback: Vec<FeedbackItem>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyLeads {
    pub leads: Vec<LeadDetail>,
    pub grouped_leads: Vec<FeedbackGroup>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSubmission {
    pub lead: Lead,
    #[schema(example = "Updated Successfully!")]
    pub message: String,
}

// --- TRANSFERÊNCIAS ---

// Histórico imutável: `lead_data` guarda os feedbacks do lead no momento da transferência
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadTransfer {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub transfer_by_id: Uuid,
    pub transfer_to_id: Uuid,
    #[schema(value_type = Object)]
    pub lead_data: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadTransferEntry {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub transfer_by_id: Uuid,
    pub transfer_by_name: String,
    pub transfer_to_id: Uuid,
    pub transfer_to_name: String,
    #[schema(value_type = Object)]
    pub lead_data: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferredLead {
    #[serde(flatten)]
    pub lead: Lead,
    pub transfers: Vec<LeadTransferEntry>,
}
