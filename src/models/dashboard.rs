// src/models/dashboard.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;

use crate::models::lead::CallStatus;

// Indicadores de leads dentro de um intervalo de datas
#[derive(Debug, Default, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadRangeSummary {
    pub call_count: u64, // Leads com ligação concluída (SUCCESS)
    pub total_pay_collected_count: f64, // Soma dos campos "amount" dos formulários de pagamento
    pub grouped_call_perday: BTreeMap<String, u64>,
    pub leads_with_feedback_by_role: BTreeMap<String, u64>,
}

// --- Linhas de entrada do agregador ---

#[derive(Debug, Clone, FromRow)]
pub struct LeadActivityRow {
    pub id: Uuid,
    pub call_status: CallStatus,
    pub created_at: DateTime<Utc>,
}

// Um item de feedback achatado com o cabeçalho e o cargo do autor.
// `item_name`/`item_value` vêm nulos quando o feedback não tem itens (LEFT JOIN).
#[derive(Debug, Clone, FromRow)]
pub struct FeedbackActivityRow {
    pub feedback_id: Uuid,
    pub lead_id: Uuid,
    pub form_name: Option<String>,
    pub role_name: Option<String>,
    pub item_name: Option<String>,
    pub item_value: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LeadActivity {
    pub id: Uuid,
    pub call_status: CallStatus,
    pub created_at: DateTime<Utc>,
    pub feedback: Vec<FeedbackActivity>,
}

#[derive(Debug, Clone, Default)]
pub struct FeedbackActivity {
    pub form_name: Option<String>,
    pub role_name: Option<String>,
    pub items: Vec<(String, String)>,
}
