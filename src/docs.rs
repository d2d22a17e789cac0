// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,

        // --- Leads ---
        handlers::lead::create_lead,
        handlers::lead::get_company_leads,
        handlers::lead::get_company_lead_by_id,
        handlers::lead::update_lead,
        handlers::lead::get_assigned_leads,
        handlers::lead::get_transferred_leads,
        handlers::lead::update_follow_up_date,
        handlers::lead::assign_leads,
        handlers::lead::transfer_lead,
        handlers::lead::approve_lead,
        handlers::lead::update_finance_status,

        // --- Feedback ---
        handlers::lead::submit_feedback,
        handlers::lead::submit_bid,
        handlers::lead::get_lead_bids,

        // --- Dashboard ---
        handlers::dashboard::get_leads_by_date_range,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- Leads ---
            models::lead::CallStatus,
            models::lead::PaymentStatus,
            models::lead::FieldType,
            models::lead::SubmitType,
            models::lead::Lead,
            models::lead::LeadAssignee,
            models::lead::LeadWithMembers,
            models::lead::LeadDetail,
            models::lead::CompanyLeads,
            models::lead::FeedbackGroup,
            models::lead::LeadTransferEntry,
            models::lead::TransferredLead,

            // --- Feedback ---
            models::lead::LeadFeedback,
            models::lead::FeedbackItem,
            models::lead::NewFeedbackItem,
            models::lead::FeedbackWithItems,
            models::lead::FeedbackSubmission,
            models::lead::Bid,
            models::lead::LeadBid,

            // --- Dashboard ---
            models::dashboard::LeadRangeSummary,

            // --- Payloads ---
            handlers::lead::LeadPayload,
            handlers::lead::UpdateLeadPayload,
            handlers::lead::FollowUpPayload,
            handlers::lead::AssignLeadsPayload,
            handlers::lead::TransferLeadPayload,
            handlers::lead::ApproveLeadPayload,
            handlers::lead::FinanceStatusPayload,
            handlers::lead::SubmitFeedbackPayload,
            handlers::lead::SubmitBidPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Login dos membros"),
        (name = "Leads", description = "Cadastro, atribuição, transferência e aprovações de leads"),
        (name = "Feedback", description = "Feedbacks de ligação e lances nos leads"),
        (name = "Dashboard", description = "Indicadores de leads por período")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
