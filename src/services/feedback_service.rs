// src/services/feedback_service.rs

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Acquire, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{FeedbackRepository, LeadRepository, MemberRepository},
    models::lead::{
        Bid, CallStatus, FeedbackHeaderRow, FeedbackItem, FeedbackSubmission, FeedbackWithItems,
        LeadBid, LeadFeedback, NewFeedbackItem, PaymentStatus, SubmitType,
    },
};

pub const FEEDBACK_SUCCESS_MESSAGE: &str = "Updated Successfully!";

// Tudo que chega numa submissão de feedback
#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub dept_id: Uuid,
    pub lead_id: Uuid,
    pub call_status: CallStatus,
    pub payment_status: PaymentStatus,
    pub items: Vec<NewFeedbackItem>,
    pub image_urls: Vec<String>,
    pub submit_type: SubmitType,
    pub form_name: Option<String>,
    pub next_follow_up_date: Option<NaiveDate>,
}

/// O que fazer com os itens já gravados quando chega uma nova submissão.
#[derive(Debug, Default, PartialEq)]
pub struct FeedbackMergePlan {
    pub stale_item_ids: Vec<Uuid>,
    pub inserts: Vec<NewFeedbackItem>,
}

/// Merge por nome de campo: todo item gravado cujo nome aparece na submissão é
/// substituído; nomes que não vieram continuam como estão.
/// Se a submissão repetir um nome, vale o último.
pub fn plan_feedback_merge(existing: &[FeedbackItem], incoming: &[NewFeedbackItem]) -> FeedbackMergePlan {
    let mut inserts: Vec<NewFeedbackItem> = Vec::with_capacity(incoming.len());
    for item in incoming {
        match inserts.iter_mut().find(|i| i.name == item.name) {
            Some(slot) => *slot = item.clone(),
            None => inserts.push(item.clone()),
        }
    }

    let stale_item_ids = existing
        .iter()
        .filter(|stored| inserts.iter().any(|i| i.name == stored.name))
        .map(|stored| stored.id)
        .collect();

    FeedbackMergePlan { stale_item_ids, inserts }
}

/// Junta cabeçalhos e itens de feedback, preservando a ordem dos cabeçalhos.
pub(crate) fn attach_items(headers: Vec<FeedbackHeaderRow>, items: Vec<FeedbackItem>) -> Vec<FeedbackWithItems> {
    let mut by_feedback: HashMap<Uuid, Vec<FeedbackItem>> = HashMap::new();
    for item in items {
        by_feedback.entry(item.lead_feedback_id).or_default().push(item);
    }

    headers
        .into_iter()
        .map(|h| FeedbackWithItems {
            items: by_feedback.remove(&h.id).unwrap_or_default(),
            feedback: LeadFeedback {
                id: h.id,
                lead_id: h.lead_id,
                member_id: h.member_id,
                dept_id: h.dept_id,
                form_name: h.form_name,
                image_urls: h.image_urls,
                created_at: h.created_at,
                updated_at: h.updated_at,
            },
            member_name: h.member_name,
            role_name: h.role_name,
        })
        .collect()
}

#[derive(Clone)]
pub struct FeedbackService {
    lead_repo: LeadRepository,
    member_repo: MemberRepository,
    feedback_repo: FeedbackRepository,
}

impl FeedbackService {
    pub fn new(
        lead_repo: LeadRepository,
        member_repo: MemberRepository,
        feedback_repo: FeedbackRepository,
    ) -> Self {
        Self { lead_repo, member_repo, feedback_repo }
    }

    // =========================================================================
    //  FEEDBACK
    // =========================================================================

    pub async fn submit_feedback<'e, A>(
        &self,
        db: A,
        member_id: Uuid,
        company_id: Uuid,
        input: NewFeedback,
    ) -> Result<FeedbackSubmission, AppError>
    where
        A: Acquire<'e, Database = Postgres>,
    {
        let mut tx = db.begin().await?;

        // 1. Departamento (da empresa de quem envia) e a empresa dona dele precisam existir
        let dept = self.member_repo
            .find_dept(&mut *tx, input.dept_id)
            .await?
            .filter(|d| d.company_id == company_id)
            .ok_or_else(|| AppError::not_found("Departamento"))?;

        let company = self.member_repo
            .find_company(&mut *tx, dept.company_id)
            .await?
            .ok_or_else(|| AppError::not_found("Empresa"))?;

        // 2. Resultado da ligação vai direto para o lead
        let lead = self.lead_repo
            .update_call_outcome(
                &mut *tx,
                company.id,
                input.lead_id,
                input.call_status,
                input.payment_status,
                input.next_follow_up_date,
            )
            .await?
            .ok_or_else(|| AppError::not_found("Lead"))?;

        // 3. Upsert do registro (lead, membro) e merge dos itens por nome
        let feedback = self.feedback_repo
            .upsert_feedback(
                &mut *tx,
                lead.id,
                member_id,
                dept.id,
                input.form_name.as_deref(),
                &input.image_urls,
            )
            .await?;

        let existing = self.feedback_repo.list_items(&mut *tx, feedback.id).await?;
        let plan = plan_feedback_merge(&existing, &input.items);

        self.feedback_repo.delete_items(&mut *tx, &plan.stale_item_ids).await?;
        for item in &plan.inserts {
            self.feedback_repo
                .insert_item(&mut *tx, feedback.id, lead.id, item)
                .await?;
        }

        // 4. Escalonamento: o lead volta só para o gerente
        if input.submit_type == SubmitType::SubmitToManager {
            let manager_id = company
                .company_manager_id
                .ok_or_else(|| AppError::not_found("Gerente da empresa"))?;
            self.lead_repo.set_sole_assignee(&mut *tx, lead.id, manager_id).await?;
            tracing::info!(lead_id = %lead.id, %manager_id, "↩️ Lead devolvido ao gerente após feedback");
        }

        tx.commit().await?;

        tracing::info!(
            lead_id = %lead.id,
            %member_id,
            replaced = plan.stale_item_ids.len(),
            written = plan.inserts.len(),
            "📝 Feedback registrado"
        );

        Ok(FeedbackSubmission {
            lead,
            message: FEEDBACK_SUCCESS_MESSAGE.to_string(),
        })
    }

    // =========================================================================
    //  LANCES
    // =========================================================================

    /// Quem dá lance sai da lista de responsáveis do lead.
    pub async fn submit_bid<'e, A>(
        &self,
        db: A,
        member_id: Uuid,
        dept_id: Uuid,
        company_id: Uuid,
        lead_id: Uuid,
        bid_amount: Decimal,
        description: Option<&str>,
    ) -> Result<Bid, AppError>
    where
        A: Acquire<'e, Database = Postgres>,
    {
        let mut tx = db.begin().await?;

        self.member_repo
            .find_dept(&mut *tx, dept_id)
            .await?
            .filter(|d| d.company_id == company_id)
            .ok_or_else(|| AppError::not_found("Departamento"))?;

        self.member_repo
            .find_company(&mut *tx, company_id)
            .await?
            .ok_or_else(|| AppError::not_found("Empresa"))?;

        self.member_repo
            .find_member_in_company(&mut *tx, member_id, company_id)
            .await?
            .ok_or_else(|| AppError::not_found("Membro"))?;

        self.lead_repo
            .find_lead(&mut *tx, company_id, lead_id)
            .await?
            .ok_or_else(|| AppError::not_found("Lead"))?;

        if self.feedback_repo.find_bid(&mut *tx, lead_id, member_id).await?.is_some() {
            return Err(AppError::Duplicate("Lance já enviado para este lead.".into()));
        }

        let bid = self.feedback_repo
            .create_bid(&mut *tx, lead_id, member_id, bid_amount, description)
            .await?;

        self.lead_repo.remove_assignee(&mut *tx, lead_id, member_id).await?;

        tx.commit().await?;

        tracing::info!(%lead_id, %member_id, amount = %bid_amount, "💰 Lance registrado");

        Ok(bid)
    }

    pub async fn get_lead_bids(&self, company_id: Uuid, lead_id: Uuid) -> Result<Vec<LeadBid>, AppError> {
        self.feedback_repo.list_lead_bids(company_id, lead_id).await
    }
}
