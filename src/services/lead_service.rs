// src/services/lead_service.rs

use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::{Acquire, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{FeedbackRepository, LeadRepository, MemberRepository},
    models::lead::{
        CompanyLeads, FeedbackGroup, FeedbackItem, FeedbackWithItems, Lead, LeadAssignee,
        LeadDetail, LeadFields, LeadTransferEntry, LeadWithMembers, TransferredLead,
    },
    services::{assignment_service::attach_assignees, feedback_service::attach_items},
};

/// Um mesmo campo (nome + tipo) pode ter sido gravado mais de uma vez;
/// fica o último valor, na posição em que o campo apareceu primeiro.
pub fn dedupe_feedback_items(items: Vec<FeedbackItem>) -> Vec<FeedbackItem> {
    let mut out: Vec<FeedbackItem> = Vec::with_capacity(items.len());
    for item in items {
        match out
            .iter_mut()
            .find(|i| i.name == item.name && i.field_type == item.field_type)
        {
            Some(slot) => *slot = item,
            None => out.push(item),
        }
    }
    out
}

/// Agrupa os itens de todos os feedbacks pelo nome do formulário,
/// na ordem em que cada formulário aparece.
pub fn group_by_form(feedback: &[FeedbackWithItems]) -> Vec<FeedbackGroup> {
    let mut groups: Vec<FeedbackGroup> = Vec::new();
    for record in feedback {
        let form_name = &record.feedback.form_name;
        match groups.iter_mut().find(|g| &g.form_name == form_name) {
            Some(group) => group.feedback.extend(record.items.iter().cloned()),
            None => groups.push(FeedbackGroup {
                form_name: form_name.clone(),
                feedback: record.items.clone(),
            }),
        }
    }
    groups
}

fn build_details(
    leads: Vec<Lead>,
    assignees: Vec<LeadAssignee>,
    feedback: Vec<FeedbackWithItems>,
) -> Vec<LeadDetail> {
    let mut feedback_by_lead: HashMap<Uuid, Vec<FeedbackWithItems>> = HashMap::new();
    for record in feedback {
        feedback_by_lead.entry(record.feedback.lead_id).or_default().push(record);
    }

    attach_assignees(leads, assignees)
        .into_iter()
        .map(|LeadWithMembers { lead, members }| LeadDetail {
            feedback: feedback_by_lead.remove(&lead.id).unwrap_or_default(),
            lead,
            members,
        })
        .collect()
}

#[derive(Clone)]
pub struct LeadService {
    lead_repo: LeadRepository,
    member_repo: MemberRepository,
    feedback_repo: FeedbackRepository,
}

impl LeadService {
    pub fn new(
        lead_repo: LeadRepository,
        member_repo: MemberRepository,
        feedback_repo: FeedbackRepository,
    ) -> Self {
        Self { lead_repo, member_repo, feedback_repo }
    }

    /// Todo lead novo nasce PENDING e fica com o gerente da empresa.
    pub async fn create_lead<'e, A>(
        &self,
        db: A,
        company_id: Uuid,
        fields: &LeadFields,
    ) -> Result<LeadWithMembers, AppError>
    where
        A: Acquire<'e, Database = Postgres>,
    {
        let mut tx = db.begin().await?;

        let company = self.member_repo
            .find_company(&mut *tx, company_id)
            .await?
            .ok_or_else(|| AppError::not_found("Empresa"))?;
        let manager_id = company
            .company_manager_id
            .ok_or_else(|| AppError::not_found("Gerente da empresa"))?;
        self.member_repo
            .find_member_in_company(&mut *tx, manager_id, company.id)
            .await?
            .ok_or_else(|| AppError::not_found("Gerente da empresa"))?;

        let lead = self.lead_repo.create_lead(&mut *tx, company.id, fields).await?;
        self.lead_repo.set_sole_assignee(&mut *tx, lead.id, manager_id).await?;
        let members = self.lead_repo.list_assignees(&mut *tx, &[lead.id]).await?;

        tx.commit().await?;

        tracing::info!(lead_id = %lead.id, %company_id, %manager_id, "✨ Lead criado");

        Ok(LeadWithMembers { lead, members })
    }

    pub async fn update_lead<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        lead_id: Uuid,
        fields: &LeadFields,
        next_follow_up_date: Option<NaiveDate>,
    ) -> Result<Lead, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.lead_repo
            .update_lead(executor, company_id, lead_id, fields, next_follow_up_date)
            .await?
            .ok_or_else(|| AppError::not_found("Lead"))
    }

    pub async fn update_follow_up_date<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        lead_id: Uuid,
        follow_up_date: NaiveDate,
    ) -> Result<Lead, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.lead_repo
            .set_follow_up_date(executor, company_id, lead_id, follow_up_date)
            .await?
            .ok_or_else(|| AppError::not_found("Lead"))
    }

    // Responsáveis + feedbacks (com itens deduplicados) de um conjunto de leads
    async fn load_details(&self, conn: &mut PgConnection, leads: Vec<Lead>) -> Result<Vec<LeadDetail>, AppError> {
        let lead_ids: Vec<Uuid> = leads.iter().map(|l| l.id).collect();

        let assignees = self.lead_repo.list_assignees(&mut *conn, &lead_ids).await?;
        let headers = self.feedback_repo.list_feedback_headers(&mut *conn, &lead_ids).await?;
        let feedback_ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
        let items = self.feedback_repo
            .list_items_for_feedbacks(&mut *conn, &feedback_ids)
            .await?;

        let feedback = attach_items(headers, items)
            .into_iter()
            .map(|mut record| {
                record.items = dedupe_feedback_items(record.items);
                record
            })
            .collect();

        Ok(build_details(leads, assignees, feedback))
    }

    pub async fn get_company_leads<'e, A>(&self, db: A, company_id: Uuid) -> Result<CompanyLeads, AppError>
    where
        A: Acquire<'e, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;

        let leads = self.lead_repo.list_company_leads(&mut *conn, company_id).await?;
        let leads = self.load_details(&mut *conn, leads).await?;

        let all_feedback: Vec<FeedbackWithItems> =
            leads.iter().flat_map(|l| l.feedback.iter().cloned()).collect();
        let grouped_leads = group_by_form(&all_feedback);

        Ok(CompanyLeads { leads, grouped_leads })
    }

    pub async fn get_company_lead_by_id<'e, A>(
        &self,
        db: A,
        company_id: Uuid,
        lead_id: Uuid,
    ) -> Result<LeadDetail, AppError>
    where
        A: Acquire<'e, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;

        let lead = self.lead_repo
            .find_lead(&mut *conn, company_id, lead_id)
            .await?
            .ok_or_else(|| AppError::not_found("Lead"))?;

        self.load_details(&mut *conn, vec![lead])
            .await?
            .pop()
            .ok_or_else(|| AppError::not_found("Lead"))
    }

    pub async fn get_assigned_leads<'e, A>(
        &self,
        db: A,
        company_id: Uuid,
        member_id: Uuid,
    ) -> Result<Vec<LeadDetail>, AppError>
    where
        A: Acquire<'e, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;

        let leads = self.lead_repo
            .list_assigned_leads(&mut *conn, company_id, member_id)
            .await?;
        self.load_details(&mut *conn, leads).await
    }

    /// Leads da empresa que o membro transferiu, cada um com as transferências feitas por ele.
    pub async fn get_transferred_leads(
        &self,
        company_id: Uuid,
        member_id: Uuid,
    ) -> Result<Vec<TransferredLead>, AppError> {
        let leads = self.lead_repo.list_transferred_leads(company_id, member_id).await?;
        let transfers = self.lead_repo.list_transfers_by(company_id, member_id).await?;

        let mut by_lead: HashMap<Uuid, Vec<LeadTransferEntry>> = HashMap::new();
        for transfer in transfers {
            by_lead.entry(transfer.lead_id).or_default().push(transfer);
        }

        Ok(leads
            .into_iter()
            .map(|lead| TransferredLead {
                transfers: by_lead.remove(&lead.id).unwrap_or_default(),
                lead,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::common::test_fixtures::seed_company;
    use crate::models::lead::{FieldType, LeadFeedback};

    fn item(name: &str, value: &str, field_type: FieldType) -> FeedbackItem {
        FeedbackItem {
            id: Uuid::new_v4(),
            lead_feedback_id: Uuid::nil(),
            lead_id: Uuid::nil(),
            name: name.into(),
            value: value.into(),
            field_type,
            created_at: Utc::now(),
        }
    }

    fn record(form_name: Option<&str>, items: Vec<FeedbackItem>) -> FeedbackWithItems {
        let now = Utc::now();
        FeedbackWithItems {
            feedback: LeadFeedback {
                id: Uuid::new_v4(),
                lead_id: Uuid::nil(),
                member_id: Uuid::nil(),
                dept_id: Uuid::nil(),
                form_name: form_name.map(String::from),
                image_urls: vec![],
                created_at: now,
                updated_at: now,
            },
            member_name: "Carla".into(),
            role_name: None,
            items,
        }
    }

    #[test]
    fn dedupe_keeps_last_value_at_first_position() {
        let items = vec![
            item("amount", "10", FieldType::Input),
            item("note", "ok", FieldType::Textarea),
            item("amount", "30", FieldType::Input),
        ];

        let deduped = dedupe_feedback_items(items);

        let pairs: Vec<(&str, &str)> = deduped.iter().map(|i| (i.name.as_str(), i.value.as_str())).collect();
        assert_eq!(pairs, vec![("amount", "30"), ("note", "ok")]);
    }

    #[test]
    fn dedupe_distinguishes_field_types() {
        let items = vec![
            item("visit", "2025-01-10", FieldType::Date),
            item("visit", "yes", FieldType::Radio),
        ];

        assert_eq!(dedupe_feedback_items(items).len(), 2);
    }

    #[test]
    fn grouping_merges_records_of_the_same_form() {
        let feedback = vec![
            record(Some("Payment"), vec![item("amount", "10", FieldType::Input)]),
            record(Some("Visit"), vec![item("date", "2025-01-10", FieldType::Date)]),
            record(Some("Payment"), vec![item("amount", "5", FieldType::Input)]),
            record(None, vec![]),
        ];

        let groups = group_by_form(&feedback);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].form_name.as_deref(), Some("Payment"));
        assert_eq!(groups[0].feedback.len(), 2);
        assert_eq!(groups[1].form_name.as_deref(), Some("Visit"));
        assert!(groups[2].form_name.is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn transferred_leads_stay_inside_the_company(pool: sqlx::PgPool) {
        let own = seed_company(&pool, 1).await;
        let other = seed_company(&pool, 1).await;
        let actor = own.manager_id;

        // Histórico em que o mesmo membro aparece num lead de outra empresa
        for (lead_id, to) in [(own.lead_id, own.member_ids[0]), (other.lead_id, other.member_ids[0])] {
            sqlx::query("INSERT INTO lead_transfers (lead_id, transfer_by_id, transfer_to_id) VALUES ($1, $2, $3)")
                .bind(lead_id)
                .bind(actor)
                .bind(to)
                .execute(&pool)
                .await
                .unwrap();
        }

        let service = LeadService::new(
            LeadRepository::new(pool.clone()),
            MemberRepository::new(pool.clone()),
            FeedbackRepository::new(pool.clone()),
        );

        let leads = service.get_transferred_leads(own.company_id, actor).await.unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].lead.id, own.lead_id);
        assert_eq!(leads[0].transfers.len(), 1);
        assert_eq!(leads[0].transfers[0].transfer_to_id, own.member_ids[0]);

        let foreign = service.get_transferred_leads(other.company_id, actor).await.unwrap();
        assert_eq!(foreign.len(), 1);
        assert_eq!(foreign[0].lead.id, other.lead_id);
        assert!(foreign[0].transfers.iter().all(|t| t.lead_id == other.lead_id));
    }
}
