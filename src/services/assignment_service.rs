// src/services/assignment_service.rs

use std::collections::HashMap;

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::dedup_ids, error::AppError},
    db::{FeedbackRepository, LeadRepository, MemberRepository},
    models::lead::{Lead, LeadAssignee, LeadWithMembers},
    services::feedback_service::attach_items,
};

/// Produto cartesiano (lead, membro) da atribuição em massa.
pub fn fan_out_pairs(lead_ids: &[Uuid], member_ids: &[Uuid]) -> Vec<(Uuid, Uuid)> {
    let leads = dedup_ids(lead_ids);
    let members = dedup_ids(member_ids);

    leads
        .iter()
        .flat_map(|lead| members.iter().map(move |member| (*lead, *member)))
        .collect()
}

/// Ids pedidos que não voltaram da consulta.
pub fn missing_ids(requested: &[Uuid], found: &[Uuid]) -> Vec<Uuid> {
    requested.iter().filter(|id| !found.contains(id)).copied().collect()
}

pub(crate) fn attach_assignees(leads: Vec<Lead>, assignees: Vec<LeadAssignee>) -> Vec<LeadWithMembers> {
    let mut by_lead: HashMap<Uuid, Vec<LeadAssignee>> = HashMap::new();
    for assignee in assignees {
        by_lead.entry(assignee.lead_id).or_default().push(assignee);
    }

    leads
        .into_iter()
        .map(|lead| LeadWithMembers {
            members: by_lead.remove(&lead.id).unwrap_or_default(),
            lead,
        })
        .collect()
}

#[derive(Clone)]
pub struct AssignmentService {
    lead_repo: LeadRepository,
    member_repo: MemberRepository,
    feedback_repo: FeedbackRepository,
}

impl AssignmentService {
    pub fn new(
        lead_repo: LeadRepository,
        member_repo: MemberRepository,
        feedback_repo: FeedbackRepository,
    ) -> Self {
        Self { lead_repo, member_repo, feedback_repo }
    }

    /// Atribuição em massa: cada lead selecionado passa a ter TODOS os membros
    /// selecionados como responsáveis. Ou valida tudo e grava tudo, ou nada.
    pub async fn assign_leads<'e, A>(
        &self,
        db: A,
        company_id: Uuid,
        dept_id: Uuid,
        lead_ids: &[Uuid],
        member_ids: &[Uuid],
        description: Option<&str>,
    ) -> Result<Vec<LeadWithMembers>, AppError>
    where
        A: Acquire<'e, Database = Postgres>,
    {
        let lead_ids = dedup_ids(lead_ids);
        let member_ids = dedup_ids(member_ids);

        let mut tx = db.begin().await?;

        let found_leads = self.lead_repo
            .find_existing_lead_ids(&mut *tx, company_id, &lead_ids)
            .await?;
        if !missing_ids(&lead_ids, &found_leads).is_empty() {
            return Err(AppError::not_found("Um ou mais leads da empresa"));
        }

        let found_members = self.member_repo
            .find_existing_member_ids(&mut *tx, company_id, dept_id, &member_ids)
            .await?;
        if !missing_ids(&member_ids, &found_members).is_empty() {
            return Err(AppError::not_found("Um ou mais membros da empresa/departamento"));
        }

        let pairs = fan_out_pairs(&lead_ids, &member_ids);
        let written = self.lead_repo.replace_assignees(&mut *tx, &lead_ids, &pairs).await?;

        let leads = self.lead_repo.list_leads_by_ids(&mut *tx, &lead_ids).await?;
        let assignees = self.lead_repo.list_assignees(&mut *tx, &lead_ids).await?;

        tx.commit().await?;

        tracing::info!(
            %company_id,
            leads = lead_ids.len(),
            members = member_ids.len(),
            written,
            description = description.unwrap_or(""),
            "📌 Leads atribuídos"
        );

        Ok(attach_assignees(leads, assignees))
    }

    /// Transfere o lead para um único novo responsável, guardando o retrato
    /// dos feedbacks atuais no histórico.
    pub async fn transfer_lead<'e, A>(
        &self,
        db: A,
        company_id: Uuid,
        acting_member_id: Uuid,
        lead_id: Uuid,
        transfer_to_id: Uuid,
    ) -> Result<LeadWithMembers, AppError>
    where
        A: Acquire<'e, Database = Postgres>,
    {
        let mut tx = db.begin().await?;

        let lead = self.lead_repo
            .find_lead(&mut *tx, company_id, lead_id)
            .await?
            .ok_or_else(|| AppError::not_found("Lead"))?;

        self.member_repo
            .find_member_in_company(&mut *tx, transfer_to_id, company_id)
            .await?
            .ok_or_else(|| AppError::not_found("Membro"))?;

        // Retrato dos feedbacks no momento da transferência
        let headers = self.feedback_repo.list_feedback_headers(&mut *tx, &[lead.id]).await?;
        let feedback_ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
        let items = self.feedback_repo
            .list_items_for_feedbacks(&mut *tx, &feedback_ids)
            .await?;
        let snapshot = serde_json::to_value(attach_items(headers, items))
            .map_err(|e| anyhow::anyhow!("Falha ao serializar o histórico do lead: {}", e))?;

        let transfer = self.lead_repo
            .create_transfer(&mut *tx, lead.id, acting_member_id, transfer_to_id, &snapshot)
            .await?;

        self.lead_repo.set_sole_assignee(&mut *tx, lead.id, transfer_to_id).await?;
        let members = self.lead_repo.list_assignees(&mut *tx, &[lead.id]).await?;

        tx.commit().await?;

        tracing::info!(
            %lead_id,
            from = %acting_member_id,
            to = %transfer_to_id,
            transfer_id = %transfer.id,
            "🔁 Lead transferido"
        );

        Ok(LeadWithMembers { lead, members })
    }

    pub async fn approve_lead<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        lead_id: Uuid,
        approved: bool,
    ) -> Result<Lead, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.lead_repo
            .set_lead_approved(executor, company_id, lead_id, approved)
            .await?
            .ok_or_else(|| AppError::not_found("Lead"))
    }

    /// Aprovação financeira: o lead volta a ter só o gerente da empresa como responsável.
    pub async fn update_finance_status<'e, A>(
        &self,
        db: A,
        company_id: Uuid,
        acting_member_id: Uuid,
        lead_id: Uuid,
        approved: bool,
    ) -> Result<Lead, AppError>
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

        let lead = self.lead_repo
            .set_financed_approved(&mut *tx, company_id, lead_id, approved)
            .await?
            .ok_or_else(|| AppError::not_found("Lead"))?;

        self.lead_repo.set_sole_assignee(&mut *tx, lead.id, manager_id).await?;

        tx.commit().await?;

        tracing::info!(%lead_id, approved, by = %acting_member_id, %manager_id, "🏦 Status financeiro atualizado");

        Ok(lead)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::common::test_fixtures::{assign, assignee_ids, count_rows, seed_company};
    use crate::models::lead::{CallStatus, PaymentStatus};

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    fn lead(id: Uuid) -> Lead {
        let now = Utc::now();
        Lead {
            id,
            company_id: Uuid::nil(),
            name: "Lead".into(),
            email: "lead@example.com".into(),
            phone: "5511999999999".into(),
            alternate_phone: None,
            address: "Rua A, 1".into(),
            city: "São Paulo".into(),
            state: "SP".into(),
            zip: "01000-000".into(),
            rating: None,
            vehicle_date: None,
            vehicle_name: None,
            vehicle_model: None,
            call_status: CallStatus::Pending,
            payment_status: PaymentStatus::Pending,
            is_lead_approved: false,
            is_financed_approved: false,
            next_follow_up_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn fan_out_is_the_full_cross_product() {
        let leads = ids(3);
        let members = ids(2);

        let pairs = fan_out_pairs(&leads, &members);

        assert_eq!(pairs.len(), 6);
        for l in &leads {
            for m in &members {
                assert_eq!(pairs.iter().filter(|p| **p == (*l, *m)).count(), 1);
            }
        }
    }

    #[test]
    fn fan_out_collapses_repeated_ids() {
        let lead = Uuid::new_v4();
        let member = Uuid::new_v4();

        let pairs = fan_out_pairs(&[lead, lead], &[member, member, member]);

        assert_eq!(pairs, vec![(lead, member)]);
    }

    #[test]
    fn fan_out_with_no_members_yields_nothing() {
        assert!(fan_out_pairs(&ids(2), &[]).is_empty());
    }

    #[test]
    fn missing_ids_reports_what_was_not_found() {
        let requested = ids(3);
        let found = vec![requested[0], requested[2]];

        assert_eq!(missing_ids(&requested, &found), vec![requested[1]]);
        assert!(missing_ids(&requested, &requested).is_empty());
    }

    #[test]
    fn assignees_are_attached_to_their_lead() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let member = Uuid::new_v4();
        let assignee = LeadAssignee {
            lead_id: b,
            member_id: member,
            name: "Bruno".into(),
            email: "bruno@example.com".into(),
            assigned_at: Utc::now(),
        };

        let result = attach_assignees(vec![lead(a), lead(b)], vec![assignee]);

        assert!(result[0].members.is_empty());
        assert_eq!(result[1].members.len(), 1);
        assert_eq!(result[1].members[0].member_id, member);
    }

    fn service(pool: &sqlx::PgPool) -> AssignmentService {
        AssignmentService::new(
            LeadRepository::new(pool.clone()),
            MemberRepository::new(pool.clone()),
            FeedbackRepository::new(pool.clone()),
        )
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn transfer_leaves_one_owner_and_one_history_row(pool: sqlx::PgPool) {
        let seed = seed_company(&pool, 2).await;
        assign(&pool, seed.lead_id, seed.member_ids[0]).await;
        let target = seed.member_ids[1];

        let result = service(&pool)
            .transfer_lead(&pool, seed.company_id, seed.manager_id, seed.lead_id, target)
            .await
            .unwrap();

        assert_eq!(result.members.len(), 1);
        assert_eq!(result.members[0].member_id, target);
        assert_eq!(assignee_ids(&pool, seed.lead_id).await, vec![target]);
        assert_eq!(count_rows(&pool, "lead_transfers", seed.lead_id).await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn transfer_to_another_company_member_changes_nothing(pool: sqlx::PgPool) {
        let seed = seed_company(&pool, 1).await;
        let other = seed_company(&pool, 1).await;

        let err = service(&pool)
            .transfer_lead(&pool, seed.company_id, seed.manager_id, seed.lead_id, other.member_ids[0])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(assignee_ids(&pool, seed.lead_id).await, vec![seed.manager_id]);
        assert_eq!(count_rows(&pool, "lead_transfers", seed.lead_id).await, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn assignment_replaces_previous_owners(pool: sqlx::PgPool) {
        let seed = seed_company(&pool, 2).await;

        let result = service(&pool)
            .assign_leads(&pool, seed.company_id, seed.dept_id, &[seed.lead_id], &seed.member_ids, None)
            .await
            .unwrap();

        let mut owners = assignee_ids(&pool, seed.lead_id).await;
        owners.sort();
        let mut expected = seed.member_ids.clone();
        expected.sort();

        assert_eq!(owners, expected);
        assert!(!owners.contains(&seed.manager_id));
        assert_eq!(result[0].members.len(), 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn finance_sign_off_hands_the_lead_back_to_the_manager(pool: sqlx::PgPool) {
        let seed = seed_company(&pool, 1).await;
        service(&pool)
            .assign_leads(&pool, seed.company_id, seed.dept_id, &[seed.lead_id], &seed.member_ids, None)
            .await
            .unwrap();

        let lead = service(&pool)
            .update_finance_status(&pool, seed.company_id, seed.member_ids[0], seed.lead_id, true)
            .await
            .unwrap();

        assert!(lead.is_financed_approved);
        assert_eq!(assignee_ids(&pool, seed.lead_id).await, vec![seed.manager_id]);
    }
}
