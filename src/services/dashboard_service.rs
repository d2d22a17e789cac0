// src/services/dashboard_service.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Days, NaiveTime, Utc};
use uuid::Uuid;

use crate::{
    common::{
        dates::{WIRE_DATE_FORMAT, parse_wire_date},
        error::AppError,
    },
    db::DashboardRepository,
    models::{
        dashboard::{FeedbackActivity, FeedbackActivityRow, LeadActivity, LeadActivityRow, LeadRangeSummary},
        lead::CallStatus,
    },
};

// Cargos que não entram na contagem de feedback por cargo
const EXCLUDED_ROLES: [&str; 2] = ["manager", "root"];

const PAYMENT_FORM_MARKER: &str = "Payment";
const AMOUNT_FIELD: &str = "amount";

/// Converte `fromDate`/`toDate` (YYYY-MM-DD, inclusivos) em `[início, fim)` em UTC.
pub fn parse_date_range(from: &str, to: &str) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let from_day = parse_wire_date(from)
        .ok_or_else(|| AppError::InvalidDateRange(format!("fromDate inválido: '{}'", from)))?;
    let to_day = parse_wire_date(to)
        .ok_or_else(|| AppError::InvalidDateRange(format!("toDate inválido: '{}'", to)))?;

    if from_day > to_day {
        return Err(AppError::InvalidDateRange(format!(
            "fromDate ({}) é posterior a toDate ({})",
            from_day.format(WIRE_DATE_FORMAT),
            to_day.format(WIRE_DATE_FORMAT)
        )));
    }

    let until_day = to_day
        .checked_add_days(Days::new(1))
        .ok_or_else(|| AppError::InvalidDateRange(format!("toDate fora do intervalo: '{}'", to)))?;

    Ok((
        from_day.and_time(NaiveTime::MIN).and_utc(),
        until_day.and_time(NaiveTime::MIN).and_utc(),
    ))
}

/// Remonta as linhas achatadas do banco em lead -> feedbacks -> itens.
pub fn assemble_activity(leads: Vec<LeadActivityRow>, rows: Vec<FeedbackActivityRow>) -> Vec<LeadActivity> {
    // feedback_id -> (lead_id, feedback), na ordem de chegada
    let mut order: Vec<Uuid> = Vec::new();
    let mut records: HashMap<Uuid, (Uuid, FeedbackActivity)> = HashMap::new();

    for row in rows {
        let (_, record) = records.entry(row.feedback_id).or_insert_with(|| {
            order.push(row.feedback_id);
            (
                row.lead_id,
                FeedbackActivity {
                    form_name: row.form_name.clone(),
                    role_name: row.role_name.clone(),
                    items: Vec::new(),
                },
            )
        });
        if let Some(name) = row.item_name {
            record.items.push((name, row.item_value.unwrap_or_default()));
        }
    }

    let mut by_lead: HashMap<Uuid, Vec<FeedbackActivity>> = HashMap::new();
    for feedback_id in order {
        if let Some((lead_id, record)) = records.remove(&feedback_id) {
            by_lead.entry(lead_id).or_default().push(record);
        }
    }

    leads
        .into_iter()
        .map(|lead| LeadActivity {
            feedback: by_lead.remove(&lead.id).unwrap_or_default(),
            id: lead.id,
            call_status: lead.call_status,
            created_at: lead.created_at,
        })
        .collect()
}

fn parse_amount(value: &str) -> f64 {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Calcula os indicadores numa passada só.
pub fn summarize(leads: &[LeadActivity]) -> LeadRangeSummary {
    let mut summary = LeadRangeSummary::default();
    let mut leads_by_role: BTreeMap<String, BTreeSet<Uuid>> = BTreeMap::new();

    for lead in leads {
        if lead.call_status == CallStatus::Success {
            summary.call_count += 1;
        }

        let day = lead.created_at.date_naive().format(WIRE_DATE_FORMAT).to_string();
        *summary.grouped_call_perday.entry(day).or_insert(0) += 1;

        for feedback in &lead.feedback {
            let is_payment = feedback
                .form_name
                .as_deref()
                .is_some_and(|f| f.contains(PAYMENT_FORM_MARKER));
            if is_payment {
                summary.total_pay_collected_count += feedback
                    .items
                    .iter()
                    .filter(|(name, _)| name == AMOUNT_FIELD)
                    .map(|(_, value)| parse_amount(value))
                    .sum::<f64>();
            }

            if feedback.items.is_empty() {
                continue;
            }
            if let Some(role) = feedback.role_name.as_deref() {
                let excluded = EXCLUDED_ROLES.iter().any(|r| role.eq_ignore_ascii_case(r));
                if !excluded {
                    leads_by_role.entry(role.to_string()).or_default().insert(lead.id);
                }
            }
        }
    }

    summary.leads_with_feedback_by_role = leads_by_role
        .into_iter()
        .map(|(role, leads)| (role, leads.len() as u64))
        .collect();

    summary
}

#[derive(Clone)]
pub struct DashboardService {
    dashboard_repo: DashboardRepository,
}

impl DashboardService {
    pub fn new(dashboard_repo: DashboardRepository) -> Self {
        Self { dashboard_repo }
    }

    pub async fn get_leads_by_date_range(
        &self,
        company_id: Uuid,
        from_date: &str,
        to_date: &str,
    ) -> Result<LeadRangeSummary, AppError> {
        let (from, until) = parse_date_range(from_date, to_date)?;

        let (leads, feedback) = self.dashboard_repo
            .load_lead_activity(company_id, from, until)
            .await?;

        let summary = summarize(&assemble_activity(leads, feedback));

        tracing::debug!(
            %company_id,
            from_date,
            to_date,
            calls = summary.call_count,
            "📊 Indicadores de leads calculados"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).single().unwrap()
    }

    fn lead(status: CallStatus, created_at: DateTime<Utc>, feedback: Vec<FeedbackActivity>) -> LeadActivity {
        LeadActivity { id: Uuid::new_v4(), call_status: status, created_at, feedback }
    }

    fn feedback(form: &str, role: &str, items: &[(&str, &str)]) -> FeedbackActivity {
        FeedbackActivity {
            form_name: Some(form.into()),
            role_name: Some(role.into()),
            items: items.iter().map(|(n, v)| (n.to_string(), v.to_string())).collect(),
        }
    }

    #[test]
    fn no_leads_yields_zeroed_summary() {
        let summary = summarize(&[]);

        assert_eq!(summary.call_count, 0);
        assert_eq!(summary.total_pay_collected_count, 0.0);
        assert!(summary.grouped_call_perday.is_empty());
        assert!(summary.leads_with_feedback_by_role.is_empty());
    }

    #[test]
    fn counts_successful_calls_and_leads_per_day() {
        let leads = vec![
            lead(CallStatus::Success, at(2025, 1, 10, 9), vec![]),
            lead(CallStatus::Busy, at(2025, 1, 10, 18), vec![]),
            lead(CallStatus::Success, at(2025, 1, 12, 7), vec![]),
        ];

        let summary = summarize(&leads);

        assert_eq!(summary.call_count, 2);
        assert_eq!(summary.grouped_call_perday.get("2025-01-10"), Some(&2));
        assert_eq!(summary.grouped_call_perday.get("2025-01-12"), Some(&1));
        assert_eq!(summary.grouped_call_perday.len(), 2);
    }

    #[test]
    fn sums_amounts_only_from_payment_forms() {
        let leads = vec![lead(
            CallStatus::Success,
            at(2025, 1, 10, 9),
            vec![
                feedback("Payment Collection", "telecaller", &[("amount", "100.5"), ("note", "7")]),
                feedback("Partial Payment", "telecaller", &[("amount", "abc")]),
                feedback("Visit", "telecaller", &[("amount", "999")]),
                feedback("payment lowercase", "telecaller", &[("amount", "50")]),
            ],
        )];

        let summary = summarize(&leads);

        assert_eq!(summary.total_pay_collected_count, 100.5);
    }

    #[test]
    fn role_counts_skip_manager_and_root_in_any_case() {
        let leads = vec![lead(
            CallStatus::Pending,
            at(2025, 1, 10, 9),
            vec![
                feedback("Visit", "Manager", &[("note", "ok")]),
                feedback("Visit", "ROOT", &[("note", "ok")]),
                feedback("Visit", "telecaller", &[("note", "ok")]),
            ],
        )];

        let summary = summarize(&leads);

        assert_eq!(summary.leads_with_feedback_by_role.len(), 1);
        assert_eq!(summary.leads_with_feedback_by_role.get("telecaller"), Some(&1));
    }

    #[test]
    fn role_counts_are_distinct_leads_with_items() {
        let leads = vec![
            lead(
                CallStatus::Pending,
                at(2025, 1, 10, 9),
                vec![
                    feedback("Visit", "telecaller", &[("note", "a")]),
                    feedback("Payment", "telecaller", &[("amount", "1")]),
                ],
            ),
            lead(CallStatus::Pending, at(2025, 1, 10, 9), vec![feedback("Visit", "telecaller", &[])]),
        ];

        let summary = summarize(&leads);

        assert_eq!(summary.leads_with_feedback_by_role.get("telecaller"), Some(&1));
    }

    #[test]
    fn date_range_covers_whole_days() {
        let (from, until) = parse_date_range("2025-01-10", "2025-01-10").unwrap();

        assert_eq!(from, at(2025, 1, 10, 0));
        assert_eq!(until, at(2025, 1, 11, 0));
    }

    #[test]
    fn malformed_date_range_is_rejected() {
        for (from, to) in [("10/01/2025", "2025-01-11"), ("2025-01-10", ""), ("2025-01-12", "2025-01-10")] {
            assert!(
                matches!(parse_date_range(from, to), Err(AppError::InvalidDateRange(_))),
                "({from}, {to}) should be rejected"
            );
        }
    }

    #[test]
    fn activity_rows_are_regrouped_by_lead_and_feedback() {
        let (lead_a, lead_b) = (Uuid::new_v4(), Uuid::new_v4());
        let fb = Uuid::new_v4();
        let created_at = at(2025, 1, 10, 9);
        let row = |name: Option<&str>, value: Option<&str>| FeedbackActivityRow {
            feedback_id: fb,
            lead_id: lead_b,
            form_name: Some("Payment".into()),
            role_name: Some("telecaller".into()),
            item_name: name.map(String::from),
            item_value: value.map(String::from),
        };

        let activity = assemble_activity(
            vec![
                LeadActivityRow { id: lead_a, call_status: CallStatus::Pending, created_at },
                LeadActivityRow { id: lead_b, call_status: CallStatus::Success, created_at },
            ],
            vec![row(Some("amount"), Some("10")), row(Some("note"), None)],
        );

        assert!(activity[0].feedback.is_empty());
        assert_eq!(activity[1].feedback.len(), 1);
        assert_eq!(
            activity[1].feedback[0].items,
            vec![("amount".to_string(), "10".to_string()), ("note".to_string(), String::new())]
        );
    }
}
