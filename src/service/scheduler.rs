use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

use super::{EngineResult, VacationEngine};
use crate::directory::Directory;
use crate::model::grant::{Grant, GrantStatus};
use crate::model::plan::GrantSchedule;
use crate::repository::{VacationStore, VacationTx};
use crate::vacation::ledger::normalize_amount;
use crate::vacation::rules::GrantStrategy;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SchedulerReport {
    /// grants moved to EXPIRED
    pub expired: usize,
    /// grants created for due fire dates
    pub materialized: usize,
    /// schedules skipped because of an error, see logs
    pub failed: usize,
}

impl<S: VacationStore, D: Directory> VacationEngine<S, D> {
    /// One due-date sweep. Safe to run any number of times for the same
    /// `today`: a fire date that already has a grant is never issued again.
    #[instrument(skip(self))]
    pub async fn run_scheduler(&self, today: NaiveDate, now: NaiveDateTime) -> EngineResult<SchedulerReport> {
        let mut report = SchedulerReport {
            expired: self.expire_lapsed(today).await?,
            ..SchedulerReport::default()
        };

        let schedules = {
            let mut tx = self.store.begin().await?;
            tx.active_schedules().await?
        };
        for schedule in schedules {
            match self.materialize(&schedule, today, now).await {
                Ok(count) => report.materialized += count,
                Err(e) => {
                    error!(error = %e, schedule_id = schedule.id, "Failed to materialize grants");
                    report.failed += 1;
                }
            }
        }

        info!(
            expired = report.expired,
            materialized = report.materialized,
            failed = report.failed,
            "Scheduler sweep finished"
        );
        Ok(report)
    }

    async fn expire_lapsed(&self, today: NaiveDate) -> EngineResult<usize> {
        let mut tx = self.store.begin().await?;
        let lapsed = tx.lapsed_grants(today).await?;
        for mut grant in lapsed.iter().cloned() {
            grant.status = GrantStatus::Expired;
            tx.update_grant(&grant).await?;
        }
        tx.commit().await?;
        Ok(lapsed.len())
    }

    /// Issues the missing grants of one schedule in its own transaction.
    async fn materialize(&self, schedule: &GrantSchedule, today: NaiveDate, now: NaiveDateTime) -> EngineResult<usize> {
        let mut tx = self.store.begin().await?;
        // re-read under lock; the assignment may have been revoked meanwhile
        let Some(schedule) = tx.find_schedule(schedule.user_id, schedule.policy_id).await? else {
            return Ok(0);
        };
        let Some(policy) = tx.get_policy(schedule.policy_id).await? else {
            return Ok(0);
        };
        if policy.deleted {
            return Ok(0);
        }
        let strategy = policy.strategy()?;
        let GrantStrategy::Recurring(_, rule) = strategy else {
            return Ok(0);
        };

        let from = schedule.starts_on.max(rule.first_fire_at.date());
        let mut issued: HashSet<NaiveDate> = tx
            .fire_dates(schedule.user_id, schedule.policy_id)
            .await?
            .into_iter()
            .collect();
        let amount = normalize_amount(strategy.amount(None, None)?);

        let mut created = 0;
        for fire in rule.fires_between(from, today) {
            if issued.contains(&fire) {
                continue;
            }
            if !rule.forever && rule.max_count.is_some_and(|max| issued.len() >= max as usize) {
                break;
            }
            let (grant_date, expiry_date) = strategy.window_from(fire);
            let grant = Grant {
                id: 0,
                user_id: schedule.user_id,
                policy_id: policy.id,
                leave_type: policy.leave_type.clone(),
                description: format!("{} ({fire})", policy.name),
                grant_amount: amount,
                remaining: amount,
                grant_date: Some(grant_date),
                expiry_date: Some(expiry_date),
                status: GrantStatus::Active,
                request_start: None,
                request_end: None,
                reason: None,
                fire_date: Some(fire),
                created_at: now,
            };
            let id = tx.insert_grant(&grant).await?;
            info!(grant_id = id, user_id = grant.user_id, %fire, "Recurring grant issued");
            issued.insert(fire);
            created += 1;
        }
        tx.commit().await?;
        Ok(created)
    }
}
