use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{info, instrument};
use utoipa::ToSchema;

use super::{found, EngineResult, VacationEngine};
use crate::directory::Directory;
use crate::error::{RuleViolation, VacationError};
use crate::model::grant::{Grant, GrantStatus, ManualGrant};
use crate::model::usage::{Deduction, Usage, UseVacation};
use crate::repository::{VacationStore, VacationTx};
use crate::vacation::calendar::{chargeable_days, days_off, required_amount, within_working_hours};
use crate::vacation::ledger::{self, normalize_amount, plan_allocation};
use crate::vacation::rules::GrantStrategy;

/// A booked usage together with the grants it drew from.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UsageReceipt {
    pub usage: Usage,
    pub deductions: Vec<Deduction>,
}

impl<S: VacationStore, D: Directory> VacationEngine<S, D> {
    /// Books a usage against the user's grants, earliest expiry first.
    #[instrument(skip(self, request), fields(user_id = request.user_id, leave_type = %request.leave_type))]
    pub async fn use_vacation(&self, request: UseVacation, now: NaiveDateTime) -> EngineResult<UsageReceipt> {
        let mut tx = self.store.begin().await?;
        let receipt = self.allocate(&mut tx, &request, now).await?;
        tx.commit().await?;

        info!(
            usage_id = receipt.usage.id,
            amount = %receipt.usage.used_amount,
            grants = receipt.deductions.len(),
            "Vacation used"
        );
        Ok(receipt)
    }

    /// Cancels a usage that has not started yet and gives its amount back.
    #[instrument(skip(self))]
    pub async fn cancel_vacation_usage(&self, usage_id: u64, now: NaiveDateTime) -> EngineResult<Usage> {
        let mut tx = self.store.begin().await?;
        let usage = self.restore(&mut tx, usage_id, now).await?;
        tx.commit().await?;

        info!(usage_id, amount = %usage.used_amount, "Vacation usage cancelled");
        Ok(usage)
    }

    /// Cancel and re-book in one transaction; the new usage gets a new id.
    #[instrument(skip(self, request))]
    pub async fn update_vacation_usage(
        &self,
        usage_id: u64,
        request: UseVacation,
        now: NaiveDateTime,
    ) -> EngineResult<UsageReceipt> {
        let mut tx = self.store.begin().await?;
        let previous = self.restore(&mut tx, usage_id, now).await?;
        if previous.user_id != request.user_id {
            return Err(VacationError::validation("usage belongs to another user"));
        }
        let receipt = self.allocate(&mut tx, &request, now).await?;
        tx.commit().await?;

        info!(usage_id, new_usage_id = receipt.usage.id, "Vacation usage updated");
        Ok(receipt)
    }

    /// Issues a grant under a MANUAL policy.
    #[instrument(skip(self, request), fields(user_id = request.user_id, policy_id = request.policy_id))]
    pub async fn manual_grant_vacation(&self, request: ManualGrant, now: NaiveDateTime) -> EngineResult<Grant> {
        self.directory.get_user(request.user_id).await?;

        let mut tx = self.store.begin().await?;
        let policy = found(tx.get_policy(request.policy_id).await?, "policy", request.policy_id)?;
        if policy.deleted {
            return Err(RuleViolation::PolicyDeleted.into());
        }
        let strategy = policy.strategy()?;
        if !matches!(strategy, GrantStrategy::Manual(_)) {
            return Err(RuleViolation::WrongGrantMethod.into());
        }
        let amount = normalize_amount(strategy.amount(request.amount, None)?);
        let (grant_date, expiry_date) = manual_window(&strategy, &request, now)?;

        let mut grant = Grant {
            id: 0,
            user_id: request.user_id,
            policy_id: policy.id,
            leave_type: policy.leave_type.clone(),
            description: request.description,
            grant_amount: amount,
            remaining: amount,
            grant_date: Some(grant_date),
            expiry_date: Some(expiry_date),
            status: GrantStatus::Active,
            request_start: None,
            request_end: None,
            reason: None,
            fire_date: None,
            created_at: now,
        };
        grant.id = tx.insert_grant(&grant).await?;
        tx.commit().await?;

        info!(grant_id = grant.id, amount = %grant.grant_amount, "Manual grant issued");
        Ok(grant)
    }

    /// Revokes an active grant nobody has drawn from yet.
    #[instrument(skip(self))]
    pub async fn revoke_vacation_grant(&self, grant_id: u64) -> EngineResult<Grant> {
        let mut tx = self.store.begin().await?;
        let mut grant = found(tx.get_grant(grant_id).await?, "grant", grant_id)?;
        ledger::revoke(&mut grant)?;
        tx.update_grant(&grant).await?;
        tx.commit().await?;

        info!(grant_id, "Grant revoked");
        Ok(grant)
    }

    async fn allocate(&self, tx: &mut S::Tx, request: &UseVacation, now: NaiveDateTime) -> EngineResult<UsageReceipt> {
        let (start, end) = (request.start_at, request.end_at);
        if start > end {
            return Err(VacationError::validation("start must not be after end"));
        }
        let leave_type = request.leave_type.trim();
        if leave_type.is_empty() {
            return Err(VacationError::validation("leave_type is required"));
        }

        let profile = self.directory.get_user(request.user_id).await?;
        if !request.unit.is_full_day() {
            if start.date() != end.date() {
                return Err(VacationError::validation(
                    "sub-day usage must start and end on the same date",
                ));
            }
            if !within_working_hours(&profile, start, end) {
                return Err(RuleViolation::OutsideWorkingHours.into());
            }
        }
        if request.unit.is_minute() {
            let allowed = tx
                .list_policies()
                .await?
                .iter()
                .any(|p| !p.deleted && p.leave_type == leave_type && p.minute_grant);
            if !allowed {
                return Err(RuleViolation::MinuteUsageNotAllowed.into());
            }
        }

        let holidays = self
            .directory
            .list_holidays(&profile.country_code, start.date(), end.date())
            .await?;
        let chargeable = chargeable_days(start.date(), end.date(), &days_off(&holidays)).len();
        let required = normalize_amount(required_amount(request.unit, start, end, chargeable, &profile)?);

        let mut grants = tx.usable_grants(request.user_id, leave_type, start.date()).await?;
        let plan = plan_allocation(&grants, required)?;

        let mut usage = Usage {
            id: 0,
            user_id: request.user_id,
            leave_type: leave_type.to_string(),
            description: request.description.clone(),
            unit: request.unit,
            start_at: start,
            end_at: end,
            used_amount: required,
            deleted: false,
            created_at: now,
        };
        usage.id = tx.insert_usage(&usage).await?;

        let mut deductions = Vec::with_capacity(plan.len());
        for step in plan {
            let grant = grants
                .iter_mut()
                .find(|g| g.id == step.grant_id)
                .ok_or_else(|| VacationError::invariant(format!("planned grant {} vanished", step.grant_id)))?;
            ledger::apply_deduction(grant, step.amount)?;
            tx.update_grant(grant).await?;

            let mut deduction = Deduction {
                id: 0,
                usage_id: usage.id,
                grant_id: grant.id,
                amount: step.amount,
                created_at: now,
            };
            deduction.id = tx.insert_deduction(&deduction).await?;
            deductions.push(deduction);
        }

        Ok(UsageReceipt { usage, deductions })
    }

    async fn restore(&self, tx: &mut S::Tx, usage_id: u64, now: NaiveDateTime) -> EngineResult<Usage> {
        let mut usage = found(tx.get_usage(usage_id).await?, "usage", usage_id)?;
        if usage.deleted {
            return Err(RuleViolation::UsageAlreadyCancelled.into());
        }
        if now >= usage.start_at {
            return Err(RuleViolation::CancelAfterStart.into());
        }

        for deduction in tx.deductions_for_usage(usage_id).await? {
            let mut grant = found(tx.get_grant(deduction.grant_id).await?, "grant", deduction.grant_id)?;
            ledger::restore_deduction(&mut grant, deduction.amount)?;
            tx.update_grant(&grant).await?;
        }
        tx.mark_usage_deleted(usage_id).await?;
        usage.deleted = true;
        Ok(usage)
    }
}

/// Caller-supplied dates win; missing ones come from the policy's rules.
fn manual_window(
    strategy: &GrantStrategy<'_>,
    request: &ManualGrant,
    now: NaiveDateTime,
) -> EngineResult<(NaiveDate, NaiveDate)> {
    let (rule_start, _) = strategy.window_at(now);
    let grant_date = request.grant_date.unwrap_or(rule_start);
    let expiry_date = match request.expiry_date {
        Some(expiry) => expiry,
        None => strategy.window_from(grant_date).1,
    };
    let supplied = request.grant_date.is_some() || request.expiry_date.is_some();
    if supplied && grant_date >= expiry_date {
        return Err(VacationError::validation("grant date must precede expiry date"));
    }
    Ok((grant_date, expiry_date))
}
