//! Flat database rows and their conversion into domain types.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sqlx::FromRow;

use crate::error::VacationError;
use crate::model::approval::Approval;
use crate::model::grant::Grant;
use crate::model::plan::{GrantSchedule, Plan, PlanPolicy, UserPlan};
use crate::model::policy::{ExpirationRule, Policy, RepetitionRule};
use crate::model::usage::{Deduction, Usage};

fn parse_column<T: FromStr>(column: &str, value: &str) -> Result<T, VacationError> {
    value
        .parse()
        .map_err(|_| VacationError::invariant(format!("unknown {column} value '{value}' in database")))
}

#[derive(FromRow)]
pub(super) struct PolicyRow {
    id: u64,
    name: String,
    leave_type: String,
    grant_method: String,
    grant_amount: Option<Decimal>,
    minute_grant: bool,
    repeat_unit: Option<String>,
    repeat_interval: Option<u32>,
    fixed_month: Option<u32>,
    fixed_day: Option<u32>,
    first_fire_at: Option<NaiveDateTime>,
    repeat_forever: Option<bool>,
    max_count: Option<u32>,
    effective_rule: String,
    expiration_kind: String,
    expiration_length: Option<u32>,
    approver_count: u32,
    deletable: bool,
    deleted: bool,
    created_at: NaiveDateTime,
}

pub(super) const POLICY_COLUMNS: &str = "id, name, leave_type, grant_method, grant_amount, \
    minute_grant, repeat_unit, repeat_interval, fixed_month, fixed_day, first_fire_at, \
    repeat_forever, max_count, effective_rule, expiration_kind, expiration_length, \
    approver_count, deletable, deleted, created_at";

impl TryFrom<PolicyRow> for Policy {
    type Error = VacationError;

    fn try_from(row: PolicyRow) -> Result<Self, Self::Error> {
        let repetition = match row.repeat_unit.as_deref() {
            None => None,
            Some(unit) => Some(RepetitionRule {
                unit: parse_column("repeat_unit", unit)?,
                interval: row.repeat_interval.unwrap_or(1),
                fixed_month: row.fixed_month,
                fixed_day: row.fixed_day,
                first_fire_at: row.first_fire_at.ok_or_else(|| {
                    VacationError::invariant(format!("policy {} has no first_fire_at", row.id))
                })?,
                forever: row.repeat_forever.unwrap_or(true),
                max_count: row.max_count,
            }),
        };
        let expiration_rule = ExpirationRule::from_parts(&row.expiration_kind, row.expiration_length)
            .ok_or_else(|| {
                VacationError::invariant(format!("policy {} has a malformed expiration rule", row.id))
            })?;

        Ok(Policy {
            id: row.id,
            name: row.name,
            leave_type: row.leave_type,
            grant_method: parse_column("grant_method", &row.grant_method)?,
            grant_amount: row.grant_amount,
            minute_grant: row.minute_grant,
            repetition,
            effective_rule: parse_column("effective_rule", &row.effective_rule)?,
            expiration_rule,
            approver_count: row.approver_count,
            deletable: row.deletable,
            deleted: row.deleted,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
pub(super) struct PlanRow {
    id: u64,
    code: String,
    name: String,
    description: String,
    deleted: bool,
    created_at: NaiveDateTime,
}

pub(super) const PLAN_COLUMNS: &str = "id, code, name, description, deleted, created_at";

impl From<PlanRow> for Plan {
    fn from(row: PlanRow) -> Self {
        Plan {
            id: row.id,
            code: row.code,
            name: row.name,
            description: row.description,
            deleted: row.deleted,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
pub(super) struct PlanPolicyRow {
    id: u64,
    plan_id: u64,
    policy_id: u64,
    position: u32,
    deleted: bool,
}

impl From<PlanPolicyRow> for PlanPolicy {
    fn from(row: PlanPolicyRow) -> Self {
        PlanPolicy {
            id: row.id,
            plan_id: row.plan_id,
            policy_id: row.policy_id,
            position: row.position,
            deleted: row.deleted,
        }
    }
}

#[derive(FromRow)]
pub(super) struct UserPlanRow {
    id: u64,
    user_id: u64,
    plan_id: u64,
    deleted: bool,
    assigned_at: NaiveDateTime,
}

impl From<UserPlanRow> for UserPlan {
    fn from(row: UserPlanRow) -> Self {
        UserPlan {
            id: row.id,
            user_id: row.user_id,
            plan_id: row.plan_id,
            deleted: row.deleted,
            assigned_at: row.assigned_at,
        }
    }
}

#[derive(FromRow)]
pub(super) struct ScheduleRow {
    id: u64,
    user_id: u64,
    policy_id: u64,
    starts_on: NaiveDate,
    deleted: bool,
}

impl From<ScheduleRow> for GrantSchedule {
    fn from(row: ScheduleRow) -> Self {
        GrantSchedule {
            id: row.id,
            user_id: row.user_id,
            policy_id: row.policy_id,
            starts_on: row.starts_on,
            deleted: row.deleted,
        }
    }
}

#[derive(FromRow)]
pub(super) struct GrantRow {
    id: u64,
    user_id: u64,
    policy_id: u64,
    leave_type: String,
    description: String,
    grant_amount: Decimal,
    remaining: Decimal,
    grant_date: Option<NaiveDate>,
    expiry_date: Option<NaiveDate>,
    status: String,
    request_start: Option<NaiveDateTime>,
    request_end: Option<NaiveDateTime>,
    reason: Option<String>,
    fire_date: Option<NaiveDate>,
    created_at: NaiveDateTime,
}

pub(super) const GRANT_COLUMNS: &str = "id, user_id, policy_id, leave_type, description, \
    grant_amount, remaining, grant_date, expiry_date, status, request_start, request_end, \
    reason, fire_date, created_at";

impl TryFrom<GrantRow> for Grant {
    type Error = VacationError;

    fn try_from(row: GrantRow) -> Result<Self, Self::Error> {
        Ok(Grant {
            id: row.id,
            user_id: row.user_id,
            policy_id: row.policy_id,
            leave_type: row.leave_type,
            description: row.description,
            grant_amount: row.grant_amount,
            remaining: row.remaining,
            grant_date: row.grant_date,
            expiry_date: row.expiry_date,
            status: parse_column("grant status", &row.status)?,
            request_start: row.request_start,
            request_end: row.request_end,
            reason: row.reason,
            fire_date: row.fire_date,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
pub(super) struct UsageRow {
    id: u64,
    user_id: u64,
    leave_type: String,
    description: String,
    unit: String,
    start_at: NaiveDateTime,
    end_at: NaiveDateTime,
    used_amount: Decimal,
    deleted: bool,
    created_at: NaiveDateTime,
}

pub(super) const USAGE_COLUMNS: &str = "id, user_id, leave_type, description, unit, start_at, \
    end_at, used_amount, deleted, created_at";

impl TryFrom<UsageRow> for Usage {
    type Error = VacationError;

    fn try_from(row: UsageRow) -> Result<Self, Self::Error> {
        Ok(Usage {
            id: row.id,
            user_id: row.user_id,
            leave_type: row.leave_type,
            description: row.description,
            unit: parse_column("usage unit", &row.unit)?,
            start_at: row.start_at,
            end_at: row.end_at,
            used_amount: row.used_amount,
            deleted: row.deleted,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
pub(super) struct DeductionRow {
    id: u64,
    usage_id: u64,
    grant_id: u64,
    amount: Decimal,
    created_at: NaiveDateTime,
}

impl From<DeductionRow> for Deduction {
    fn from(row: DeductionRow) -> Self {
        Deduction {
            id: row.id,
            usage_id: row.usage_id,
            grant_id: row.grant_id,
            amount: row.amount,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
pub(super) struct ApprovalRow {
    id: u64,
    grant_id: u64,
    approver_id: u64,
    seq: u32,
    status: String,
    decided_at: Option<NaiveDateTime>,
    reject_reason: Option<String>,
}

pub(super) const APPROVAL_COLUMNS: &str =
    "id, grant_id, approver_id, seq, status, decided_at, reject_reason";

impl TryFrom<ApprovalRow> for Approval {
    type Error = VacationError;

    fn try_from(row: ApprovalRow) -> Result<Self, Self::Error> {
        Ok(Approval {
            id: row.id,
            grant_id: row.grant_id,
            approver_id: row.approver_id,
            seq: row.seq,
            status: parse_column("approval status", &row.status)?,
            decided_at: row.decided_at,
            reject_reason: row.reject_reason,
        })
    }
}

/// Converts a batch of rows, failing on the first malformed one.
pub(super) fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, VacationError>
where
    T: TryFrom<R, Error = VacationError>,
{
    rows.into_iter().map(T::try_from).collect()
}
