use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::grant::{Grant, GrantStatus};
use crate::model::usage::{Deduction, Usage};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BalanceSummary {
    #[schema(example = "ANNUAL")]
    pub leave_type: String,
    #[schema(example = "15.0", value_type = String)]
    pub granted: Decimal,
    #[schema(example = "3.5", value_type = String)]
    pub used: Decimal,
    #[schema(example = "11.5", value_type = String)]
    pub remaining: Decimal,
    #[schema(example = "2026-12-31", format = "date", value_type = Option<String>)]
    pub next_expiry: Option<NaiveDate>,
    pub grant_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct UsageSummary {
    #[schema(example = "ANNUAL")]
    pub leave_type: String,
    #[schema(example = "3.5", value_type = String)]
    pub used: Decimal,
    pub usage_count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GrantHistory {
    pub grant: Grant,
    pub deductions: Vec<Deduction>,
}

/// Balance per leave type over active grants valid on `today`.
pub fn balance_summary(grants: &[Grant], today: NaiveDate) -> Vec<BalanceSummary> {
    let mut by_type: BTreeMap<&str, BalanceSummary> = BTreeMap::new();

    for grant in grants
        .iter()
        .filter(|g| g.status == GrantStatus::Active && g.covers(today))
    {
        let entry = by_type
            .entry(grant.leave_type.as_str())
            .or_insert_with(|| BalanceSummary {
                leave_type: grant.leave_type.clone(),
                granted: Decimal::ZERO,
                used: Decimal::ZERO,
                remaining: Decimal::ZERO,
                next_expiry: None,
                grant_count: 0,
            });
        entry.granted += grant.grant_amount;
        entry.used += grant.used();
        entry.remaining += grant.remaining;
        entry.grant_count += 1;
        if grant.remaining > Decimal::ZERO {
            entry.next_expiry = match (entry.next_expiry, grant.expiry_date) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        }
    }

    by_type.into_values().collect()
}

/// Usage per leave type for non-cancelled usages starting in `year`.
pub fn usage_summary(usages: &[Usage], year: i32) -> Vec<UsageSummary> {
    let mut by_type: BTreeMap<&str, UsageSummary> = BTreeMap::new();

    for usage in usages
        .iter()
        .filter(|u| !u.deleted && u.start_at.year() == year)
    {
        let entry = by_type
            .entry(usage.leave_type.as_str())
            .or_insert_with(|| UsageSummary {
                leave_type: usage.leave_type.clone(),
                used: Decimal::ZERO,
                usage_count: 0,
            });
        entry.used += usage.used_amount;
        entry.usage_count += 1;
    }

    by_type.into_values().collect()
}
