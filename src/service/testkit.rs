//! Fixtures shared by the engine tests.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use super::VacationEngine;
use crate::directory::fixed::FixedDirectory;
use crate::model::grant::{Grant, ManualGrant};
use crate::model::policy::{
    EffectiveRule, ExpirationRule, GrantMethod, NewPolicy, RepeatUnit, RepetitionRule,
};
use crate::repository::memory::MemoryStore;

pub type TestEngine = VacationEngine<MemoryStore, FixedDirectory>;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(day: NaiveDate, hour: u32) -> NaiveDateTime {
    day.and_hms_opt(hour, 0, 0).unwrap()
}

/// Users 1 to 4, all KR on 09:00-18:00.
pub fn directory() -> FixedDirectory {
    FixedDirectory::default()
        .with_user(1)
        .with_user(2)
        .with_user(3)
        .with_user(4)
}

pub fn engine() -> (TestEngine, MemoryStore) {
    engine_with(directory())
}

pub fn engine_with(directory: FixedDirectory) -> (TestEngine, MemoryStore) {
    let store = MemoryStore::default();
    (VacationEngine::new(store.clone(), directory), store)
}

pub fn manual_policy(leave_type: &str, amount: Option<Decimal>) -> NewPolicy {
    NewPolicy {
        name: format!("{leave_type} manual"),
        leave_type: leave_type.into(),
        grant_method: GrantMethod::Manual,
        grant_amount: amount,
        minute_grant: false,
        repetition: None,
        effective_rule: EffectiveRule::Immediate,
        expiration_rule: ExpirationRule::Years(1),
        approver_count: 0,
        deletable: true,
    }
}

/// Fires every January 1st from 2025 on.
pub fn yearly_policy(amount: Decimal) -> NewPolicy {
    NewPolicy {
        name: "Annual leave".into(),
        leave_type: "ANNUAL".into(),
        grant_method: GrantMethod::Recurring,
        grant_amount: Some(amount),
        minute_grant: false,
        repetition: Some(RepetitionRule {
            unit: RepeatUnit::Yearly,
            interval: 1,
            fixed_month: Some(1),
            fixed_day: Some(1),
            first_fire_at: at(date(2025, 1, 1), 0),
            forever: true,
            max_count: None,
        }),
        effective_rule: EffectiveRule::Immediate,
        expiration_rule: ExpirationRule::EndOfYear,
        approver_count: 0,
        deletable: true,
    }
}

pub fn on_request_policy(approver_count: u32) -> NewPolicy {
    NewPolicy {
        name: "Compensatory leave".into(),
        leave_type: "COMP".into(),
        grant_method: GrantMethod::OnRequest,
        grant_amount: None,
        minute_grant: false,
        repetition: None,
        effective_rule: EffectiveRule::Immediate,
        expiration_rule: ExpirationRule::Months(3),
        approver_count,
        deletable: true,
    }
}

pub async fn manual_grant(
    engine: &TestEngine,
    user_id: u64,
    policy_id: u64,
    amount: Decimal,
    expiry_date: NaiveDate,
    now: NaiveDateTime,
) -> Grant {
    engine
        .manual_grant_vacation(
            ManualGrant {
                user_id,
                policy_id,
                amount: Some(amount),
                grant_date: Some(now.date()),
                expiry_date: Some(expiry_date),
                description: String::new(),
            },
            now,
        )
        .await
        .unwrap()
}
