//! Date and amount rules of a policy, resolved per grant method.

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::error::VacationError;
use crate::model::policy::{
    EffectiveRule, ExpirationRule, GrantMethod, NewPolicy, Policy, RepeatUnit, RepetitionRule,
};

/// Expiry used for grants that never lapse.
pub fn never_expires() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX)
}

impl EffectiveRule {
    pub fn grant_date(self, now: NaiveDateTime) -> NaiveDate {
        let today = now.date();
        match self {
            EffectiveRule::Immediate => today,
            EffectiveRule::NextDay => today.succ_opt().unwrap_or(today),
            EffectiveRule::FirstOfNextMonth => today
                .with_day(1)
                .and_then(|d| d.checked_add_months(Months::new(1)))
                .unwrap_or(today),
            EffectiveRule::FirstOfNextYear => {
                NaiveDate::from_ymd_opt(today.year() + 1, 1, 1).unwrap_or(today)
            }
        }
    }
}

impl ExpirationRule {
    /// Last valid day (inclusive) of a grant issued on `grant_date`.
    pub fn expiry_date(self, grant_date: NaiveDate) -> NaiveDate {
        let end = match self {
            ExpirationRule::Days(n) => grant_date.checked_add_days(Days::new(u64::from(n))),
            ExpirationRule::Months(n) => grant_date.checked_add_months(Months::new(n)),
            ExpirationRule::Years(n) => {
                grant_date.checked_add_months(Months::new(n.saturating_mul(12)))
            }
            ExpirationRule::EndOfYear => {
                return NaiveDate::from_ymd_opt(grant_date.year(), 12, 31).unwrap_or(grant_date);
            }
            ExpirationRule::Never => return never_expires(),
        };
        end.and_then(|d| d.pred_opt()).unwrap_or_else(never_expires)
    }
}

/// Grant-method specific behaviour of a policy.
#[derive(Debug, Clone, Copy)]
pub enum GrantStrategy<'a> {
    Manual(&'a Policy),
    Recurring(&'a Policy, &'a RepetitionRule),
    OnRequest(&'a Policy),
}

impl Policy {
    pub fn strategy(&self) -> Result<GrantStrategy<'_>, VacationError> {
        match (self.grant_method, &self.repetition) {
            (GrantMethod::Manual, None) => Ok(GrantStrategy::Manual(self)),
            (GrantMethod::OnRequest, None) => Ok(GrantStrategy::OnRequest(self)),
            (GrantMethod::Recurring, Some(rule)) => Ok(GrantStrategy::Recurring(self, rule)),
            _ => Err(VacationError::invariant(format!(
                "policy {} has a recurrence spec inconsistent with its grant method",
                self.id
            ))),
        }
    }
}

impl<'a> GrantStrategy<'a> {
    pub fn policy(&self) -> &'a Policy {
        match *self {
            GrantStrategy::Manual(p) | GrantStrategy::OnRequest(p) => p,
            GrantStrategy::Recurring(p, _) => p,
        }
    }

    /// Amount a new grant is issued with.
    ///
    /// Manual grants fall back to `supplied` when the policy has no fixed
    /// amount. On-request grants without a fixed amount are worth the number
    /// of calendar days in the requested window.
    pub fn amount(
        &self,
        supplied: Option<Decimal>,
        window: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Decimal, VacationError> {
        let amount = match *self {
            GrantStrategy::Manual(p) => p.grant_amount.or(supplied).ok_or_else(|| {
                VacationError::validation("amount is required for a variable manual grant")
            })?,
            GrantStrategy::Recurring(p, _) => p.grant_amount.ok_or_else(|| {
                VacationError::invariant(format!("recurring policy {} has no grant amount", p.id))
            })?,
            GrantStrategy::OnRequest(p) => match (p.grant_amount, window) {
                (Some(fixed), _) => fixed,
                (None, Some((from, to))) => Decimal::from((to - from).num_days() + 1),
                (None, None) => {
                    return Err(VacationError::validation("requested window is required"));
                }
            },
        };

        if amount <= Decimal::ZERO {
            return Err(VacationError::validation("grant amount must be greater than zero"));
        }
        Ok(amount)
    }

    /// Validity window of a grant issued at `now`.
    pub fn window_at(&self, now: NaiveDateTime) -> (NaiveDate, NaiveDate) {
        let policy = self.policy();
        let grant_date = policy.effective_rule.grant_date(now);
        (grant_date, policy.expiration_rule.expiry_date(grant_date))
    }

    /// Validity window of a grant materialised for a recurrence fire date.
    pub fn window_from(&self, grant_date: NaiveDate) -> (NaiveDate, NaiveDate) {
        (grant_date, self.policy().expiration_rule.expiry_date(grant_date))
    }
}

pub fn validate_new_policy(policy: &NewPolicy) -> Result<(), VacationError> {
    if policy.name.trim().is_empty() {
        return Err(VacationError::validation("name is required"));
    }
    if policy.leave_type.trim().is_empty() {
        return Err(VacationError::validation("leave_type is required"));
    }
    if policy.grant_amount.is_some_and(|a| a <= Decimal::ZERO) {
        return Err(VacationError::validation("grant_amount must be greater than zero"));
    }
    if policy.expiration_rule.length() == Some(0) {
        return Err(VacationError::validation("expiration length must be at least 1"));
    }

    match (policy.grant_method, &policy.repetition) {
        (GrantMethod::Manual | GrantMethod::OnRequest, Some(_)) => Err(VacationError::validation(
            "only recurring policies carry a recurrence spec",
        )),
        (GrantMethod::Recurring, None) => Err(VacationError::validation(
            "recurring policies require a recurrence spec",
        )),
        (GrantMethod::Recurring, Some(rule)) => {
            if policy.grant_amount.is_none() {
                return Err(VacationError::validation(
                    "recurring policies require a grant_amount",
                ));
            }
            validate_repetition(rule)
        }
        _ => Ok(()),
    }
}

fn validate_repetition(rule: &RepetitionRule) -> Result<(), VacationError> {
    if rule.interval == 0 {
        return Err(VacationError::validation("interval must be at least 1"));
    }
    if let Some(month) = rule.fixed_month {
        if rule.unit != RepeatUnit::Yearly {
            return Err(VacationError::validation("fixed_month is only valid for YEARLY"));
        }
        if !(1..=12).contains(&month) {
            return Err(VacationError::validation("fixed_month must be between 1 and 12"));
        }
    }
    if rule.fixed_day.is_some_and(|d| !(1..=31).contains(&d)) {
        return Err(VacationError::validation("fixed_day must be between 1 and 31"));
    }
    if !rule.forever && rule.max_count.unwrap_or(0) == 0 {
        return Err(VacationError::validation(
            "max_count must be at least 1 when the policy does not repeat forever",
        ));
    }
    Ok(())
}
