//! FIFO allocation over grants and the balance mutations that go with it.

use std::cmp::Ordering;

use rust_decimal::Decimal;

use crate::error::{RuleViolation, VacationError};
use crate::model::grant::{Grant, GrantStatus};

/// One planned deduction: take `amount` from grant `grant_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub grant_id: u64,
    pub amount: Decimal,
}

/// Earliest-expiring first, then oldest grant, then lowest id.
pub fn fifo_cmp(a: &Grant, b: &Grant) -> Ordering {
    a.expiry_date
        .cmp(&b.expiry_date)
        .then(a.grant_date.cmp(&b.grant_date))
        .then(a.id.cmp(&b.id))
}

/// Decimal places every ledger amount is carried at, matching the
/// `DECIMAL(10,4)` columns.
pub const AMOUNT_SCALE: u32 = 4;

/// Puts `amount` on the ledger scale so sums and differences stay
/// bit-identical across allocate/restore cycles.
pub fn normalize_amount(amount: Decimal) -> Decimal {
    let mut amount = amount;
    amount.rescale(AMOUNT_SCALE);
    amount
}

pub fn available_balance(grants: &[Grant]) -> Decimal {
    grants.iter().map(|g| g.remaining).sum()
}

/// Plans how `required` is taken from `grants`.
///
/// Nothing is mutated here: either the whole requirement fits and every
/// deduction is returned, or the call fails and the caller commits nothing.
pub fn plan_allocation(grants: &[Grant], required: Decimal) -> Result<Vec<Allocation>, VacationError> {
    if required <= Decimal::ZERO {
        return Err(VacationError::validation("requested range has no chargeable time"));
    }
    if available_balance(grants) < required {
        return Err(RuleViolation::InsufficientBalance.into());
    }

    let mut ordered: Vec<&Grant> = grants.iter().collect();
    ordered.sort_by(|a, b| fifo_cmp(a, b));

    let mut still_needed = required;
    let mut plan = Vec::new();
    for grant in ordered {
        if still_needed.is_zero() {
            break;
        }
        let take = grant.remaining.min(still_needed);
        if take > Decimal::ZERO {
            plan.push(Allocation {
                grant_id: grant.id,
                amount: take,
            });
            still_needed -= take;
        }
    }

    if !still_needed.is_zero() {
        return Err(VacationError::invariant(format!(
            "FIFO walk left {still_needed} unallocated after sufficiency check"
        )));
    }
    Ok(plan)
}

pub fn apply_deduction(grant: &mut Grant, amount: Decimal) -> Result<(), VacationError> {
    if grant.status != GrantStatus::Active {
        return Err(VacationError::invariant(format!(
            "deduction against grant {} in status {}",
            grant.id, grant.status
        )));
    }
    let remaining = grant.remaining - amount;
    if amount <= Decimal::ZERO || remaining < Decimal::ZERO {
        return Err(VacationError::invariant(format!(
            "deducting {amount} from grant {} would leave {remaining}",
            grant.id
        )));
    }
    grant.remaining = remaining;
    Ok(())
}

/// Puts a reversed deduction back onto its grant.
pub fn restore_deduction(grant: &mut Grant, amount: Decimal) -> Result<(), VacationError> {
    let remaining = grant.remaining + amount;
    if remaining > grant.grant_amount {
        return Err(VacationError::invariant(format!(
            "restoring {amount} to grant {} would exceed its amount {}",
            grant.id, grant.grant_amount
        )));
    }
    grant.remaining = remaining;
    Ok(())
}

/// Only an active, completely unused grant may be revoked.
pub fn revoke(grant: &mut Grant) -> Result<(), VacationError> {
    if grant.status != GrantStatus::Active {
        return Err(RuleViolation::GrantNotActive.into());
    }
    if !grant.is_untouched() {
        return Err(RuleViolation::RevokeAfterUse.into());
    }
    grant.status = GrantStatus::Revoked;
    Ok(())
}
