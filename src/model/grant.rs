use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GrantStatus {
    Pending,
    Progress,
    Active,
    Rejected,
    Canceled,
    Expired,
    Revoked,
}

impl GrantStatus {
    /// Still waiting on the approval chain.
    pub fn is_undecided(self) -> bool {
        matches!(self, GrantStatus::Pending | GrantStatus::Progress)
    }
}

/// A balance of leave time issued to a user.
///
/// `remaining` is only ever touched by the ledger (allocate, restore,
/// revoke) and always satisfies `0 <= remaining <= grant_amount`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Grant {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub user_id: u64,
    #[schema(example = 1)]
    pub policy_id: u64,
    #[schema(example = "ANNUAL")]
    pub leave_type: String,
    pub description: String,
    #[schema(example = "15.0", value_type = String)]
    pub grant_amount: Decimal,
    #[schema(example = "11.5", value_type = String)]
    pub remaining: Decimal,
    /// unset until an on-request grant is approved
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub grant_date: Option<NaiveDate>,
    #[schema(example = "2026-12-31", format = "date", value_type = Option<String>)]
    pub expiry_date: Option<NaiveDate>,
    pub status: GrantStatus,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub request_start: Option<NaiveDateTime>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub request_end: Option<NaiveDateTime>,
    pub reason: Option<String>,
    /// recurrence fire date this grant was materialised for
    #[schema(format = "date", value_type = Option<String>)]
    pub fire_date: Option<NaiveDate>,
    #[schema(example = "2026-01-01T00:00:00", format = "date-time", value_type = String)]
    pub created_at: NaiveDateTime,
}

impl Grant {
    pub fn used(&self) -> Decimal {
        self.grant_amount - self.remaining
    }

    pub fn is_untouched(&self) -> bool {
        self.remaining == self.grant_amount
    }

    /// True when `day` lies inside the inclusive validity window.
    pub fn covers(&self, day: NaiveDate) -> bool {
        match (self.grant_date, self.expiry_date) {
            (Some(from), Some(until)) => from <= day && day <= until,
            _ => false,
        }
    }
}

/// Body of `POST /grants`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ManualGrant {
    #[schema(example = 1000)]
    pub user_id: u64,
    #[schema(example = 2)]
    pub policy_id: u64,
    /// required when the policy has no fixed amount
    #[schema(example = "2.5", value_type = Option<String>)]
    pub amount: Option<Decimal>,
    #[schema(example = "2026-03-01", format = "date", value_type = Option<String>)]
    pub grant_date: Option<NaiveDate>,
    #[schema(example = "2026-12-31", format = "date", value_type = Option<String>)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
}
