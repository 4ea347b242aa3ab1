use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// How grants of a policy come into existence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GrantMethod {
    /// issued by an administrator
    Manual,
    /// issued by the scheduler on every fire date
    Recurring,
    /// requested by the user, goes through the approval chain
    OnRequest,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RepeatUnit {
    Daily,
    Monthly,
    Quarterly,
    HalfYearly,
    Yearly,
}

impl RepeatUnit {
    /// Calendar months covered by one step, `None` for day based units.
    pub fn months(self) -> Option<u32> {
        match self {
            RepeatUnit::Daily => None,
            RepeatUnit::Monthly => Some(1),
            RepeatUnit::Quarterly => Some(3),
            RepeatUnit::HalfYearly => Some(6),
            RepeatUnit::Yearly => Some(12),
        }
    }
}

/// Recurrence spec of a RECURRING policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RepetitionRule {
    pub unit: RepeatUnit,
    #[schema(example = 1)]
    pub interval: u32,
    /// only honoured for YEARLY
    #[schema(example = 1, nullable = true)]
    pub fixed_month: Option<u32>,
    #[schema(example = 1, nullable = true)]
    pub fixed_day: Option<u32>,
    #[schema(example = "2025-01-01T00:00:00", format = "date-time", value_type = String)]
    pub first_fire_at: NaiveDateTime,
    pub forever: bool,
    #[schema(nullable = true)]
    pub max_count: Option<u32>,
}

/// Maps "now" to the date a grant becomes valid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EffectiveRule {
    Immediate,
    NextDay,
    FirstOfNextMonth,
    FirstOfNextYear,
}

/// Maps a grant date to its last valid day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "length", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpirationRule {
    Days(u32),
    Months(u32),
    Years(u32),
    EndOfYear,
    Never,
}

impl ExpirationRule {
    pub fn kind(&self) -> &'static str {
        match self {
            ExpirationRule::Days(_) => "DAYS",
            ExpirationRule::Months(_) => "MONTHS",
            ExpirationRule::Years(_) => "YEARS",
            ExpirationRule::EndOfYear => "END_OF_YEAR",
            ExpirationRule::Never => "NEVER",
        }
    }

    pub fn length(&self) -> Option<u32> {
        match *self {
            ExpirationRule::Days(n) | ExpirationRule::Months(n) | ExpirationRule::Years(n) => Some(n),
            ExpirationRule::EndOfYear | ExpirationRule::Never => None,
        }
    }

    pub fn from_parts(kind: &str, length: Option<u32>) -> Option<Self> {
        match (kind, length) {
            ("DAYS", Some(n)) => Some(ExpirationRule::Days(n)),
            ("MONTHS", Some(n)) => Some(ExpirationRule::Months(n)),
            ("YEARS", Some(n)) => Some(ExpirationRule::Years(n)),
            ("END_OF_YEAR", _) => Some(ExpirationRule::EndOfYear),
            ("NEVER", _) => Some(ExpirationRule::Never),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Policy {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Annual leave 15d")]
    pub name: String,
    #[schema(example = "ANNUAL")]
    pub leave_type: String,
    pub grant_method: GrantMethod,
    /// nominal amount in days, `null` for variable manual grants
    #[schema(example = "15.0", value_type = Option<String>)]
    pub grant_amount: Option<Decimal>,
    pub minute_grant: bool,
    pub repetition: Option<RepetitionRule>,
    pub effective_rule: EffectiveRule,
    #[schema(value_type = Object, example = json!({"kind": "YEARS", "length": 1}))]
    pub expiration_rule: ExpirationRule,
    pub approver_count: u32,
    pub deletable: bool,
    pub deleted: bool,
    #[schema(example = "2026-01-01T00:00:00", format = "date-time", value_type = String)]
    pub created_at: NaiveDateTime,
}

impl Policy {
    pub fn is_recurring(&self) -> bool {
        self.grant_method == GrantMethod::Recurring
    }
}

fn default_true() -> bool {
    true
}

/// Body of `POST /policies`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewPolicy {
    #[schema(example = "Annual leave 15d")]
    pub name: String,
    #[schema(example = "ANNUAL")]
    pub leave_type: String,
    pub grant_method: GrantMethod,
    #[schema(example = "15.0", value_type = Option<String>)]
    pub grant_amount: Option<Decimal>,
    #[serde(default)]
    pub minute_grant: bool,
    pub repetition: Option<RepetitionRule>,
    pub effective_rule: EffectiveRule,
    #[schema(value_type = Object, example = json!({"kind": "YEARS", "length": 1}))]
    pub expiration_rule: ExpirationRule,
    #[serde(default)]
    pub approver_count: u32,
    #[serde(default = "default_true")]
    pub deletable: bool,
}

impl NewPolicy {
    pub fn into_policy(self, created_at: NaiveDateTime) -> Policy {
        Policy {
            id: 0,
            name: self.name.trim().to_string(),
            leave_type: self.leave_type.trim().to_string(),
            grant_method: self.grant_method,
            grant_amount: self.grant_amount,
            minute_grant: self.minute_grant,
            repetition: self.repetition,
            effective_rule: self.effective_rule,
            expiration_rule: self.expiration_rule,
            approver_count: self.approver_count,
            deletable: self.deletable,
            deleted: false,
            created_at,
        }
    }
}
