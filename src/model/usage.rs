use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Granularity a usage is booked in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UsageUnit {
    Day,
    HalfDayAm,
    HalfDayPm,
    Hour,
    Minute,
}

impl UsageUnit {
    pub fn is_full_day(self) -> bool {
        self == UsageUnit::Day
    }

    pub fn is_half_day(self) -> bool {
        matches!(self, UsageUnit::HalfDayAm | UsageUnit::HalfDayPm)
    }

    pub fn is_minute(self) -> bool {
        self == UsageUnit::Minute
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Usage {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub user_id: u64,
    #[schema(example = "ANNUAL")]
    pub leave_type: String,
    pub description: String,
    pub unit: UsageUnit,
    #[schema(example = "2026-03-02T09:00:00", format = "date-time", value_type = String)]
    pub start_at: NaiveDateTime,
    #[schema(example = "2026-03-06T18:00:00", format = "date-time", value_type = String)]
    pub end_at: NaiveDateTime,
    #[schema(example = "4.0", value_type = String)]
    pub used_amount: Decimal,
    pub deleted: bool,
    #[schema(example = "2026-01-01T00:00:00", format = "date-time", value_type = String)]
    pub created_at: NaiveDateTime,
}

/// How much of one grant a usage consumed. Never mutated after insert;
/// it stops counting once its usage is soft-deleted.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Deduction {
    pub id: u64,
    pub usage_id: u64,
    pub grant_id: u64,
    #[schema(example = "1.5", value_type = String)]
    pub amount: Decimal,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: NaiveDateTime,
}

/// Body of `POST /usages` and `PUT /usages/{id}`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UseVacation {
    #[schema(example = 1000)]
    pub user_id: u64,
    #[schema(example = "ANNUAL")]
    pub leave_type: String,
    pub unit: UsageUnit,
    #[schema(example = "2026-03-02T09:00:00", format = "date-time", value_type = String)]
    pub start_at: NaiveDateTime,
    #[schema(example = "2026-03-06T18:00:00", format = "date-time", value_type = String)]
    pub end_at: NaiveDateTime,
    #[serde(default)]
    pub description: String,
}
