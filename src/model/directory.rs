use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// What the identity provider tells us about a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: u64,
    pub work_start: NaiveTime,
    pub work_end: NaiveTime,
    pub country_code: String,
}

impl UserProfile {
    pub fn workday_minutes(&self) -> i64 {
        (self.work_end - self.work_start).num_minutes()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum HolidayKind {
    Public,
    Substitute,
    Company,
    Observance,
}

impl HolidayKind {
    /// Kinds that are not charged against a leave balance.
    pub fn is_day_off(self) -> bool {
        matches!(self, HolidayKind::Public | HolidayKind::Substitute)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
    pub kind: HolidayKind,
}

/// A department head above a user, `level` ascending from most local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproverCandidate {
    pub head_user_id: u64,
    pub level: u32,
}
