use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// One step of the approval chain of an on-request grant.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Approval {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1)]
    pub grant_id: u64,
    #[schema(example = 2000)]
    pub approver_id: u64,
    /// 1-based, lower decides first
    #[schema(example = 1)]
    pub seq: u32,
    pub status: ApprovalStatus,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub decided_at: Option<NaiveDateTime>,
    pub reject_reason: Option<String>,
}

/// Body of `POST /vacation-requests`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VacationRequest {
    #[schema(example = 1000)]
    pub user_id: u64,
    #[schema(example = 3)]
    pub policy_id: u64,
    #[schema(example = "2026-05-04T00:00:00", format = "date-time", value_type = String)]
    pub start_at: NaiveDateTime,
    #[schema(example = "2026-05-08T00:00:00", format = "date-time", value_type = String)]
    pub end_at: NaiveDateTime,
    #[schema(example = "Worked the release weekend")]
    pub reason: String,
    #[serde(default)]
    pub approver_ids: Vec<u64>,
}
