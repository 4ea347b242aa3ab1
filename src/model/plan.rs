use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Plan {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "STD-2026")]
    pub code: String,
    #[schema(example = "Standard employee plan")]
    pub name: String,
    pub description: String,
    pub deleted: bool,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: NaiveDateTime,
}

/// Membership of a policy in a plan. Soft-deleted rows keep the history of
/// what a plan contained.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PlanPolicy {
    pub id: u64,
    pub plan_id: u64,
    pub policy_id: u64,
    pub position: u32,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct UserPlan {
    pub id: u64,
    pub user_id: u64,
    pub plan_id: u64,
    pub deleted: bool,
    #[schema(format = "date-time", value_type = String)]
    pub assigned_at: NaiveDateTime,
}

/// "This user is owed future recurring grants of this policy."
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GrantSchedule {
    pub id: u64,
    pub user_id: u64,
    pub policy_id: u64,
    #[schema(format = "date", value_type = String)]
    pub starts_on: NaiveDate,
    pub deleted: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewPlan {
    #[schema(example = "STD-2026")]
    pub code: String,
    #[schema(example = "Standard employee plan")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// policies to attach right away, in order
    #[serde(default)]
    pub policy_ids: Vec<u64>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdatePlan {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A plan together with its active policy memberships.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlanDetail {
    pub plan: Plan,
    pub policies: Vec<PlanPolicy>,
}
