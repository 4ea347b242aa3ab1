//! Persistence seam of the engine.
//!
//! Every engine operation opens one transaction, does all of its reads and
//! writes through it and commits once. Dropping a transaction without
//! committing discards everything it wrote. Methods documented as locking
//! hold the touched rows until commit so concurrent allocations, approvals
//! and sweeps serialise on them. The `read_*` variants never lock and back
//! the read-only projections.
//!
//! Writers that need both a grant and its approvals lock the grant first.

#[cfg(test)]
pub mod memory;
pub mod mysql;
mod rows;

use chrono::NaiveDate;

use crate::error::VacationError;
use crate::model::approval::Approval;
use crate::model::grant::Grant;
use crate::model::plan::{GrantSchedule, Plan, PlanPolicy, UserPlan};
use crate::model::policy::Policy;
use crate::model::usage::{Deduction, Usage};

pub type RepoResult<T> = Result<T, VacationError>;

#[allow(async_fn_in_trait)]
pub trait VacationStore {
    type Tx: VacationTx;

    async fn begin(&self) -> RepoResult<Self::Tx>;
}

#[allow(async_fn_in_trait)]
pub trait VacationTx {
    async fn commit(self) -> RepoResult<()>;

    // policies
    async fn insert_policy(&mut self, policy: &Policy) -> RepoResult<u64>;
    async fn get_policy(&mut self, id: u64) -> RepoResult<Option<Policy>>;
    async fn list_policies(&mut self) -> RepoResult<Vec<Policy>>;
    async fn mark_policy_deleted(&mut self, id: u64) -> RepoResult<()>;

    // plans
    async fn insert_plan(&mut self, plan: &Plan) -> RepoResult<u64>;
    async fn get_plan(&mut self, id: u64) -> RepoResult<Option<Plan>>;
    /// active plans only
    async fn find_plan_by_code(&mut self, code: &str) -> RepoResult<Option<Plan>>;
    /// active plans only
    async fn list_plans(&mut self) -> RepoResult<Vec<Plan>>;
    async fn update_plan(&mut self, plan: &Plan) -> RepoResult<()>;
    /// active memberships ordered by position
    async fn plan_policies(&mut self, plan_id: u64) -> RepoResult<Vec<PlanPolicy>>;
    async fn insert_plan_policy(&mut self, plan_id: u64, policy_id: u64, position: u32) -> RepoResult<u64>;
    async fn mark_plan_policy_deleted(&mut self, id: u64) -> RepoResult<()>;

    // user plans
    /// active assignment of `plan_id` to `user_id`, locked
    async fn find_user_plan(&mut self, user_id: u64, plan_id: u64) -> RepoResult<Option<UserPlan>>;
    /// active assignments of the user
    async fn user_plans(&mut self, user_id: u64) -> RepoResult<Vec<UserPlan>>;
    async fn insert_user_plan(&mut self, user_plan: &UserPlan) -> RepoResult<u64>;
    async fn mark_user_plan_deleted(&mut self, id: u64) -> RepoResult<()>;

    // grant schedules
    /// active schedule of (user, policy), locked
    async fn find_schedule(&mut self, user_id: u64, policy_id: u64) -> RepoResult<Option<GrantSchedule>>;
    async fn active_schedules(&mut self) -> RepoResult<Vec<GrantSchedule>>;
    async fn insert_schedule(&mut self, schedule: &GrantSchedule) -> RepoResult<u64>;
    async fn mark_schedule_deleted(&mut self, id: u64) -> RepoResult<()>;

    // grants
    async fn insert_grant(&mut self, grant: &Grant) -> RepoResult<u64>;
    /// locked
    async fn get_grant(&mut self, id: u64) -> RepoResult<Option<Grant>>;
    async fn read_grant(&mut self, id: u64) -> RepoResult<Option<Grant>>;
    async fn update_grant(&mut self, grant: &Grant) -> RepoResult<()>;
    async fn grants_for_user(&mut self, user_id: u64) -> RepoResult<Vec<Grant>>;
    /// ACTIVE grants of the leave type valid on `day`, locked, in FIFO order
    async fn usable_grants(&mut self, user_id: u64, leave_type: &str, day: NaiveDate) -> RepoResult<Vec<Grant>>;
    /// ACTIVE grants issued under the policy, locked
    async fn active_grants_for_policy(&mut self, policy_id: u64) -> RepoResult<Vec<Grant>>;
    /// fire dates already materialised for (user, policy)
    async fn fire_dates(&mut self, user_id: u64, policy_id: u64) -> RepoResult<Vec<NaiveDate>>;
    /// ACTIVE grants whose expiry is before `today`, locked
    async fn lapsed_grants(&mut self, today: NaiveDate) -> RepoResult<Vec<Grant>>;

    // usages
    async fn insert_usage(&mut self, usage: &Usage) -> RepoResult<u64>;
    /// locked
    async fn get_usage(&mut self, id: u64) -> RepoResult<Option<Usage>>;
    async fn read_usage(&mut self, id: u64) -> RepoResult<Option<Usage>>;
    async fn mark_usage_deleted(&mut self, id: u64) -> RepoResult<()>;
    /// active usages of the user, newest first
    async fn usages_for_user(&mut self, user_id: u64) -> RepoResult<Vec<Usage>>;

    // deductions
    async fn insert_deduction(&mut self, deduction: &Deduction) -> RepoResult<u64>;
    async fn deductions_for_usage(&mut self, usage_id: u64) -> RepoResult<Vec<Deduction>>;
    /// deductions whose usage is still active
    async fn deductions_for_grant(&mut self, grant_id: u64) -> RepoResult<Vec<Deduction>>;

    // approvals
    async fn insert_approval(&mut self, approval: &Approval) -> RepoResult<u64>;
    async fn read_approval(&mut self, id: u64) -> RepoResult<Option<Approval>>;
    async fn update_approval(&mut self, approval: &Approval) -> RepoResult<()>;
    /// ordered by sequence, locked
    async fn approvals_for_grant(&mut self, grant_id: u64) -> RepoResult<Vec<Approval>>;
    /// ordered by sequence
    async fn read_approvals_for_grant(&mut self, grant_id: u64) -> RepoResult<Vec<Approval>>;
    /// PENDING approvals assigned to the approver
    async fn pending_approvals_for(&mut self, approver_id: u64) -> RepoResult<Vec<Approval>>;
}
