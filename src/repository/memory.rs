//! Arena-backed store used by the engine tests.
//!
//! A transaction holds the table lock for its whole lifetime and works on a
//! private copy of every table; commit publishes the copy, drop throws it
//! away. Row locks are recorded in the order transactions take them.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{RepoResult, VacationStore, VacationTx};
use crate::error::VacationError;
use crate::model::approval::{Approval, ApprovalStatus};
use crate::model::grant::{Grant, GrantStatus};
use crate::model::plan::{GrantSchedule, Plan, PlanPolicy, UserPlan};
use crate::model::policy::Policy;
use crate::model::usage::{Deduction, Usage};
use crate::vacation::ledger::fifo_cmp;

/// Rows keyed by surrogate id.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    rows: BTreeMap<u64, T>,
    last_id: u64,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<T: Clone> Arena<T> {
    fn insert_with(&mut self, build: impl FnOnce(u64) -> T) -> u64 {
        self.last_id += 1;
        let id = self.last_id;
        self.rows.insert(id, build(id));
        id
    }

    pub fn get(&self, id: u64) -> Option<&T> {
        self.rows.get(&id)
    }

    fn get_mut(&mut self, entity: &'static str, id: u64) -> RepoResult<&mut T> {
        self.rows
            .get_mut(&id)
            .ok_or_else(|| VacationError::not_found(entity, id))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }

    fn find_cloned(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.rows.values().find(|r| pred(r)).cloned()
    }

    fn filter_cloned(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows.values().filter(|r| pred(r)).cloned().collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub policies: Arena<Policy>,
    pub plans: Arena<Plan>,
    pub plan_policies: Arena<PlanPolicy>,
    pub user_plans: Arena<UserPlan>,
    pub schedules: Arena<GrantSchedule>,
    pub grants: Arena<Grant>,
    pub usages: Arena<Usage>,
    pub deductions: Arena<Deduction>,
    pub approvals: Arena<Approval>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLock {
    Grant(u64),
    Usage(u64),
    Approval(u64),
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    locks: Arc<Mutex<Vec<RowLock>>>,
}

impl MemoryStore {
    /// Committed state, for assertions.
    pub async fn snapshot(&self) -> Tables {
        self.tables.lock().await.clone()
    }

    /// Row locks taken since the last call, oldest first.
    pub async fn take_locks(&self) -> Vec<RowLock> {
        std::mem::take(&mut *self.locks.lock().await)
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
    locks: Arc<Mutex<Vec<RowLock>>>,
}

impl MemoryTx {
    async fn record(&self, rows: impl IntoIterator<Item = RowLock>) {
        self.locks.lock().await.extend(rows);
    }
}

impl VacationStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> RepoResult<MemoryTx> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let work = guard.clone();
        Ok(MemoryTx {
            guard,
            work,
            locks: Arc::clone(&self.locks),
        })
    }
}

impl VacationTx for MemoryTx {
    async fn commit(self) -> RepoResult<()> {
        let MemoryTx { mut guard, work, .. } = self;
        *guard = work;
        Ok(())
    }

    async fn insert_policy(&mut self, policy: &Policy) -> RepoResult<u64> {
        Ok(self.work.policies.insert_with(|id| Policy {
            id,
            ..policy.clone()
        }))
    }

    async fn get_policy(&mut self, id: u64) -> RepoResult<Option<Policy>> {
        Ok(self.work.policies.get(id).cloned())
    }

    async fn list_policies(&mut self) -> RepoResult<Vec<Policy>> {
        Ok(self.work.policies.values().cloned().collect())
    }

    async fn mark_policy_deleted(&mut self, id: u64) -> RepoResult<()> {
        self.work.policies.get_mut("policy", id)?.deleted = true;
        Ok(())
    }

    async fn insert_plan(&mut self, plan: &Plan) -> RepoResult<u64> {
        Ok(self.work.plans.insert_with(|id| Plan { id, ..plan.clone() }))
    }

    async fn get_plan(&mut self, id: u64) -> RepoResult<Option<Plan>> {
        Ok(self.work.plans.get(id).cloned())
    }

    async fn find_plan_by_code(&mut self, code: &str) -> RepoResult<Option<Plan>> {
        Ok(self.work.plans.find_cloned(|p| !p.deleted && p.code == code))
    }

    async fn list_plans(&mut self) -> RepoResult<Vec<Plan>> {
        Ok(self.work.plans.filter_cloned(|p| !p.deleted))
    }

    async fn update_plan(&mut self, plan: &Plan) -> RepoResult<()> {
        *self.work.plans.get_mut("plan", plan.id)? = plan.clone();
        Ok(())
    }

    async fn plan_policies(&mut self, plan_id: u64) -> RepoResult<Vec<PlanPolicy>> {
        let mut members = self
            .work
            .plan_policies
            .filter_cloned(|m| !m.deleted && m.plan_id == plan_id);
        members.sort_by_key(|m| (m.position, m.id));
        Ok(members)
    }

    async fn insert_plan_policy(&mut self, plan_id: u64, policy_id: u64, position: u32) -> RepoResult<u64> {
        Ok(self.work.plan_policies.insert_with(|id| PlanPolicy {
            id,
            plan_id,
            policy_id,
            position,
            deleted: false,
        }))
    }

    async fn mark_plan_policy_deleted(&mut self, id: u64) -> RepoResult<()> {
        self.work.plan_policies.get_mut("plan policy", id)?.deleted = true;
        Ok(())
    }

    async fn find_user_plan(&mut self, user_id: u64, plan_id: u64) -> RepoResult<Option<UserPlan>> {
        Ok(self
            .work
            .user_plans
            .find_cloned(|up| !up.deleted && up.user_id == user_id && up.plan_id == plan_id))
    }

    async fn user_plans(&mut self, user_id: u64) -> RepoResult<Vec<UserPlan>> {
        Ok(self
            .work
            .user_plans
            .filter_cloned(|up| !up.deleted && up.user_id == user_id))
    }

    async fn insert_user_plan(&mut self, user_plan: &UserPlan) -> RepoResult<u64> {
        Ok(self.work.user_plans.insert_with(|id| UserPlan {
            id,
            ..user_plan.clone()
        }))
    }

    async fn mark_user_plan_deleted(&mut self, id: u64) -> RepoResult<()> {
        self.work.user_plans.get_mut("user plan", id)?.deleted = true;
        Ok(())
    }

    async fn find_schedule(&mut self, user_id: u64, policy_id: u64) -> RepoResult<Option<GrantSchedule>> {
        Ok(self
            .work
            .schedules
            .find_cloned(|s| !s.deleted && s.user_id == user_id && s.policy_id == policy_id))
    }

    async fn active_schedules(&mut self) -> RepoResult<Vec<GrantSchedule>> {
        Ok(self.work.schedules.filter_cloned(|s| !s.deleted))
    }

    async fn insert_schedule(&mut self, schedule: &GrantSchedule) -> RepoResult<u64> {
        Ok(self.work.schedules.insert_with(|id| GrantSchedule {
            id,
            ..schedule.clone()
        }))
    }

    async fn mark_schedule_deleted(&mut self, id: u64) -> RepoResult<()> {
        self.work.schedules.get_mut("grant schedule", id)?.deleted = true;
        Ok(())
    }

    async fn insert_grant(&mut self, grant: &Grant) -> RepoResult<u64> {
        Ok(self.work.grants.insert_with(|id| Grant {
            id,
            ..grant.clone()
        }))
    }

    async fn get_grant(&mut self, id: u64) -> RepoResult<Option<Grant>> {
        self.record([RowLock::Grant(id)]).await;
        Ok(self.work.grants.get(id).cloned())
    }

    async fn read_grant(&mut self, id: u64) -> RepoResult<Option<Grant>> {
        Ok(self.work.grants.get(id).cloned())
    }

    async fn update_grant(&mut self, grant: &Grant) -> RepoResult<()> {
        *self.work.grants.get_mut("grant", grant.id)? = grant.clone();
        Ok(())
    }

    async fn grants_for_user(&mut self, user_id: u64) -> RepoResult<Vec<Grant>> {
        Ok(self.work.grants.filter_cloned(|g| g.user_id == user_id))
    }

    async fn usable_grants(&mut self, user_id: u64, leave_type: &str, day: NaiveDate) -> RepoResult<Vec<Grant>> {
        let mut grants = self.work.grants.filter_cloned(|g| {
            g.user_id == user_id
                && g.leave_type == leave_type
                && g.status == GrantStatus::Active
                && g.covers(day)
        });
        grants.sort_by(fifo_cmp);
        self.record(grants.iter().map(|g| RowLock::Grant(g.id))).await;
        Ok(grants)
    }

    async fn active_grants_for_policy(&mut self, policy_id: u64) -> RepoResult<Vec<Grant>> {
        let grants = self
            .work
            .grants
            .filter_cloned(|g| g.policy_id == policy_id && g.status == GrantStatus::Active);
        self.record(grants.iter().map(|g| RowLock::Grant(g.id))).await;
        Ok(grants)
    }

    async fn fire_dates(&mut self, user_id: u64, policy_id: u64) -> RepoResult<Vec<NaiveDate>> {
        Ok(self
            .work
            .grants
            .values()
            .filter(|g| g.user_id == user_id && g.policy_id == policy_id)
            .filter_map(|g| g.fire_date)
            .collect())
    }

    async fn lapsed_grants(&mut self, today: NaiveDate) -> RepoResult<Vec<Grant>> {
        let grants = self.work.grants.filter_cloned(|g| {
            g.status == GrantStatus::Active && g.expiry_date.is_some_and(|e| e < today)
        });
        self.record(grants.iter().map(|g| RowLock::Grant(g.id))).await;
        Ok(grants)
    }

    async fn insert_usage(&mut self, usage: &Usage) -> RepoResult<u64> {
        Ok(self.work.usages.insert_with(|id| Usage {
            id,
            ..usage.clone()
        }))
    }

    async fn get_usage(&mut self, id: u64) -> RepoResult<Option<Usage>> {
        self.record([RowLock::Usage(id)]).await;
        Ok(self.work.usages.get(id).cloned())
    }

    async fn read_usage(&mut self, id: u64) -> RepoResult<Option<Usage>> {
        Ok(self.work.usages.get(id).cloned())
    }

    async fn mark_usage_deleted(&mut self, id: u64) -> RepoResult<()> {
        self.work.usages.get_mut("usage", id)?.deleted = true;
        Ok(())
    }

    async fn usages_for_user(&mut self, user_id: u64) -> RepoResult<Vec<Usage>> {
        let mut usages = self
            .work
            .usages
            .filter_cloned(|u| !u.deleted && u.user_id == user_id);
        usages.sort_by(|a, b| b.start_at.cmp(&a.start_at));
        Ok(usages)
    }

    async fn insert_deduction(&mut self, deduction: &Deduction) -> RepoResult<u64> {
        Ok(self.work.deductions.insert_with(|id| Deduction {
            id,
            ..deduction.clone()
        }))
    }

    async fn deductions_for_usage(&mut self, usage_id: u64) -> RepoResult<Vec<Deduction>> {
        Ok(self.work.deductions.filter_cloned(|d| d.usage_id == usage_id))
    }

    async fn deductions_for_grant(&mut self, grant_id: u64) -> RepoResult<Vec<Deduction>> {
        let usages = &self.work.usages;
        Ok(self.work.deductions.filter_cloned(|d| {
            d.grant_id == grant_id && usages.get(d.usage_id).is_some_and(|u| !u.deleted)
        }))
    }

    async fn insert_approval(&mut self, approval: &Approval) -> RepoResult<u64> {
        Ok(self.work.approvals.insert_with(|id| Approval {
            id,
            ..approval.clone()
        }))
    }

    async fn read_approval(&mut self, id: u64) -> RepoResult<Option<Approval>> {
        Ok(self.work.approvals.get(id).cloned())
    }

    async fn update_approval(&mut self, approval: &Approval) -> RepoResult<()> {
        *self.work.approvals.get_mut("approval", approval.id)? = approval.clone();
        Ok(())
    }

    async fn approvals_for_grant(&mut self, grant_id: u64) -> RepoResult<Vec<Approval>> {
        let approvals = self.read_approvals_for_grant(grant_id).await?;
        self.record(approvals.iter().map(|a| RowLock::Approval(a.id))).await;
        Ok(approvals)
    }

    async fn read_approvals_for_grant(&mut self, grant_id: u64) -> RepoResult<Vec<Approval>> {
        let mut approvals = self.work.approvals.filter_cloned(|a| a.grant_id == grant_id);
        approvals.sort_by_key(|a| a.seq);
        Ok(approvals)
    }

    async fn pending_approvals_for(&mut self, approver_id: u64) -> RepoResult<Vec<Approval>> {
        Ok(self.work.approvals.filter_cloned(|a| {
            a.approver_id == approver_id && a.status == ApprovalStatus::Pending
        }))
    }
}
