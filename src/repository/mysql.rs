use chrono::NaiveDate;
use sqlx::{MySql, MySqlPool, Transaction};

use super::rows::{
    convert_all, ApprovalRow, DeductionRow, GrantRow, PlanPolicyRow, PlanRow, PolicyRow,
    ScheduleRow, UsageRow, UserPlanRow, APPROVAL_COLUMNS, GRANT_COLUMNS, PLAN_COLUMNS,
    POLICY_COLUMNS, USAGE_COLUMNS,
};
use super::{RepoResult, VacationStore, VacationTx};
use crate::model::approval::Approval;
use crate::model::grant::Grant;
use crate::model::plan::{GrantSchedule, Plan, PlanPolicy, UserPlan};
use crate::model::policy::Policy;
use crate::model::usage::{Deduction, Usage};

const PLAN_POLICY_COLUMNS: &str = "id, plan_id, policy_id, position, deleted";
const USER_PLAN_COLUMNS: &str = "id, user_id, plan_id, deleted, assigned_at";
const SCHEDULE_COLUMNS: &str = "id, user_id, policy_id, starts_on, deleted";
const DEDUCTION_COLUMNS: &str = "d.id, d.usage_id, d.grant_id, d.amount, d.created_at";
const FOR_UPDATE: &str = " FOR UPDATE";

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

pub struct MySqlTx {
    tx: Transaction<'static, MySql>,
}

impl VacationStore for MySqlStore {
    type Tx = MySqlTx;

    async fn begin(&self) -> RepoResult<MySqlTx> {
        Ok(MySqlTx {
            tx: self.pool.begin().await?,
        })
    }
}

impl MySqlTx {
    async fn grants_where(&mut self, clause: &str, binds: GrantFilter<'_>) -> RepoResult<Vec<Grant>> {
        let sql = format!("SELECT {GRANT_COLUMNS} FROM vacation_grants WHERE {clause}");
        let query = sqlx::query_as::<_, GrantRow>(&sql);
        let query = match binds {
            GrantFilter::User(user_id) => query.bind(user_id),
            GrantFilter::Policy(policy_id) => query.bind(policy_id),
            GrantFilter::Usable(user_id, leave_type, day) => {
                query.bind(user_id).bind(leave_type).bind(day).bind(day)
            }
            GrantFilter::Lapsed(today) => query.bind(today),
        };
        let rows = query.fetch_all(&mut *self.tx).await?;
        convert_all(rows)
    }

    async fn grant_by_id(&mut self, id: u64, lock: &str) -> RepoResult<Option<Grant>> {
        let sql = format!("SELECT {GRANT_COLUMNS} FROM vacation_grants WHERE id = ?{lock}");
        let row = sqlx::query_as::<_, GrantRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(Grant::try_from).transpose()
    }

    async fn usage_by_id(&mut self, id: u64, lock: &str) -> RepoResult<Option<Usage>> {
        let sql = format!("SELECT {USAGE_COLUMNS} FROM vacation_usages WHERE id = ?{lock}");
        let row = sqlx::query_as::<_, UsageRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(Usage::try_from).transpose()
    }

    async fn approvals_by_grant(&mut self, grant_id: u64, lock: &str) -> RepoResult<Vec<Approval>> {
        let sql = format!(
            "SELECT {APPROVAL_COLUMNS} FROM vacation_approvals WHERE grant_id = ? ORDER BY seq{lock}"
        );
        let rows = sqlx::query_as::<_, ApprovalRow>(&sql)
            .bind(grant_id)
            .fetch_all(&mut *self.tx)
            .await?;
        convert_all(rows)
    }

    async fn set_deleted(&mut self, table: &str, id: u64) -> RepoResult<()> {
        let sql = format!("UPDATE {table} SET deleted = TRUE WHERE id = ?");
        sqlx::query(&sql).bind(id).execute(&mut *self.tx).await?;
        Ok(())
    }
}

enum GrantFilter<'a> {
    User(u64),
    Policy(u64),
    Usable(u64, &'a str, NaiveDate),
    Lapsed(NaiveDate),
}

impl VacationTx for MySqlTx {
    async fn commit(self) -> RepoResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn insert_policy(&mut self, policy: &Policy) -> RepoResult<u64> {
        let rep = policy.repetition.as_ref();
        let result = sqlx::query(
            "INSERT INTO vacation_policies (name, leave_type, grant_method, grant_amount, \
             minute_grant, repeat_unit, repeat_interval, fixed_month, fixed_day, first_fire_at, \
             repeat_forever, max_count, effective_rule, expiration_kind, expiration_length, \
             approver_count, deletable, deleted, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&policy.name)
        .bind(&policy.leave_type)
        .bind(policy.grant_method.as_ref())
        .bind(policy.grant_amount)
        .bind(policy.minute_grant)
        .bind(rep.map(|r| r.unit.as_ref()))
        .bind(rep.map(|r| r.interval))
        .bind(rep.and_then(|r| r.fixed_month))
        .bind(rep.and_then(|r| r.fixed_day))
        .bind(rep.map(|r| r.first_fire_at))
        .bind(rep.map(|r| r.forever))
        .bind(rep.and_then(|r| r.max_count))
        .bind(policy.effective_rule.as_ref())
        .bind(policy.expiration_rule.kind())
        .bind(policy.expiration_rule.length())
        .bind(policy.approver_count)
        .bind(policy.deletable)
        .bind(policy.deleted)
        .bind(policy.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn get_policy(&mut self, id: u64) -> RepoResult<Option<Policy>> {
        let sql = format!("SELECT {POLICY_COLUMNS} FROM vacation_policies WHERE id = ? FOR UPDATE");
        let row = sqlx::query_as::<_, PolicyRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(Policy::try_from).transpose()
    }

    async fn list_policies(&mut self) -> RepoResult<Vec<Policy>> {
        let sql = format!("SELECT {POLICY_COLUMNS} FROM vacation_policies ORDER BY id");
        let rows = sqlx::query_as::<_, PolicyRow>(&sql)
            .fetch_all(&mut *self.tx)
            .await?;
        convert_all(rows)
    }

    async fn mark_policy_deleted(&mut self, id: u64) -> RepoResult<()> {
        self.set_deleted("vacation_policies", id).await
    }

    async fn insert_plan(&mut self, plan: &Plan) -> RepoResult<u64> {
        let result = sqlx::query(
            "INSERT INTO vacation_plans (code, name, description, deleted, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&plan.code)
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(plan.deleted)
        .bind(plan.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn get_plan(&mut self, id: u64) -> RepoResult<Option<Plan>> {
        let sql = format!("SELECT {PLAN_COLUMNS} FROM vacation_plans WHERE id = ? FOR UPDATE");
        let row = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(Plan::from))
    }

    async fn find_plan_by_code(&mut self, code: &str) -> RepoResult<Option<Plan>> {
        let sql = format!(
            "SELECT {PLAN_COLUMNS} FROM vacation_plans WHERE code = ? AND deleted = FALSE FOR UPDATE"
        );
        let row = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(code)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(Plan::from))
    }

    async fn list_plans(&mut self) -> RepoResult<Vec<Plan>> {
        let sql = format!("SELECT {PLAN_COLUMNS} FROM vacation_plans WHERE deleted = FALSE ORDER BY id");
        let rows = sqlx::query_as::<_, PlanRow>(&sql)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows.into_iter().map(Plan::from).collect())
    }

    async fn update_plan(&mut self, plan: &Plan) -> RepoResult<()> {
        sqlx::query("UPDATE vacation_plans SET name = ?, description = ?, deleted = ? WHERE id = ?")
            .bind(&plan.name)
            .bind(&plan.description)
            .bind(plan.deleted)
            .bind(plan.id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn plan_policies(&mut self, plan_id: u64) -> RepoResult<Vec<PlanPolicy>> {
        let sql = format!(
            "SELECT {PLAN_POLICY_COLUMNS} FROM vacation_plan_policies \
             WHERE plan_id = ? AND deleted = FALSE ORDER BY position, id FOR UPDATE"
        );
        let rows = sqlx::query_as::<_, PlanPolicyRow>(&sql)
            .bind(plan_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows.into_iter().map(PlanPolicy::from).collect())
    }

    async fn insert_plan_policy(&mut self, plan_id: u64, policy_id: u64, position: u32) -> RepoResult<u64> {
        let result = sqlx::query(
            "INSERT INTO vacation_plan_policies (plan_id, policy_id, position, deleted) \
             VALUES (?, ?, ?, FALSE)",
        )
        .bind(plan_id)
        .bind(policy_id)
        .bind(position)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn mark_plan_policy_deleted(&mut self, id: u64) -> RepoResult<()> {
        self.set_deleted("vacation_plan_policies", id).await
    }

    async fn find_user_plan(&mut self, user_id: u64, plan_id: u64) -> RepoResult<Option<UserPlan>> {
        let sql = format!(
            "SELECT {USER_PLAN_COLUMNS} FROM user_vacation_plans \
             WHERE user_id = ? AND plan_id = ? AND deleted = FALSE FOR UPDATE"
        );
        let row = sqlx::query_as::<_, UserPlanRow>(&sql)
            .bind(user_id)
            .bind(plan_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(UserPlan::from))
    }

    async fn user_plans(&mut self, user_id: u64) -> RepoResult<Vec<UserPlan>> {
        let sql = format!(
            "SELECT {USER_PLAN_COLUMNS} FROM user_vacation_plans \
             WHERE user_id = ? AND deleted = FALSE ORDER BY id"
        );
        let rows = sqlx::query_as::<_, UserPlanRow>(&sql)
            .bind(user_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows.into_iter().map(UserPlan::from).collect())
    }

    async fn insert_user_plan(&mut self, user_plan: &UserPlan) -> RepoResult<u64> {
        let result = sqlx::query(
            "INSERT INTO user_vacation_plans (user_id, plan_id, deleted, assigned_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(user_plan.user_id)
        .bind(user_plan.plan_id)
        .bind(user_plan.deleted)
        .bind(user_plan.assigned_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn mark_user_plan_deleted(&mut self, id: u64) -> RepoResult<()> {
        self.set_deleted("user_vacation_plans", id).await
    }

    async fn find_schedule(&mut self, user_id: u64, policy_id: u64) -> RepoResult<Option<GrantSchedule>> {
        let sql = format!(
            "SELECT {SCHEDULE_COLUMNS} FROM vacation_grant_schedules \
             WHERE user_id = ? AND policy_id = ? AND deleted = FALSE FOR UPDATE"
        );
        let row = sqlx::query_as::<_, ScheduleRow>(&sql)
            .bind(user_id)
            .bind(policy_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(GrantSchedule::from))
    }

    async fn active_schedules(&mut self) -> RepoResult<Vec<GrantSchedule>> {
        let sql = format!(
            "SELECT {SCHEDULE_COLUMNS} FROM vacation_grant_schedules WHERE deleted = FALSE ORDER BY id"
        );
        let rows = sqlx::query_as::<_, ScheduleRow>(&sql)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows.into_iter().map(GrantSchedule::from).collect())
    }

    async fn insert_schedule(&mut self, schedule: &GrantSchedule) -> RepoResult<u64> {
        let result = sqlx::query(
            "INSERT INTO vacation_grant_schedules (user_id, policy_id, starts_on, deleted) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(schedule.user_id)
        .bind(schedule.policy_id)
        .bind(schedule.starts_on)
        .bind(schedule.deleted)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn mark_schedule_deleted(&mut self, id: u64) -> RepoResult<()> {
        self.set_deleted("vacation_grant_schedules", id).await
    }

    async fn insert_grant(&mut self, grant: &Grant) -> RepoResult<u64> {
        let result = sqlx::query(
            "INSERT INTO vacation_grants (user_id, policy_id, leave_type, description, \
             grant_amount, remaining, grant_date, expiry_date, status, request_start, \
             request_end, reason, fire_date, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(grant.user_id)
        .bind(grant.policy_id)
        .bind(&grant.leave_type)
        .bind(&grant.description)
        .bind(grant.grant_amount)
        .bind(grant.remaining)
        .bind(grant.grant_date)
        .bind(grant.expiry_date)
        .bind(grant.status.as_ref())
        .bind(grant.request_start)
        .bind(grant.request_end)
        .bind(&grant.reason)
        .bind(grant.fire_date)
        .bind(grant.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn get_grant(&mut self, id: u64) -> RepoResult<Option<Grant>> {
        self.grant_by_id(id, FOR_UPDATE).await
    }

    async fn read_grant(&mut self, id: u64) -> RepoResult<Option<Grant>> {
        self.grant_by_id(id, "").await
    }

    async fn update_grant(&mut self, grant: &Grant) -> RepoResult<()> {
        sqlx::query(
            "UPDATE vacation_grants SET grant_amount = ?, remaining = ?, grant_date = ?, \
             expiry_date = ?, status = ? WHERE id = ?",
        )
        .bind(grant.grant_amount)
        .bind(grant.remaining)
        .bind(grant.grant_date)
        .bind(grant.expiry_date)
        .bind(grant.status.as_ref())
        .bind(grant.id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn grants_for_user(&mut self, user_id: u64) -> RepoResult<Vec<Grant>> {
        self.grants_where("user_id = ? ORDER BY id", GrantFilter::User(user_id))
            .await
    }

    async fn usable_grants(&mut self, user_id: u64, leave_type: &str, day: NaiveDate) -> RepoResult<Vec<Grant>> {
        self.grants_where(
            "user_id = ? AND leave_type = ? AND status = 'ACTIVE' \
             AND grant_date <= ? AND expiry_date >= ? \
             ORDER BY expiry_date, grant_date, id FOR UPDATE",
            GrantFilter::Usable(user_id, leave_type, day),
        )
        .await
    }

    async fn active_grants_for_policy(&mut self, policy_id: u64) -> RepoResult<Vec<Grant>> {
        self.grants_where(
            "policy_id = ? AND status = 'ACTIVE' ORDER BY id FOR UPDATE",
            GrantFilter::Policy(policy_id),
        )
        .await
    }

    async fn fire_dates(&mut self, user_id: u64, policy_id: u64) -> RepoResult<Vec<NaiveDate>> {
        let dates: Vec<(NaiveDate,)> = sqlx::query_as(
            "SELECT fire_date FROM vacation_grants \
             WHERE user_id = ? AND policy_id = ? AND fire_date IS NOT NULL",
        )
        .bind(user_id)
        .bind(policy_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(dates.into_iter().map(|(d,)| d).collect())
    }

    async fn lapsed_grants(&mut self, today: NaiveDate) -> RepoResult<Vec<Grant>> {
        self.grants_where(
            "status = 'ACTIVE' AND expiry_date < ? ORDER BY id FOR UPDATE",
            GrantFilter::Lapsed(today),
        )
        .await
    }

    async fn insert_usage(&mut self, usage: &Usage) -> RepoResult<u64> {
        let result = sqlx::query(
            "INSERT INTO vacation_usages (user_id, leave_type, description, unit, start_at, \
             end_at, used_amount, deleted, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(usage.user_id)
        .bind(&usage.leave_type)
        .bind(&usage.description)
        .bind(usage.unit.as_ref())
        .bind(usage.start_at)
        .bind(usage.end_at)
        .bind(usage.used_amount)
        .bind(usage.deleted)
        .bind(usage.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn get_usage(&mut self, id: u64) -> RepoResult<Option<Usage>> {
        self.usage_by_id(id, FOR_UPDATE).await
    }

    async fn read_usage(&mut self, id: u64) -> RepoResult<Option<Usage>> {
        self.usage_by_id(id, "").await
    }

    async fn mark_usage_deleted(&mut self, id: u64) -> RepoResult<()> {
        self.set_deleted("vacation_usages", id).await
    }

    async fn usages_for_user(&mut self, user_id: u64) -> RepoResult<Vec<Usage>> {
        let sql = format!(
            "SELECT {USAGE_COLUMNS} FROM vacation_usages \
             WHERE user_id = ? AND deleted = FALSE ORDER BY start_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, UsageRow>(&sql)
            .bind(user_id)
            .fetch_all(&mut *self.tx)
            .await?;
        convert_all(rows)
    }

    async fn insert_deduction(&mut self, deduction: &Deduction) -> RepoResult<u64> {
        let result = sqlx::query(
            "INSERT INTO vacation_deductions (usage_id, grant_id, amount, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(deduction.usage_id)
        .bind(deduction.grant_id)
        .bind(deduction.amount)
        .bind(deduction.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn deductions_for_usage(&mut self, usage_id: u64) -> RepoResult<Vec<Deduction>> {
        let sql = format!(
            "SELECT {DEDUCTION_COLUMNS} FROM vacation_deductions d WHERE d.usage_id = ? ORDER BY d.id"
        );
        let rows = sqlx::query_as::<_, DeductionRow>(&sql)
            .bind(usage_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows.into_iter().map(Deduction::from).collect())
    }

    async fn deductions_for_grant(&mut self, grant_id: u64) -> RepoResult<Vec<Deduction>> {
        let sql = format!(
            "SELECT {DEDUCTION_COLUMNS} FROM vacation_deductions d \
             JOIN vacation_usages u ON u.id = d.usage_id \
             WHERE d.grant_id = ? AND u.deleted = FALSE ORDER BY d.id"
        );
        let rows = sqlx::query_as::<_, DeductionRow>(&sql)
            .bind(grant_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows.into_iter().map(Deduction::from).collect())
    }

    async fn insert_approval(&mut self, approval: &Approval) -> RepoResult<u64> {
        let result = sqlx::query(
            "INSERT INTO vacation_approvals (grant_id, approver_id, seq, status, decided_at, \
             reject_reason) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(approval.grant_id)
        .bind(approval.approver_id)
        .bind(approval.seq)
        .bind(approval.status.as_ref())
        .bind(approval.decided_at)
        .bind(&approval.reject_reason)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn read_approval(&mut self, id: u64) -> RepoResult<Option<Approval>> {
        let sql = format!("SELECT {APPROVAL_COLUMNS} FROM vacation_approvals WHERE id = ?");
        let row = sqlx::query_as::<_, ApprovalRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(Approval::try_from).transpose()
    }

    async fn update_approval(&mut self, approval: &Approval) -> RepoResult<()> {
        sqlx::query(
            "UPDATE vacation_approvals SET status = ?, decided_at = ?, reject_reason = ? WHERE id = ?",
        )
        .bind(approval.status.as_ref())
        .bind(approval.decided_at)
        .bind(&approval.reject_reason)
        .bind(approval.id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn approvals_for_grant(&mut self, grant_id: u64) -> RepoResult<Vec<Approval>> {
        self.approvals_by_grant(grant_id, FOR_UPDATE).await
    }

    async fn read_approvals_for_grant(&mut self, grant_id: u64) -> RepoResult<Vec<Approval>> {
        self.approvals_by_grant(grant_id, "").await
    }

    async fn pending_approvals_for(&mut self, approver_id: u64) -> RepoResult<Vec<Approval>> {
        let sql = format!(
            "SELECT {APPROVAL_COLUMNS} FROM vacation_approvals \
             WHERE approver_id = ? AND status = 'PENDING' ORDER BY id"
        );
        let rows = sqlx::query_as::<_, ApprovalRow>(&sql)
            .bind(approver_id)
            .fetch_all(&mut *self.tx)
            .await?;
        convert_all(rows)
    }
}
