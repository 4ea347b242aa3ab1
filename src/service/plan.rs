use std::collections::HashSet;

use chrono::NaiveDateTime;
use tracing::{info, instrument};

use super::{found, EngineResult, VacationEngine};
use crate::directory::Directory;
use crate::error::{RuleViolation, VacationError};
use crate::model::plan::{GrantSchedule, NewPlan, Plan, PlanDetail, PlanPolicy, UpdatePlan, UserPlan};
use crate::repository::{VacationStore, VacationTx};

/// Active plan by id; deleted plans read as missing.
async fn active_plan<T: VacationTx>(tx: &mut T, plan_id: u64) -> EngineResult<Plan> {
    match tx.get_plan(plan_id).await? {
        Some(plan) if !plan.deleted => Ok(plan),
        _ => Err(VacationError::not_found("plan", plan_id)),
    }
}

async fn active_plan_by_code<T: VacationTx>(tx: &mut T, code: &str) -> EngineResult<Plan> {
    found(tx.find_plan_by_code(code).await?, "plan", code)
}

/// The user's assignment to the plan called `code`. Assignments to a
/// deleted plan still resolve so they can be revoked; an active plan wins
/// when a deleted one shares its code.
async fn assignment_by_code<T: VacationTx>(
    tx: &mut T,
    user_id: u64,
    code: &str,
) -> EngineResult<(Plan, UserPlan)> {
    let mut hit: Option<Plan> = None;
    for assigned in tx.user_plans(user_id).await? {
        let Some(plan) = tx.get_plan(assigned.plan_id).await? else {
            continue;
        };
        if plan.code == code && hit.as_ref().is_none_or(|h| h.deleted) {
            hit = Some(plan);
        }
    }
    let missing = || VacationError::not_found("user plan", format!("{user_id}/{code}"));
    let plan = hit.ok_or_else(missing)?;
    let user_plan = tx.find_user_plan(user_id, plan.id).await?.ok_or_else(missing)?;
    Ok((plan, user_plan))
}

/// Appends `policy_id` to the end of the plan.
async fn attach_policy<T: VacationTx>(tx: &mut T, plan_id: u64, policy_id: u64) -> EngineResult<PlanPolicy> {
    let policy = found(tx.get_policy(policy_id).await?, "policy", policy_id)?;
    if policy.deleted {
        return Err(RuleViolation::PolicyDeleted.into());
    }
    let members = tx.plan_policies(plan_id).await?;
    if members.iter().any(|m| m.policy_id == policy_id) {
        return Err(RuleViolation::DuplicatePlanPolicy.into());
    }
    let position = members.iter().map(|m| m.position + 1).max().unwrap_or(1);
    let id = tx.insert_plan_policy(plan_id, policy_id, position).await?;
    Ok(PlanPolicy {
        id,
        plan_id,
        policy_id,
        position,
        deleted: false,
    })
}

/// Recurring policies among the plan's active memberships.
async fn recurring_policy_ids<T: VacationTx>(tx: &mut T, plan_id: u64) -> EngineResult<Vec<u64>> {
    let mut ids = Vec::new();
    for member in tx.plan_policies(plan_id).await? {
        if let Some(policy) = tx.get_policy(member.policy_id).await? {
            if policy.is_recurring() {
                ids.push(policy.id);
            }
        }
    }
    Ok(ids)
}

impl<S: VacationStore, D: Directory> VacationEngine<S, D> {
    /// Creates a plan, attaching `policy_ids` in the given order.
    #[instrument(skip(self, new), fields(code = %new.code))]
    pub async fn create_plan(&self, new: NewPlan, now: NaiveDateTime) -> EngineResult<PlanDetail> {
        let code = new.code.trim().to_string();
        let name = new.name.trim().to_string();
        if code.is_empty() || name.is_empty() {
            return Err(VacationError::validation("code and name are required"));
        }

        let mut tx = self.store.begin().await?;
        if tx.find_plan_by_code(&code).await?.is_some() {
            return Err(RuleViolation::DuplicatePlanCode.into());
        }
        let mut plan = Plan {
            id: 0,
            code,
            name,
            description: new.description,
            deleted: false,
            created_at: now,
        };
        plan.id = tx.insert_plan(&plan).await?;

        let mut policies = Vec::with_capacity(new.policy_ids.len());
        for policy_id in new.policy_ids {
            policies.push(attach_policy(&mut tx, plan.id, policy_id).await?);
        }
        tx.commit().await?;

        info!(plan_id = plan.id, policies = policies.len(), "Plan created");
        Ok(PlanDetail { plan, policies })
    }

    pub async fn get_plan(&self, plan_id: u64) -> EngineResult<PlanDetail> {
        let mut tx = self.store.begin().await?;
        let plan = active_plan(&mut tx, plan_id).await?;
        let policies = tx.plan_policies(plan_id).await?;
        Ok(PlanDetail { plan, policies })
    }

    pub async fn list_plans(&self) -> EngineResult<Vec<Plan>> {
        let mut tx = self.store.begin().await?;
        tx.list_plans().await
    }

    #[instrument(skip(self, update))]
    pub async fn update_plan(&self, plan_id: u64, update: UpdatePlan) -> EngineResult<Plan> {
        let mut tx = self.store.begin().await?;
        let mut plan = active_plan(&mut tx, plan_id).await?;
        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(VacationError::validation("name must not be empty"));
            }
            plan.name = name.to_string();
        }
        if let Some(description) = update.description {
            plan.description = description;
        }
        tx.update_plan(&plan).await?;
        tx.commit().await?;
        Ok(plan)
    }

    /// Soft-deletes the plan only; memberships and assignments are kept.
    #[instrument(skip(self))]
    pub async fn delete_plan(&self, plan_id: u64) -> EngineResult<()> {
        let mut tx = self.store.begin().await?;
        let mut plan = active_plan(&mut tx, plan_id).await?;
        plan.deleted = true;
        tx.update_plan(&plan).await?;
        tx.commit().await?;
        info!(plan_id, "Plan deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn add_policy_to_plan(&self, plan_id: u64, policy_id: u64) -> EngineResult<PlanPolicy> {
        let mut tx = self.store.begin().await?;
        active_plan(&mut tx, plan_id).await?;
        let member = attach_policy(&mut tx, plan_id, policy_id).await?;
        tx.commit().await?;
        Ok(member)
    }

    #[instrument(skip(self))]
    pub async fn remove_policy_from_plan(&self, plan_id: u64, policy_id: u64) -> EngineResult<()> {
        let mut tx = self.store.begin().await?;
        active_plan(&mut tx, plan_id).await?;
        let member = tx
            .plan_policies(plan_id)
            .await?
            .into_iter()
            .find(|m| m.policy_id == policy_id)
            .ok_or_else(|| VacationError::not_found("plan policy", policy_id))?;
        tx.mark_plan_policy_deleted(member.id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Soft-deletes every current membership and attaches `policy_ids`
    /// afresh, in order.
    #[instrument(skip(self))]
    pub async fn replace_policies(&self, plan_id: u64, policy_ids: Vec<u64>) -> EngineResult<PlanDetail> {
        let mut tx = self.store.begin().await?;
        let plan = active_plan(&mut tx, plan_id).await?;
        for member in tx.plan_policies(plan_id).await? {
            tx.mark_plan_policy_deleted(member.id).await?;
        }
        let mut policies = Vec::with_capacity(policy_ids.len());
        for policy_id in policy_ids {
            policies.push(attach_policy(&mut tx, plan_id, policy_id).await?);
        }
        tx.commit().await?;
        Ok(PlanDetail { plan, policies })
    }

    /// Assigns the plan and schedules every recurring policy in it that the
    /// user is not already scheduled for.
    #[instrument(skip(self))]
    pub async fn assign_plan_to_user(
        &self,
        user_id: u64,
        plan_code: &str,
        now: NaiveDateTime,
    ) -> EngineResult<UserPlan> {
        self.directory.get_user(user_id).await?;

        let mut tx = self.store.begin().await?;
        let plan = active_plan_by_code(&mut tx, plan_code).await?;
        if tx.find_user_plan(user_id, plan.id).await?.is_some() {
            return Err(RuleViolation::DuplicatePlanAssignment.into());
        }
        let mut user_plan = UserPlan {
            id: 0,
            user_id,
            plan_id: plan.id,
            deleted: false,
            assigned_at: now,
        };
        user_plan.id = tx.insert_user_plan(&user_plan).await?;

        let mut scheduled = 0;
        for policy_id in recurring_policy_ids(&mut tx, plan.id).await? {
            if tx.find_schedule(user_id, policy_id).await?.is_none() {
                tx.insert_schedule(&GrantSchedule {
                    id: 0,
                    user_id,
                    policy_id,
                    starts_on: now.date(),
                    deleted: false,
                })
                .await?;
                scheduled += 1;
            }
        }
        tx.commit().await?;

        info!(user_plan_id = user_plan.id, scheduled, "Plan assigned");
        Ok(user_plan)
    }

    /// Removes the assignment and every schedule no other active plan of
    /// the user still needs. Works on assignments to deleted plans too.
    #[instrument(skip(self))]
    pub async fn revoke_plan_from_user(&self, user_id: u64, plan_code: &str) -> EngineResult<()> {
        let mut tx = self.store.begin().await?;
        let (plan, user_plan) = assignment_by_code(&mut tx, user_id, plan_code).await?;
        tx.mark_user_plan_deleted(user_plan.id).await?;

        let mut still_needed = HashSet::new();
        for other in tx.user_plans(user_id).await? {
            if other.plan_id == plan.id {
                continue;
            }
            if !tx.get_plan(other.plan_id).await?.is_some_and(|p| !p.deleted) {
                continue;
            }
            for member in tx.plan_policies(other.plan_id).await? {
                still_needed.insert(member.policy_id);
            }
        }

        let mut unscheduled = 0;
        for policy_id in recurring_policy_ids(&mut tx, plan.id).await? {
            if still_needed.contains(&policy_id) {
                continue;
            }
            if let Some(schedule) = tx.find_schedule(user_id, policy_id).await? {
                tx.mark_schedule_deleted(schedule.id).await?;
                unscheduled += 1;
            }
        }
        tx.commit().await?;

        info!(user_plan_id = user_plan.id, unscheduled, "Plan revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testkit::{at, date, engine, manual_policy, yearly_policy};
    use rust_decimal_macros::dec;

    fn new_plan(code: &str, policy_ids: Vec<u64>) -> NewPlan {
        NewPlan {
            code: code.into(),
            name: format!("{code} plan"),
            description: String::new(),
            policy_ids,
        }
    }

    #[actix_web::test]
    async fn duplicate_code_and_policy_are_rejected() {
        let (engine, _) = engine();
        let now = at(date(2025, 1, 1), 9);
        let policy = engine.create_policy(manual_policy("ANNUAL", None), now).await.unwrap();

        let detail = engine.create_plan(new_plan("STD", vec![policy.id]), now).await.unwrap();
        assert_eq!(detail.policies.len(), 1);

        let err = engine.create_plan(new_plan("STD", vec![]), now).await.unwrap_err();
        assert_eq!(err.rule(), Some(RuleViolation::DuplicatePlanCode));

        let err = engine.add_policy_to_plan(detail.plan.id, policy.id).await.unwrap_err();
        assert_eq!(err.rule(), Some(RuleViolation::DuplicatePlanPolicy));
    }

    #[actix_web::test]
    async fn replace_keeps_history_as_deleted_rows() {
        let (engine, store) = engine();
        let now = at(date(2025, 1, 1), 9);
        let a = engine.create_policy(manual_policy("ANNUAL", None), now).await.unwrap();
        let b = engine.create_policy(manual_policy("SICK", None), now).await.unwrap();
        let plan = engine.create_plan(new_plan("STD", vec![a.id]), now).await.unwrap().plan;

        let detail = engine.replace_policies(plan.id, vec![b.id, a.id]).await.unwrap();
        let ids: Vec<u64> = detail.policies.iter().map(|m| m.policy_id).collect();
        assert_eq!(ids, vec![b.id, a.id]);

        let tables = store.snapshot().await;
        assert_eq!(tables.plan_policies.values().count(), 3);
        assert_eq!(tables.plan_policies.values().filter(|m| m.deleted).count(), 1);

        engine.remove_policy_from_plan(plan.id, b.id).await.unwrap();
        let remaining = engine.get_plan(plan.id).await.unwrap().policies;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].policy_id, a.id);
    }

    #[actix_web::test]
    async fn shared_recurring_policy_keeps_its_schedule() {
        let (engine, store) = engine();
        let now = at(date(2025, 1, 1), 9);
        let yearly = engine.create_policy(yearly_policy(dec!(15)), now).await.unwrap();
        let manual = engine.create_policy(manual_policy("SICK", None), now).await.unwrap();
        engine.create_plan(new_plan("A", vec![yearly.id, manual.id]), now).await.unwrap();
        engine.create_plan(new_plan("B", vec![yearly.id]), now).await.unwrap();

        engine.assign_plan_to_user(1, "A", now).await.unwrap();
        engine.assign_plan_to_user(1, "B", now).await.unwrap();
        let err = engine.assign_plan_to_user(1, "A", now).await.unwrap_err();
        assert_eq!(err.rule(), Some(RuleViolation::DuplicatePlanAssignment));

        let schedules = store.snapshot().await.schedules;
        assert_eq!(schedules.values().count(), 1);

        engine.revoke_plan_from_user(1, "A").await.unwrap();
        let schedules = store.snapshot().await.schedules;
        assert!(schedules.values().all(|s| !s.deleted));

        engine.revoke_plan_from_user(1, "B").await.unwrap();
        let schedules = store.snapshot().await.schedules;
        assert!(schedules.values().all(|s| s.deleted));
    }

    #[actix_web::test]
    async fn deleted_plan_can_still_be_revoked() {
        let (engine, store) = engine();
        let now = at(date(2025, 1, 1), 9);
        let yearly = engine.create_policy(yearly_policy(dec!(15)), now).await.unwrap();
        let plan = engine.create_plan(new_plan("A", vec![yearly.id]), now).await.unwrap().plan;
        engine.assign_plan_to_user(1, "A", now).await.unwrap();

        engine.delete_plan(plan.id).await.unwrap();
        engine.revoke_plan_from_user(1, "A").await.unwrap();

        let tables = store.snapshot().await;
        assert!(tables.schedules.values().all(|s| s.deleted));
        assert!(tables.user_plans.values().all(|up| up.deleted));

        let report = engine.run_scheduler(date(2027, 1, 1), at(date(2027, 1, 1), 0)).await.unwrap();
        assert_eq!(report.materialized, 0);
        assert_eq!(store.snapshot().await.grants.values().count(), 0);

        let err = engine.revoke_plan_from_user(1, "A").await.unwrap_err();
        assert!(matches!(err, VacationError::NotFound { entity: "user plan", .. }));
    }

    #[actix_web::test]
    async fn unknown_user_cannot_be_assigned() {
        let (engine, _) = engine();
        let now = at(date(2025, 1, 1), 9);
        engine.create_plan(new_plan("STD", vec![]), now).await.unwrap();

        let err = engine.assign_plan_to_user(99, "STD", now).await.unwrap_err();
        assert!(matches!(err, VacationError::NotFound { entity: "user", .. }));
    }
}
