use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use super::{found, EngineResult, VacationEngine};
use crate::directory::Directory;
use crate::error::{RuleViolation, VacationError};
use crate::model::approval::{Approval, ApprovalStatus, VacationRequest};
use crate::model::grant::{Grant, GrantStatus};
use crate::repository::{VacationStore, VacationTx};
use crate::vacation::ledger::normalize_amount;
use crate::vacation::rules::GrantStrategy;
use crate::vacation::workflow::{
    aggregate_status, available_approvers, ensure_can_decide, order_approvers,
    required_approver_count,
};

/// An on-request grant with its approval chain, ordered by sequence.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VacationRequestDetail {
    pub grant: Grant,
    pub approvals: Vec<Approval>,
}

enum Decision {
    Approve,
    Reject(String),
}

/// True when the policy is a member of one of the user's active plans.
async fn policy_assigned<T: VacationTx>(tx: &mut T, user_id: u64, policy_id: u64) -> EngineResult<bool> {
    for user_plan in tx.user_plans(user_id).await? {
        if !tx.get_plan(user_plan.plan_id).await?.is_some_and(|p| !p.deleted) {
            continue;
        }
        let members = tx.plan_policies(user_plan.plan_id).await?;
        if members.iter().any(|m| m.policy_id == policy_id) {
            return Ok(true);
        }
    }
    Ok(false)
}

impl<S: VacationStore, D: Directory> VacationEngine<S, D> {
    /// Files an on-request grant. Without required approvers the grant is
    /// active right away.
    #[instrument(skip(self, request), fields(user_id = request.user_id, policy_id = request.policy_id))]
    pub async fn request_vacation(
        &self,
        request: VacationRequest,
        now: NaiveDateTime,
    ) -> EngineResult<VacationRequestDetail> {
        let reason = request.reason.trim();
        if reason.is_empty() {
            return Err(VacationError::validation("reason is required"));
        }
        if request.start_at > request.end_at {
            return Err(VacationError::validation("start must not be after end"));
        }
        let user_id = request.user_id;
        self.directory.get_user(user_id).await?;
        let chain = self.directory.approver_chain(user_id).await?;

        let mut tx = self.store.begin().await?;
        let policy = found(tx.get_policy(request.policy_id).await?, "policy", request.policy_id)?;
        if policy.deleted {
            return Err(RuleViolation::PolicyDeleted.into());
        }
        let strategy = policy.strategy()?;
        if !matches!(strategy, GrantStrategy::OnRequest(_)) {
            return Err(RuleViolation::WrongGrantMethod.into());
        }
        if !policy_assigned(&mut tx, user_id, policy.id).await? {
            return Err(RuleViolation::PolicyNotAssigned.into());
        }

        let available = available_approvers(&chain, user_id);
        let required = required_approver_count(policy.approver_count, available.len());
        let approvers = order_approvers(&available, &request.approver_ids, user_id, required)?;

        let window = (request.start_at.date(), request.end_at.date());
        let amount = normalize_amount(strategy.amount(None, Some(window))?);
        let mut grant = Grant {
            id: 0,
            user_id,
            policy_id: policy.id,
            leave_type: policy.leave_type.clone(),
            description: policy.name.clone(),
            grant_amount: amount,
            remaining: amount,
            grant_date: None,
            expiry_date: None,
            status: GrantStatus::Pending,
            request_start: Some(request.start_at),
            request_end: Some(request.end_at),
            reason: Some(reason.to_string()),
            fire_date: None,
            created_at: now,
        };
        if approvers.is_empty() {
            let (grant_date, expiry_date) = strategy.window_at(now);
            grant.grant_date = Some(grant_date);
            grant.expiry_date = Some(expiry_date);
            grant.status = GrantStatus::Active;
        }
        grant.id = tx.insert_grant(&grant).await?;

        let mut approvals = Vec::with_capacity(approvers.len());
        for (approver_id, seq) in approvers.into_iter().zip(1u32..) {
            let mut approval = Approval {
                id: 0,
                grant_id: grant.id,
                approver_id,
                seq,
                status: ApprovalStatus::Pending,
                decided_at: None,
                reject_reason: None,
            };
            approval.id = tx.insert_approval(&approval).await?;
            approvals.push(approval);
        }
        tx.commit().await?;

        info!(grant_id = grant.id, approvers = approvals.len(), status = %grant.status, "Vacation requested");
        Ok(VacationRequestDetail { grant, approvals })
    }

    #[instrument(skip(self))]
    pub async fn approve_vacation(
        &self,
        approval_id: u64,
        approver_id: u64,
        now: NaiveDateTime,
    ) -> EngineResult<VacationRequestDetail> {
        self.decide(approval_id, approver_id, Decision::Approve, now).await
    }

    #[instrument(skip(self, reason))]
    pub async fn reject_vacation(
        &self,
        approval_id: u64,
        approver_id: u64,
        reason: String,
        now: NaiveDateTime,
    ) -> EngineResult<VacationRequestDetail> {
        let reason = reason.trim().to_string();
        if reason.is_empty() {
            return Err(VacationError::validation("reject reason is required"));
        }
        self.decide(approval_id, approver_id, Decision::Reject(reason), now).await
    }

    /// Withdraws a request nobody has decided on yet.
    #[instrument(skip(self))]
    pub async fn cancel_vacation_request(&self, grant_id: u64, requester_id: u64) -> EngineResult<Grant> {
        let mut tx = self.store.begin().await?;
        let mut grant = found(tx.get_grant(grant_id).await?, "grant", grant_id)?;
        if grant.user_id != requester_id {
            return Err(RuleViolation::NotRequester.into());
        }
        let approvals = tx.approvals_for_grant(grant_id).await?;
        let decided = approvals.iter().any(|a| a.status != ApprovalStatus::Pending);
        if grant.status != GrantStatus::Pending || decided {
            return Err(RuleViolation::GrantNotPending.into());
        }
        grant.status = GrantStatus::Canceled;
        tx.update_grant(&grant).await?;
        tx.commit().await?;

        info!(grant_id, "Vacation request cancelled");
        Ok(grant)
    }

    async fn decide(
        &self,
        approval_id: u64,
        approver_id: u64,
        decision: Decision,
        now: NaiveDateTime,
    ) -> EngineResult<VacationRequestDetail> {
        let mut tx = self.store.begin().await?;
        let grant_id = found(tx.read_approval(approval_id).await?, "approval", approval_id)?.grant_id;
        // grant before approvals, same order as cancel_vacation_request
        let mut grant = found(tx.get_grant(grant_id).await?, "grant", grant_id)?;
        if !grant.status.is_undecided() {
            return Err(RuleViolation::GrantNotPending.into());
        }
        let mut approvals = tx.approvals_for_grant(grant_id).await?;
        let Some(pos) = approvals.iter().position(|a| a.id == approval_id) else {
            return Err(VacationError::invariant(format!(
                "approval {approval_id} missing from its grant's chain"
            )));
        };
        ensure_can_decide(&approvals, &approvals[pos], approver_id)?;

        let current = &mut approvals[pos];
        current.decided_at = Some(now);
        match decision {
            Decision::Approve => current.status = ApprovalStatus::Approved,
            Decision::Reject(reason) => {
                current.status = ApprovalStatus::Rejected;
                current.reject_reason = Some(reason);
            }
        }
        tx.update_approval(current).await?;

        let next = aggregate_status(&approvals);
        if next == GrantStatus::Active {
            let policy = found(tx.get_policy(grant.policy_id).await?, "policy", grant.policy_id)?;
            let (grant_date, expiry_date) = policy.strategy()?.window_at(now);
            grant.grant_date = Some(grant_date);
            grant.expiry_date = Some(expiry_date);
        }
        grant.status = next;
        tx.update_grant(&grant).await?;
        tx.commit().await?;

        match next {
            GrantStatus::Rejected => warn!(grant_id = grant.id, approval_id, "Vacation request rejected"),
            _ => info!(grant_id = grant.id, approval_id, status = %next, "Vacation request approved"),
        }
        Ok(VacationRequestDetail { grant, approvals })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::plan::NewPlan;
    use crate::repository::memory::RowLock;
    use crate::service::testkit::{at, date, directory, engine, engine_with, on_request_policy, TestEngine};
    use rust_decimal_macros::dec;

    /// Policy 1 (on-request) assigned to user 1 through plan "COMP".
    async fn setup(engine: &TestEngine, approver_count: u32) -> u64 {
        let now = at(date(2025, 1, 2), 9);
        let policy = engine
            .create_policy(on_request_policy(approver_count), now)
            .await
            .unwrap();
        engine
            .create_plan(
                NewPlan {
                    code: "COMP".into(),
                    name: "Compensatory".into(),
                    description: String::new(),
                    policy_ids: vec![policy.id],
                },
                now,
            )
            .await
            .unwrap();
        engine.assign_plan_to_user(1, "COMP", now).await.unwrap();
        policy.id
    }

    fn request(policy_id: u64, approver_ids: Vec<u64>) -> VacationRequest {
        VacationRequest {
            user_id: 1,
            policy_id,
            start_at: at(date(2025, 3, 3), 0),
            end_at: at(date(2025, 3, 5), 0),
            reason: "weekend release".into(),
            approver_ids,
        }
    }

    #[actix_web::test]
    async fn approvals_run_in_department_order() {
        // 2 heads the user's team, 3 heads the division above it
        let (engine, _) = engine_with(directory().with_chain(1, &[2, 3]));
        let policy_id = setup(&engine, 2).await;
        let now = at(date(2025, 2, 10), 10);

        let detail = engine.request_vacation(request(policy_id, vec![3, 2]), now).await.unwrap();
        assert_eq!(detail.grant.status, GrantStatus::Pending);
        assert_eq!(detail.grant.grant_amount, dec!(3));
        let [a, b] = [detail.approvals[0].clone(), detail.approvals[1].clone()];
        assert_eq!((a.approver_id, a.seq), (2, 1));
        assert_eq!((b.approver_id, b.seq), (3, 2));

        let err = engine.approve_vacation(b.id, 3, now).await.unwrap_err();
        assert_eq!(err.rule(), Some(RuleViolation::ApprovalOutOfSequence));
        let err = engine.approve_vacation(a.id, 3, now).await.unwrap_err();
        assert_eq!(err.rule(), Some(RuleViolation::NotDesignatedApprover));

        let pending = engine.pending_approvals(2).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert!(engine.pending_approvals(3).await.unwrap().is_empty());

        let step = engine.approve_vacation(a.id, 2, now).await.unwrap();
        assert_eq!(step.grant.status, GrantStatus::Progress);
        let err = engine.cancel_vacation_request(step.grant.id, 1).await.unwrap_err();
        assert_eq!(err.rule(), Some(RuleViolation::GrantNotPending));

        let done = engine.approve_vacation(b.id, 3, now).await.unwrap();
        assert_eq!(done.grant.status, GrantStatus::Active);
        assert_eq!(done.grant.grant_date, Some(date(2025, 2, 10)));
        assert_eq!(done.grant.expiry_date, Some(date(2025, 5, 9)));

        let err = engine.approve_vacation(b.id, 3, now).await.unwrap_err();
        assert_eq!(err.rule(), Some(RuleViolation::GrantNotPending));
    }

    #[actix_web::test]
    async fn rejection_is_terminal() {
        let (engine, _) = engine_with(directory().with_chain(1, &[2, 3]));
        let policy_id = setup(&engine, 2).await;
        let now = at(date(2025, 2, 10), 10);
        let detail = engine.request_vacation(request(policy_id, vec![2, 3]), now).await.unwrap();
        let first = detail.approvals[0].id;

        let err = engine
            .reject_vacation(first, 2, "  ".into(), now)
            .await
            .unwrap_err();
        assert!(matches!(err, VacationError::Validation(_)));

        let rejected = engine
            .reject_vacation(first, 2, "release slipped".into(), now)
            .await
            .unwrap();
        assert_eq!(rejected.grant.status, GrantStatus::Rejected);
        assert_eq!(
            rejected.approvals[0].reject_reason.as_deref(),
            Some("release slipped")
        );
        let err = engine
            .approve_vacation(detail.approvals[1].id, 3, now)
            .await
            .unwrap_err();
        assert_eq!(err.rule(), Some(RuleViolation::GrantNotPending));
    }

    #[actix_web::test]
    async fn approver_choice_is_validated() {
        let (engine, _) = engine_with(directory().with_chain(1, &[1, 2, 3]));
        let policy_id = setup(&engine, 2).await;
        let now = at(date(2025, 2, 10), 10);

        let cases = [
            (vec![2], RuleViolation::ApproverCountMismatch),
            (vec![1, 2], RuleViolation::SelfApproval),
            (vec![2, 2], RuleViolation::DuplicateApprover),
            (vec![2, 4], RuleViolation::NotDepartmentHead),
        ];
        for (chosen, expected) in cases {
            let err = engine
                .request_vacation(request(policy_id, chosen), now)
                .await
                .unwrap_err();
            assert_eq!(err.rule(), Some(expected));
        }
        assert!(engine.list_grants(1).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn no_available_heads_means_immediate_grant() {
        let (engine, _) = engine();
        let policy_id = setup(&engine, 2).await;
        let now = at(date(2025, 2, 10), 10);

        let detail = engine.request_vacation(request(policy_id, vec![]), now).await.unwrap();
        assert!(detail.approvals.is_empty());
        assert_eq!(detail.grant.status, GrantStatus::Active);
        assert_eq!(detail.grant.remaining, dec!(3));
    }

    #[actix_web::test]
    async fn only_requester_cancels_pending_request() {
        let (engine, _) = engine_with(directory().with_chain(1, &[2]));
        let policy_id = setup(&engine, 1).await;
        let now = at(date(2025, 2, 10), 10);
        let detail = engine.request_vacation(request(policy_id, vec![2]), now).await.unwrap();

        let err = engine.cancel_vacation_request(detail.grant.id, 2).await.unwrap_err();
        assert_eq!(err.rule(), Some(RuleViolation::NotRequester));

        let cancelled = engine.cancel_vacation_request(detail.grant.id, 1).await.unwrap();
        assert_eq!(cancelled.status, GrantStatus::Canceled);
    }

    #[actix_web::test]
    async fn grant_row_is_locked_before_its_approvals() {
        let (engine, store) = engine_with(directory().with_chain(1, &[2, 3]));
        let policy_id = setup(&engine, 2).await;
        let now = at(date(2025, 2, 10), 10);
        let detail = engine.request_vacation(request(policy_id, vec![2, 3]), now).await.unwrap();
        let grant_id = detail.grant.id;
        let chain: Vec<RowLock> = detail.approvals.iter().map(|a| RowLock::Approval(a.id)).collect();

        store.take_locks().await;
        engine.approve_vacation(detail.approvals[0].id, 2, now).await.unwrap();
        let locks = store.take_locks().await;
        assert_eq!(locks[0], RowLock::Grant(grant_id));
        assert_eq!(locks[1..], chain[..]);

        let err = engine.cancel_vacation_request(grant_id, 1).await.unwrap_err();
        assert_eq!(err.rule(), Some(RuleViolation::GrantNotPending));
        let locks = store.take_locks().await;
        assert_eq!(locks[0], RowLock::Grant(grant_id));
        assert_eq!(locks[1..], chain[..]);
    }

    #[actix_web::test]
    async fn cancelled_request_cannot_be_decided() {
        let (engine, _) = engine_with(directory().with_chain(1, &[2]));
        let policy_id = setup(&engine, 1).await;
        let now = at(date(2025, 2, 10), 10);
        let detail = engine.request_vacation(request(policy_id, vec![2]), now).await.unwrap();
        engine.cancel_vacation_request(detail.grant.id, 1).await.unwrap();

        let err = engine
            .approve_vacation(detail.approvals[0].id, 2, now)
            .await
            .unwrap_err();
        assert_eq!(err.rule(), Some(RuleViolation::GrantNotPending));
        let err = engine.approve_vacation(9999, 2, now).await.unwrap_err();
        assert!(matches!(err, VacationError::NotFound { entity: "approval", .. }));
    }

    #[actix_web::test]
    async fn unassigned_policy_is_refused() {
        let (engine, _) = engine();
        let now = at(date(2025, 1, 2), 9);
        let policy = engine.create_policy(on_request_policy(0), now).await.unwrap();

        let err = engine
            .request_vacation(request(policy.id, vec![]), now)
            .await
            .unwrap_err();
        assert_eq!(err.rule(), Some(RuleViolation::PolicyNotAssigned));
    }
}
