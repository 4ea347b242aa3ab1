//! Sequential multi-approver state machine of on-request grants.
//!
//! A grant's state is never stored incrementally: after every decision it
//! is recomputed from the full, ordered list of its approvals.

use std::collections::HashSet;

use crate::error::{RuleViolation, VacationError};
use crate::model::approval::{Approval, ApprovalStatus};
use crate::model::directory::ApproverCandidate;
use crate::model::grant::GrantStatus;

/// `min(policy count, available heads)`.
pub fn required_approver_count(policy_count: u32, available: usize) -> usize {
    usize::try_from(policy_count).unwrap_or(usize::MAX).min(available)
}

/// Heads of the requester's department chain, minus the requester.
pub fn available_approvers(chain: &[ApproverCandidate], requester_id: u64) -> Vec<ApproverCandidate> {
    let mut seen = HashSet::new();
    chain
        .iter()
        .filter(|c| c.head_user_id != requester_id && seen.insert(c.head_user_id))
        .copied()
        .collect()
}

/// Validates the caller's chosen approvers and sorts them so the most local
/// department decides first.
pub fn order_approvers(
    available: &[ApproverCandidate],
    chosen: &[u64],
    requester_id: u64,
    required: usize,
) -> Result<Vec<u64>, VacationError> {
    if chosen.len() != required {
        return Err(RuleViolation::ApproverCountMismatch.into());
    }

    let mut seen = HashSet::new();
    let mut ordered = Vec::with_capacity(chosen.len());
    for &approver_id in chosen {
        if approver_id == requester_id {
            return Err(RuleViolation::SelfApproval.into());
        }
        if !seen.insert(approver_id) {
            return Err(RuleViolation::DuplicateApprover.into());
        }
        let candidate = available
            .iter()
            .find(|c| c.head_user_id == approver_id)
            .ok_or(RuleViolation::NotDepartmentHead)?;
        ordered.push(*candidate);
    }

    ordered.sort_by_key(|c| c.level);
    Ok(ordered.into_iter().map(|c| c.head_user_id).collect())
}

/// Checks that `approver_id` may decide `approval` right now.
pub fn ensure_can_decide(
    approvals: &[Approval],
    approval: &Approval,
    approver_id: u64,
) -> Result<(), VacationError> {
    if approval.approver_id != approver_id {
        return Err(RuleViolation::NotDesignatedApprover.into());
    }
    if approval.status != ApprovalStatus::Pending {
        return Err(RuleViolation::ApprovalAlreadyDecided.into());
    }
    let earlier_undecided = approvals
        .iter()
        .any(|a| a.seq < approval.seq && a.status != ApprovalStatus::Approved);
    if earlier_undecided {
        return Err(RuleViolation::ApprovalOutOfSequence.into());
    }
    Ok(())
}

/// Grant state implied by its approvals.
pub fn aggregate_status(approvals: &[Approval]) -> GrantStatus {
    if approvals.iter().any(|a| a.status == ApprovalStatus::Rejected) {
        return GrantStatus::Rejected;
    }
    let approved = approvals
        .iter()
        .filter(|a| a.status == ApprovalStatus::Approved)
        .count();
    if approved == approvals.len() {
        GrantStatus::Active
    } else if approvals.len() >= 2 && approved > 0 {
        GrantStatus::Progress
    } else {
        GrantStatus::Pending
    }
}

/// Approvals still waiting on `approver_id` whose turn has come.
pub fn actionable_for<'a>(approvals: &'a [Approval], approver_id: u64) -> Vec<&'a Approval> {
    approvals
        .iter()
        .filter(|a| a.approver_id == approver_id)
        .filter(|a| ensure_can_decide(approvals, a, approver_id).is_ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approval(id: u64, approver_id: u64, seq: u32, status: ApprovalStatus) -> Approval {
        Approval {
            id,
            grant_id: 1,
            approver_id,
            seq,
            status,
            decided_at: None,
            reject_reason: None,
        }
    }

    fn chain() -> Vec<ApproverCandidate> {
        vec![
            ApproverCandidate { head_user_id: 30, level: 3 },
            ApproverCandidate { head_user_id: 10, level: 1 },
            ApproverCandidate { head_user_id: 20, level: 2 },
        ]
    }

    #[test]
    fn requester_is_never_their_own_approver() {
        let mut heads = chain();
        heads.push(ApproverCandidate { head_user_id: 5, level: 1 });
        let available = available_approvers(&heads, 5);
        assert_eq!(available.len(), 3);
        assert_eq!(required_approver_count(5, available.len()), 3);
        assert_eq!(required_approver_count(1, available.len()), 1);
    }

    #[test]
    fn approvers_are_sorted_most_local_first() {
        let ordered = order_approvers(&chain(), &[30, 10], 5, 2).unwrap();
        assert_eq!(ordered, vec![10, 30]);
    }

    #[test]
    fn approver_selection_is_validated() {
        let heads = chain();
        let err = |chosen: &[u64]| order_approvers(&heads, chosen, 5, 2).unwrap_err().rule();

        assert_eq!(err(&[10]), Some(RuleViolation::ApproverCountMismatch));
        assert_eq!(err(&[10, 5]), Some(RuleViolation::SelfApproval));
        assert_eq!(err(&[10, 10]), Some(RuleViolation::DuplicateApprover));
        assert_eq!(err(&[10, 99]), Some(RuleViolation::NotDepartmentHead));
    }

    #[test]
    fn later_approver_waits_for_earlier_ones() {
        let approvals = vec![
            approval(1, 10, 1, ApprovalStatus::Pending),
            approval(2, 20, 2, ApprovalStatus::Pending),
        ];
        assert_eq!(
            ensure_can_decide(&approvals, &approvals[1], 20).unwrap_err().rule(),
            Some(RuleViolation::ApprovalOutOfSequence)
        );
        assert_eq!(
            ensure_can_decide(&approvals, &approvals[0], 20).unwrap_err().rule(),
            Some(RuleViolation::NotDesignatedApprover)
        );
        assert!(ensure_can_decide(&approvals, &approvals[0], 10).is_ok());
    }

    #[test]
    fn aggregate_follows_the_chain() {
        let mut approvals = vec![
            approval(1, 10, 1, ApprovalStatus::Pending),
            approval(2, 20, 2, ApprovalStatus::Pending),
        ];
        assert_eq!(aggregate_status(&approvals), GrantStatus::Pending);

        approvals[0].status = ApprovalStatus::Approved;
        assert_eq!(aggregate_status(&approvals), GrantStatus::Progress);

        approvals[1].status = ApprovalStatus::Approved;
        assert_eq!(aggregate_status(&approvals), GrantStatus::Active);

        approvals[1].status = ApprovalStatus::Rejected;
        assert_eq!(aggregate_status(&approvals), GrantStatus::Rejected);
    }

    #[test]
    fn single_approver_goes_straight_to_active() {
        let mut approvals = vec![approval(1, 10, 1, ApprovalStatus::Pending)];
        approvals[0].status = ApprovalStatus::Approved;
        assert_eq!(aggregate_status(&approvals), GrantStatus::Active);
    }

    #[test]
    fn only_turn_holders_see_actionable_approvals() {
        let approvals = vec![
            approval(1, 10, 1, ApprovalStatus::Approved),
            approval(2, 20, 2, ApprovalStatus::Pending),
            approval(3, 30, 3, ApprovalStatus::Pending),
        ];
        assert_eq!(actionable_for(&approvals, 20).len(), 1);
        assert!(actionable_for(&approvals, 30).is_empty());
    }
}
