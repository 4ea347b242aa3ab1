use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

/// Business-rule cause codes. Never retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleViolation {
    InsufficientBalance,
    RevokeAfterUse,
    GrantNotActive,
    CancelAfterStart,
    UsageAlreadyCancelled,
    ApprovalOutOfSequence,
    ApprovalAlreadyDecided,
    NotDesignatedApprover,
    SelfApproval,
    NotDepartmentHead,
    ApproverCountMismatch,
    DuplicateApprover,
    GrantNotPending,
    NotRequester,
    DuplicatePlanAssignment,
    DuplicatePlanCode,
    DuplicatePlanPolicy,
    PolicyNotAssigned,
    WrongGrantMethod,
    PolicyNotDeletable,
    PolicyAlreadyDeleted,
    PolicyDeleted,
    MinuteUsageNotAllowed,
    OutsideWorkingHours,
}

impl RuleViolation {
    pub fn message(self) -> &'static str {
        match self {
            RuleViolation::InsufficientBalance => "Not enough remaining vacation for this request",
            RuleViolation::RevokeAfterUse => "A grant that has been used cannot be revoked",
            RuleViolation::GrantNotActive => "Grant is not active",
            RuleViolation::CancelAfterStart => "Vacation that has already started cannot be cancelled",
            RuleViolation::UsageAlreadyCancelled => "Vacation usage is already cancelled",
            RuleViolation::ApprovalOutOfSequence => "An earlier approver has not decided yet",
            RuleViolation::ApprovalAlreadyDecided => "Approval has already been decided",
            RuleViolation::NotDesignatedApprover => "Caller is not the designated approver",
            RuleViolation::SelfApproval => "Requester cannot approve their own request",
            RuleViolation::NotDepartmentHead => "Approver is not a head of the requester's departments",
            RuleViolation::ApproverCountMismatch => "Wrong number of approvers for this policy",
            RuleViolation::DuplicateApprover => "The same approver was given twice",
            RuleViolation::GrantNotPending => "Request is no longer awaiting a decision",
            RuleViolation::NotRequester => "Only the requester can cancel this request",
            RuleViolation::DuplicatePlanAssignment => "Plan is already assigned to this user",
            RuleViolation::DuplicatePlanCode => "A plan with this code already exists",
            RuleViolation::DuplicatePlanPolicy => "Policy is already part of this plan",
            RuleViolation::PolicyNotAssigned => "Policy is not assigned to this user",
            RuleViolation::WrongGrantMethod => "Operation does not match the policy's grant method",
            RuleViolation::PolicyNotDeletable => "Policy is not deletable",
            RuleViolation::PolicyAlreadyDeleted => "Policy is already deleted",
            RuleViolation::PolicyDeleted => "Policy has been deleted",
            RuleViolation::MinuteUsageNotAllowed => "No policy of this leave type allows minute usage",
            RuleViolation::OutsideWorkingHours => "Requested time is outside working hours",
        }
    }
}

#[derive(Debug, Error)]
pub enum VacationError {
    #[error("{0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{}", .0.message())]
    Rule(RuleViolation),

    #[error("ledger invariant violated: {0}")]
    Invariant(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl VacationError {
    pub fn validation(message: impl Into<String>) -> Self {
        VacationError::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        VacationError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Logs at error level; these point at a concurrency-control defect.
    pub fn invariant(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(%message, "Ledger invariant violated");
        VacationError::Invariant(message)
    }

    pub fn rule(&self) -> Option<RuleViolation> {
        match self {
            VacationError::Rule(rule) => Some(*rule),
            _ => None,
        }
    }
}

impl From<RuleViolation> for VacationError {
    fn from(rule: RuleViolation) -> Self {
        VacationError::Rule(rule)
    }
}

impl ResponseError for VacationError {
    fn status_code(&self) -> StatusCode {
        match self {
            VacationError::Validation(_) => StatusCode::BAD_REQUEST,
            VacationError::NotFound { .. } => StatusCode::NOT_FOUND,
            VacationError::Rule(_) => StatusCode::CONFLICT,
            VacationError::Invariant(_) | VacationError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            VacationError::Rule(rule) => json!({
                "code": rule.as_ref(),
                "message": rule.message()
            }),
            VacationError::Invariant(_) | VacationError::Database(_) => {
                tracing::error!(error = %self, "Request failed");
                json!({ "message": "Internal Server Error" })
            }
            other => json!({ "message": other.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_violations_map_to_conflict_with_code() {
        let err = VacationError::from(RuleViolation::InsufficientBalance);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(RuleViolation::InsufficientBalance.as_ref(), "INSUFFICIENT_BALANCE");
        assert_eq!(err.rule(), Some(RuleViolation::InsufficientBalance));
    }

    #[test]
    fn internal_failures_hide_details() {
        let err = VacationError::Invariant("deduction walk fell short".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            VacationError::not_found("grant", 7).to_string(),
            "grant 7 not found"
        );
    }
}
