use crate::api::UserQuery;
use crate::api::approval::RejectVacation;
use crate::api::plan::{AddPlanPolicy, ReplacePlanPolicies};
use crate::api::scheduler::SweepQuery;
use crate::api::stats::{BalanceQuery, UsageQuery};
use crate::model::approval::{Approval, ApprovalStatus, VacationRequest};
use crate::model::grant::{Grant, GrantStatus, ManualGrant};
use crate::model::plan::{NewPlan, Plan, PlanDetail, PlanPolicy, UpdatePlan, UserPlan};
use crate::model::policy::{EffectiveRule, GrantMethod, NewPolicy, Policy, RepeatUnit, RepetitionRule};
use crate::model::usage::{Deduction, Usage, UsageUnit, UseVacation};
use crate::service::{SchedulerReport, UsageReceipt, VacationRequestDetail};
use crate::vacation::stats::{BalanceSummary, GrantHistory, UsageSummary};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Vacation API",
        version = "1.0.0",
        description = r#"
## Vacation Balance & Approval Engine

Grants, consumes and audits paid-leave balances for the HR platform.

### 🔹 Key Features
- **Policies & Plans**
  - Define how leave is granted and bundle policies into plans assigned to users
- **Grants**
  - Recurring grants issued by the scheduler, manual grants and on-request grants
- **Usage**
  - Book leave against grants earliest-expiry first, cancel or change it before it starts
- **Approvals**
  - Sequential approval by department heads for on-request leave
- **Statistics**
  - Balance and usage summaries per leave type

### 🔐 Security
All endpoints require a **JWT Bearer** access token.
Policy, plan and grant administration is limited to **Admin** or **HR**.

### ⚠️ Errors
Business-rule failures answer `409` with a stable `code` such as `INSUFFICIENT_BALANCE`.
"#,
    ),
    paths(
        crate::api::policy::create_policy,
        crate::api::policy::list_policies,
        crate::api::policy::get_policy,
        crate::api::policy::delete_policy,

        crate::api::plan::create_plan,
        crate::api::plan::list_plans,
        crate::api::plan::get_plan,
        crate::api::plan::update_plan,
        crate::api::plan::delete_plan,
        crate::api::plan::add_policy,
        crate::api::plan::replace_policies,
        crate::api::plan::remove_policy,
        crate::api::plan::assign_plan,
        crate::api::plan::revoke_plan,

        crate::api::grant::manual_grant,
        crate::api::grant::list_grants,
        crate::api::grant::grant_history,
        crate::api::grant::revoke_grant,

        crate::api::approval::request_vacation,
        crate::api::approval::cancel_request,
        crate::api::approval::request_approvals,
        crate::api::approval::pending_approvals,
        crate::api::approval::approve,
        crate::api::approval::reject,

        crate::api::usage::use_vacation,
        crate::api::usage::list_usages,
        crate::api::usage::get_usage,
        crate::api::usage::update_usage,
        crate::api::usage::cancel_usage,

        crate::api::stats::balance,
        crate::api::stats::usage,

        crate::api::scheduler::run
    ),
    components(
        schemas(
            Policy,
            NewPolicy,
            GrantMethod,
            RepeatUnit,
            RepetitionRule,
            EffectiveRule,
            Plan,
            PlanPolicy,
            PlanDetail,
            NewPlan,
            UpdatePlan,
            UserPlan,
            AddPlanPolicy,
            ReplacePlanPolicies,
            Grant,
            GrantStatus,
            ManualGrant,
            GrantHistory,
            Usage,
            UsageUnit,
            UseVacation,
            Deduction,
            UsageReceipt,
            Approval,
            ApprovalStatus,
            VacationRequest,
            VacationRequestDetail,
            RejectVacation,
            BalanceSummary,
            UsageSummary,
            SchedulerReport,
            UserQuery,
            BalanceQuery,
            UsageQuery,
            SweepQuery
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Policy", description = "Vacation policy APIs"),
        (name = "Plan", description = "Vacation plan and assignment APIs"),
        (name = "Grant", description = "Grant issuing and history APIs"),
        (name = "Approval", description = "On-request leave and approval APIs"),
        (name = "Usage", description = "Vacation usage APIs"),
        (name = "Stats", description = "Balance and usage statistics"),
        (name = "Scheduler", description = "Recurring grant sweep"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
