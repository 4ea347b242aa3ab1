use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use utoipa::ToSchema;

use super::{Engine, now};
use crate::auth::auth::AuthUser;
use crate::model::plan::{NewPlan, UpdatePlan};

#[derive(Deserialize, ToSchema)]
pub struct AddPlanPolicy {
    #[schema(example = 3)]
    pub policy_id: u64,
}

#[derive(Deserialize, ToSchema)]
pub struct ReplacePlanPolicies {
    /// new membership, in order
    #[schema(example = json!([1, 3]))]
    pub policy_ids: Vec<u64>,
}

/// Creates a plan, optionally with its first policies.
#[utoipa::path(
    post,
    path = "/api/plans",
    request_body(content = NewPlan, content_type = "application/json"),
    responses(
        (status = 201, description = "Plan created", body = crate::model::plan::PlanDetail),
        (status = 400, description = "Code or name missing"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Duplicate code or policy")
    ),
    security(("bearer_auth" = [])),
    tag = "Plan"
)]
pub async fn create_plan(
    auth: AuthUser,
    engine: web::Data<Engine>,
    payload: web::Json<NewPlan>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let detail = engine.create_plan(payload.into_inner(), now()).await?;
    Ok(HttpResponse::Created().json(detail))
}

#[utoipa::path(
    get,
    path = "/api/plans",
    responses(
        (status = 200, description = "Active plans", body = [crate::model::plan::Plan]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Plan"
)]
pub async fn list_plans(
    _auth: AuthUser,
    engine: web::Data<Engine>,
) -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(engine.list_plans().await?))
}

#[utoipa::path(
    get,
    path = "/api/plans/{plan_id}",
    params(("plan_id" = u64, Path, description = "ID of the plan")),
    responses(
        (status = 200, description = "Plan with its policies", body = crate::model::plan::PlanDetail),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Plan not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Plan"
)]
pub async fn get_plan(
    _auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(engine.get_plan(path.into_inner()).await?))
}

#[utoipa::path(
    put,
    path = "/api/plans/{plan_id}",
    params(("plan_id" = u64, Path, description = "ID of the plan")),
    request_body(content = UpdatePlan, content_type = "application/json"),
    responses(
        (status = 200, description = "Plan updated", body = crate::model::plan::Plan),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Plan not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Plan"
)]
pub async fn update_plan(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    payload: web::Json<UpdatePlan>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let plan = engine
        .update_plan(path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(plan))
}

/// Member policies and user assignments are left untouched.
#[utoipa::path(
    delete,
    path = "/api/plans/{plan_id}",
    params(("plan_id" = u64, Path, description = "ID of the plan")),
    responses(
        (status = 200, description = "Plan deleted", body = Object, example = json!({
            "message": "Plan deleted"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Plan not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Plan"
)]
pub async fn delete_plan(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    engine.delete_plan(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Plan deleted" })))
}

#[utoipa::path(
    post,
    path = "/api/plans/{plan_id}/policies",
    params(("plan_id" = u64, Path, description = "ID of the plan")),
    request_body(content = AddPlanPolicy, content_type = "application/json"),
    responses(
        (status = 201, description = "Policy added", body = crate::model::plan::PlanPolicy),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Plan or policy not found"),
        (status = 409, description = "Policy already in plan or deleted")
    ),
    security(("bearer_auth" = [])),
    tag = "Plan"
)]
pub async fn add_policy(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    payload: web::Json<AddPlanPolicy>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let member = engine
        .add_policy_to_plan(path.into_inner(), payload.policy_id)
        .await?;
    Ok(HttpResponse::Created().json(member))
}

/// Replaces the whole membership; previous rows are kept as deleted.
#[utoipa::path(
    put,
    path = "/api/plans/{plan_id}/policies",
    params(("plan_id" = u64, Path, description = "ID of the plan")),
    request_body(content = ReplacePlanPolicies, content_type = "application/json"),
    responses(
        (status = 200, description = "Membership replaced", body = crate::model::plan::PlanDetail),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Plan or policy not found"),
        (status = 409, description = "Duplicate or deleted policy")
    ),
    security(("bearer_auth" = [])),
    tag = "Plan"
)]
pub async fn replace_policies(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    payload: web::Json<ReplacePlanPolicies>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let detail = engine
        .replace_policies(path.into_inner(), payload.into_inner().policy_ids)
        .await?;
    Ok(HttpResponse::Ok().json(detail))
}

#[utoipa::path(
    delete,
    path = "/api/plans/{plan_id}/policies/{policy_id}",
    params(
        ("plan_id" = u64, Path, description = "ID of the plan"),
        ("policy_id" = u64, Path, description = "ID of the policy to remove")
    ),
    responses(
        (status = 200, description = "Policy removed", body = Object, example = json!({
            "message": "Policy removed from plan"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Plan or membership not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Plan"
)]
pub async fn remove_policy(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<(u64, u64)>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let (plan_id, policy_id) = path.into_inner();
    engine.remove_policy_from_plan(plan_id, policy_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Policy removed from plan" })))
}

/// Assigns a plan and schedules its recurring policies for the user.
#[utoipa::path(
    post,
    path = "/api/plans/code/{code}/users/{user_id}",
    params(
        ("code" = String, Path, description = "Plan code"),
        ("user_id" = u64, Path, description = "User receiving the plan")
    ),
    responses(
        (status = 201, description = "Plan assigned", body = crate::model::plan::UserPlan),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Plan or user not found"),
        (status = 409, description = "Plan already assigned")
    ),
    security(("bearer_auth" = [])),
    tag = "Plan"
)]
pub async fn assign_plan(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<(String, u64)>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let (code, user_id) = path.into_inner();
    let user_plan = engine.assign_plan_to_user(user_id, &code, now()).await?;
    Ok(HttpResponse::Created().json(user_plan))
}

#[utoipa::path(
    delete,
    path = "/api/plans/code/{code}/users/{user_id}",
    params(
        ("code" = String, Path, description = "Plan code"),
        ("user_id" = u64, Path, description = "User losing the plan")
    ),
    responses(
        (status = 200, description = "Plan revoked", body = Object, example = json!({
            "message": "Plan revoked"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Assignment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Plan"
)]
pub async fn revoke_plan(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<(String, u64)>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let (code, user_id) = path.into_inner();
    engine.revoke_plan_from_user(user_id, &code).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Plan revoked" })))
}
