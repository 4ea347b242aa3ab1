use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use utoipa::ToSchema;

use super::{Engine, now};
use crate::auth::auth::AuthUser;
use crate::model::approval::VacationRequest;

#[derive(Deserialize, ToSchema)]
pub struct RejectVacation {
    #[schema(example = "Release week, please pick other dates")]
    pub reason: String,
}

/* =========================
On-request leave
========================= */
#[utoipa::path(
    post,
    path = "/api/vacation-requests",
    request_body(
        content = VacationRequest,
        description = "Requested window, reason and chosen approvers",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Request filed", body = crate::service::VacationRequestDetail),
        (status = 400, description = "Missing reason or bad window"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Approver selection or policy rejected", body = Object, example = json!({
            "code": "NOT_DEPARTMENT_HEAD",
            "message": "Approver is not a head of the requester's departments"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Approval"
)]
pub async fn request_vacation(
    auth: AuthUser,
    engine: web::Data<Engine>,
    payload: web::Json<VacationRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_self_or_hr(payload.user_id)?;
    let detail = engine.request_vacation(payload.into_inner(), now()).await?;
    Ok(HttpResponse::Created().json(detail))
}

/// Only the requester, and only before anyone decided.
#[utoipa::path(
    put,
    path = "/api/vacation-requests/{grant_id}/cancel",
    params(("grant_id" = u64, Path, description = "ID of the requested grant")),
    responses(
        (status = 200, description = "Request cancelled", body = crate::model::grant::Grant),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Grant not found"),
        (status = 409, description = "Not the requester or already decided")
    ),
    security(("bearer_auth" = [])),
    tag = "Approval"
)]
pub async fn cancel_request(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let grant = engine
        .cancel_vacation_request(path.into_inner(), auth.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(grant))
}

#[utoipa::path(
    get,
    path = "/api/vacation-requests/{grant_id}/approvals",
    params(("grant_id" = u64, Path, description = "ID of the requested grant")),
    responses(
        (status = 200, description = "Approval chain in decision order", body = [crate::model::approval::Approval]),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Grant not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Approval"
)]
pub async fn request_approvals(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let grant_id = path.into_inner();
    let grant = engine.get_grant(grant_id).await?;
    let approvals = engine.approvals_for_grant(grant_id).await?;
    let involved = approvals.iter().any(|a| a.approver_id == auth.user_id);
    if !involved {
        auth.require_self_or_hr(grant.user_id)?;
    }
    Ok(HttpResponse::Ok().json(approvals))
}

/* =========================
Approver inbox
========================= */
#[utoipa::path(
    get,
    path = "/api/approvals",
    responses(
        (status = 200, description = "Approvals whose turn has come for the caller", body = [crate::model::approval::Approval]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Approval"
)]
pub async fn pending_approvals(
    auth: AuthUser,
    engine: web::Data<Engine>,
) -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(engine.pending_approvals(auth.user_id).await?))
}

#[utoipa::path(
    put,
    path = "/api/approvals/{approval_id}/approve",
    params(("approval_id" = u64, Path, description = "ID of the approval step")),
    responses(
        (status = 200, description = "Step approved", body = crate::service::VacationRequestDetail),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Approval not found"),
        (status = 409, description = "Out of sequence, already decided or not the approver", body = Object, example = json!({
            "code": "APPROVAL_OUT_OF_SEQUENCE",
            "message": "An earlier approver has not decided yet"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Approval"
)]
pub async fn approve(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let detail = engine
        .approve_vacation(path.into_inner(), auth.user_id, now())
        .await?;
    Ok(HttpResponse::Ok().json(detail))
}

#[utoipa::path(
    put,
    path = "/api/approvals/{approval_id}/reject",
    params(("approval_id" = u64, Path, description = "ID of the approval step")),
    request_body(content = RejectVacation, content_type = "application/json"),
    responses(
        (status = 200, description = "Request rejected", body = crate::service::VacationRequestDetail),
        (status = 400, description = "Reason missing"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Approval not found"),
        (status = 409, description = "Out of sequence, already decided or not the approver")
    ),
    security(("bearer_auth" = [])),
    tag = "Approval"
)]
pub async fn reject(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    payload: web::Json<RejectVacation>,
) -> actix_web::Result<impl Responder> {
    let detail = engine
        .reject_vacation(path.into_inner(), auth.user_id, payload.into_inner().reason, now())
        .await?;
    Ok(HttpResponse::Ok().json(detail))
}
