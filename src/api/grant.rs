use actix_web::{HttpResponse, Responder, web};

use super::{Engine, UserQuery, now};
use crate::auth::auth::AuthUser;
use crate::model::grant::ManualGrant;

/// Issues a grant under a MANUAL policy.
#[utoipa::path(
    post,
    path = "/api/grants",
    request_body(
        content = ManualGrant,
        description = "Manual grant; dates default to the policy's rules",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Grant issued", body = crate::model::grant::Grant),
        (status = 400, description = "Invalid amount or dates"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Policy or user not found"),
        (status = 409, description = "Policy is not MANUAL or is deleted")
    ),
    security(("bearer_auth" = [])),
    tag = "Grant"
)]
pub async fn manual_grant(
    auth: AuthUser,
    engine: web::Data<Engine>,
    payload: web::Json<ManualGrant>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let grant = engine
        .manual_grant_vacation(payload.into_inner(), now())
        .await?;
    Ok(HttpResponse::Created().json(grant))
}

#[utoipa::path(
    get,
    path = "/api/grants",
    params(UserQuery),
    responses(
        (status = 200, description = "All grants of the user", body = [crate::model::grant::Grant]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Grant"
)]
pub async fn list_grants(
    auth: AuthUser,
    engine: web::Data<Engine>,
    query: web::Query<UserQuery>,
) -> actix_web::Result<impl Responder> {
    let user_id = auth.target_user(query.user_id)?;
    Ok(HttpResponse::Ok().json(engine.list_grants(user_id).await?))
}

/// A grant with the deductions still drawn from it.
#[utoipa::path(
    get,
    path = "/api/grants/{grant_id}",
    params(("grant_id" = u64, Path, description = "ID of the grant")),
    responses(
        (status = 200, description = "Grant history", body = crate::vacation::stats::GrantHistory),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Grant not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Grant"
)]
pub async fn grant_history(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let history = engine.grant_history(path.into_inner()).await?;
    auth.require_self_or_hr(history.grant.user_id)?;
    Ok(HttpResponse::Ok().json(history))
}

#[utoipa::path(
    put,
    path = "/api/grants/{grant_id}/revoke",
    params(("grant_id" = u64, Path, description = "ID of the grant to revoke")),
    responses(
        (status = 200, description = "Grant revoked", body = crate::model::grant::Grant),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Grant not found"),
        (status = 409, description = "Grant is not active or has been used", body = Object, example = json!({
            "code": "REVOKE_AFTER_USE",
            "message": "A grant that has been used cannot be revoked"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Grant"
)]
pub async fn revoke_grant(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let grant = engine.revoke_vacation_grant(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(grant))
}
