use actix_web::{HttpResponse, Responder, web};

use super::{Engine, UserQuery, now};
use crate::auth::auth::AuthUser;
use crate::model::usage::UseVacation;

/// Books leave against the user's grants, earliest expiry first.
#[utoipa::path(
    post,
    path = "/api/usages",
    request_body(
        content = UseVacation,
        description = "Leave type, unit and time range",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Usage booked", body = crate::service::UsageReceipt),
        (status = 400, description = "Invalid range or nothing chargeable"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Business rule violated", body = Object, example = json!({
            "code": "INSUFFICIENT_BALANCE",
            "message": "Not enough remaining vacation for this request"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Usage"
)]
pub async fn use_vacation(
    auth: AuthUser,
    engine: web::Data<Engine>,
    payload: web::Json<UseVacation>,
) -> actix_web::Result<impl Responder> {
    auth.require_self_or_hr(payload.user_id)?;
    let receipt = engine.use_vacation(payload.into_inner(), now()).await?;
    Ok(HttpResponse::Created().json(receipt))
}

#[utoipa::path(
    get,
    path = "/api/usages",
    params(UserQuery),
    responses(
        (status = 200, description = "Active usages, newest first", body = [crate::model::usage::Usage]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Usage"
)]
pub async fn list_usages(
    auth: AuthUser,
    engine: web::Data<Engine>,
    query: web::Query<UserQuery>,
) -> actix_web::Result<impl Responder> {
    let user_id = auth.target_user(query.user_id)?;
    Ok(HttpResponse::Ok().json(engine.list_usages(user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/usages/{usage_id}",
    params(("usage_id" = u64, Path, description = "ID of the usage")),
    responses(
        (status = 200, description = "Usage found", body = crate::model::usage::Usage),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Usage not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Usage"
)]
pub async fn get_usage(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let usage = engine.get_usage(path.into_inner()).await?;
    auth.require_self_or_hr(usage.user_id)?;
    Ok(HttpResponse::Ok().json(usage))
}

/// Cancels the usage and books the new range; the result has a new id.
#[utoipa::path(
    put,
    path = "/api/usages/{usage_id}",
    params(("usage_id" = u64, Path, description = "ID of the usage to replace")),
    request_body(content = UseVacation, content_type = "application/json"),
    responses(
        (status = 200, description = "Usage replaced", body = crate::service::UsageReceipt),
        (status = 400, description = "Invalid range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Usage not found"),
        (status = 409, description = "Already started, cancelled or not enough balance")
    ),
    security(("bearer_auth" = [])),
    tag = "Usage"
)]
pub async fn update_usage(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    payload: web::Json<UseVacation>,
) -> actix_web::Result<impl Responder> {
    let usage_id = path.into_inner();
    let current = engine.get_usage(usage_id).await?;
    auth.require_self_or_hr(current.user_id)?;
    let receipt = engine
        .update_vacation_usage(usage_id, payload.into_inner(), now())
        .await?;
    Ok(HttpResponse::Ok().json(receipt))
}

#[utoipa::path(
    delete,
    path = "/api/usages/{usage_id}",
    params(("usage_id" = u64, Path, description = "ID of the usage to cancel")),
    responses(
        (status = 200, description = "Usage cancelled and balance restored", body = crate::model::usage::Usage),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Usage not found"),
        (status = 409, description = "Already started or already cancelled", body = Object, example = json!({
            "code": "CANCEL_AFTER_START",
            "message": "Vacation that has already started cannot be cancelled"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Usage"
)]
pub async fn cancel_usage(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let usage_id = path.into_inner();
    let current = engine.get_usage(usage_id).await?;
    auth.require_self_or_hr(current.user_id)?;
    let usage = engine.cancel_vacation_usage(usage_id, now()).await?;
    Ok(HttpResponse::Ok().json(usage))
}
