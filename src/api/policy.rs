use actix_web::{HttpResponse, Responder, web};

use super::{Engine, now};
use crate::auth::auth::AuthUser;
use crate::model::policy::NewPolicy;

/// Swagger doc for create_policy endpoint
#[utoipa::path(
    post,
    path = "/api/policies",
    request_body(
        content = NewPolicy,
        description = "Policy definition",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Policy created", body = crate::model::policy::Policy),
        (status = 400, description = "Invalid policy definition"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Policy"
)]
pub async fn create_policy(
    auth: AuthUser,
    engine: web::Data<Engine>,
    payload: web::Json<NewPolicy>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let policy = engine.create_policy(payload.into_inner(), now()).await?;
    Ok(HttpResponse::Created().json(policy))
}

/// Swagger doc for list_policies endpoint
#[utoipa::path(
    get,
    path = "/api/policies",
    responses(
        (status = 200, description = "Policies that are not deleted", body = [crate::model::policy::Policy]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Policy"
)]
pub async fn list_policies(
    _auth: AuthUser,
    engine: web::Data<Engine>,
) -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(engine.list_policies().await?))
}

#[utoipa::path(
    get,
    path = "/api/policies/{policy_id}",
    params(
        ("policy_id" = u64, Path, description = "ID of the policy")
    ),
    responses(
        (status = 200, description = "Policy found", body = crate::model::policy::Policy),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Policy not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Policy"
)]
pub async fn get_policy(
    _auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(engine.get_policy(path.into_inner()).await?))
}

/// Soft-deletes a policy and revokes its grants that still hold a balance.
#[utoipa::path(
    delete,
    path = "/api/policies/{policy_id}",
    params(
        ("policy_id" = u64, Path, description = "ID of the policy to delete")
    ),
    responses(
        (status = 200, description = "Policy deleted", body = Object, example = json!({
            "message": "Policy deleted",
            "revoked_grants": 3
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Policy not found"),
        (status = 409, description = "Policy is not deletable or already deleted")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Policy"
)]
pub async fn delete_policy(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let revoked = engine.delete_policy(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Policy deleted",
        "revoked_grants": revoked
    })))
}
