use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use super::{Engine, now};
use crate::auth::auth::AuthUser;

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BalanceQuery {
    #[schema(example = 1000)]
    /// Defaults to the caller
    pub user_id: Option<u64>,
    #[schema(example = "2026-06-01", format = "date", value_type = Option<String>)]
    #[param(value_type = Option<String>)]
    /// Reference date, defaults to today
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct UsageQuery {
    #[schema(example = 1000)]
    /// Defaults to the caller
    pub user_id: Option<u64>,
    #[schema(example = 2026)]
    /// Calendar year, defaults to the current one
    pub year: Option<i32>,
}

#[utoipa::path(
    get,
    path = "/api/stats/balance",
    params(BalanceQuery),
    responses(
        (status = 200, description = "Balance per leave type", body = [crate::vacation::stats::BalanceSummary]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Stats"
)]
pub async fn balance(
    auth: AuthUser,
    engine: web::Data<Engine>,
    query: web::Query<BalanceQuery>,
) -> actix_web::Result<impl Responder> {
    let user_id = auth.target_user(query.user_id)?;
    let today = query.date.unwrap_or_else(|| now().date());
    Ok(HttpResponse::Ok().json(engine.balance_summary(user_id, today).await?))
}

#[utoipa::path(
    get,
    path = "/api/stats/usage",
    params(UsageQuery),
    responses(
        (status = 200, description = "Usage per leave type", body = [crate::vacation::stats::UsageSummary]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Stats"
)]
pub async fn usage(
    auth: AuthUser,
    engine: web::Data<Engine>,
    query: web::Query<UsageQuery>,
) -> actix_web::Result<impl Responder> {
    let user_id = auth.target_user(query.user_id)?;
    let year = query.year.unwrap_or_else(|| now().year());
    Ok(HttpResponse::Ok().json(engine.usage_summary(user_id, year).await?))
}
