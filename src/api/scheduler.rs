use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use super::{Engine, now};
use crate::auth::auth::AuthUser;

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct SweepQuery {
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    #[param(value_type = Option<String>)]
    /// Sweep as of this date, defaults to today
    pub today: Option<NaiveDate>,
}

/// Runs the due-date sweep now. Re-running for the same date issues nothing
/// twice.
#[utoipa::path(
    post,
    path = "/api/scheduler/run",
    params(SweepQuery),
    responses(
        (status = 200, description = "Sweep finished", body = crate::service::SchedulerReport),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Scheduler"
)]
pub async fn run(
    auth: AuthUser,
    engine: web::Data<Engine>,
    query: web::Query<SweepQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let now = now();
    let today = query.today.unwrap_or_else(|| now.date());
    let report = engine.run_scheduler(today, now).await?;
    Ok(HttpResponse::Ok().json(report))
}
