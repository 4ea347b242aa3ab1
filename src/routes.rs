use crate::{
    api::{approval, grant, plan, policy, scheduler, stats, usage},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::Context;
use std::sync::Arc;

pub type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Per-IP limiter allowing `requests_per_min` with a burst of the same size.
pub fn build_limiter(requests_per_min: u32) -> anyhow::Result<Limiter> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .context("invalid rate limiter settings")?;
    Ok(Arc::new(Governor::new(&cfg)))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, protected_limiter: Limiter) {
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/policies")
                    // /policies
                    .service(
                        web::resource("")
                            .route(web::post().to(policy::create_policy))
                            .route(web::get().to(policy::list_policies)),
                    )
                    // /policies/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(policy::get_policy))
                            .route(web::delete().to(policy::delete_policy)),
                    ),
            )
            .service(
                web::scope("/plans")
                    // /plans
                    .service(
                        web::resource("")
                            .route(web::post().to(plan::create_plan))
                            .route(web::get().to(plan::list_plans)),
                    )
                    // /plans/code/{code}/users/{user_id}
                    .service(
                        web::resource("/code/{code}/users/{user_id}")
                            .route(web::post().to(plan::assign_plan))
                            .route(web::delete().to(plan::revoke_plan)),
                    )
                    // /plans/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(plan::get_plan))
                            .route(web::put().to(plan::update_plan))
                            .route(web::delete().to(plan::delete_plan)),
                    )
                    // /plans/{id}/policies
                    .service(
                        web::resource("/{id}/policies")
                            .route(web::post().to(plan::add_policy))
                            .route(web::put().to(plan::replace_policies)),
                    )
                    // /plans/{id}/policies/{policy_id}
                    .service(
                        web::resource("/{id}/policies/{policy_id}")
                            .route(web::delete().to(plan::remove_policy)),
                    ),
            )
            .service(
                web::scope("/grants")
                    .service(
                        web::resource("")
                            .route(web::post().to(grant::manual_grant))
                            .route(web::get().to(grant::list_grants)),
                    )
                    .service(web::resource("/{id}").route(web::get().to(grant::grant_history)))
                    .service(
                        web::resource("/{id}/revoke").route(web::put().to(grant::revoke_grant)),
                    ),
            )
            .service(
                web::scope("/vacation-requests")
                    .service(web::resource("").route(web::post().to(approval::request_vacation)))
                    .service(
                        web::resource("/{grant_id}/cancel")
                            .route(web::put().to(approval::cancel_request)),
                    )
                    .service(
                        web::resource("/{grant_id}/approvals")
                            .route(web::get().to(approval::request_approvals)),
                    ),
            )
            .service(
                web::scope("/approvals")
                    .service(web::resource("").route(web::get().to(approval::pending_approvals)))
                    .service(
                        web::resource("/{id}/approve").route(web::put().to(approval::approve)),
                    )
                    .service(web::resource("/{id}/reject").route(web::put().to(approval::reject))),
            )
            .service(
                web::scope("/usages")
                    .service(
                        web::resource("")
                            .route(web::post().to(usage::use_vacation))
                            .route(web::get().to(usage::list_usages)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(usage::get_usage))
                            .route(web::put().to(usage::update_usage))
                            .route(web::delete().to(usage::cancel_usage)),
                    ),
            )
            .service(
                web::scope("/stats")
                    .service(web::resource("/balance").route(web::get().to(stats::balance)))
                    .service(web::resource("/usage").route(web::get().to(stats::usage))),
            )
            .service(web::resource("/scheduler/run").route(web::post().to(scheduler::run))),
    );
}
