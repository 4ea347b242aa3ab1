use std::time::Duration;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use dotenvy::dotenv;

mod api;
mod auth;
mod config;
mod db;
mod directory;
mod docs;
mod error;
mod model;
mod models;
mod repository;
mod routes;
mod service;
mod vacation;

use config::Config;
use db::init_db;

use crate::api::Engine;
use crate::directory::{CachedDirectory, MySqlDirectory};
use crate::docs::ApiDoc;
use crate::repository::mysql::MySqlStore;
use crate::service::VacationEngine;
use tracing::{error, info};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "HRM vacation service"
}

/// Runs the recurring-grant sweep on a fixed interval for the life of the
/// process. The first tick fires immediately, catching up after downtime.
fn spawn_scheduler(engine: Data<Engine>, every: Duration) {
    actix_web::rt::spawn(async move {
        let mut ticker = actix_web::rt::time::interval(every);
        loop {
            ticker.tick().await;
            let now = api::now();
            match engine.run_scheduler(now.date(), now).await {
                Ok(report) => info!(
                    expired = report.expired,
                    materialized = report.materialized,
                    failed = report.failed,
                    "Scheduler sweep finished"
                ),
                Err(e) => error!(error = %e, "Scheduler sweep failed"),
            }
        }
    });
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await?;

    let directory = CachedDirectory::new(
        MySqlDirectory::new(pool.clone()),
        Duration::from_secs(config.holiday_cache_ttl_secs),
    );
    let engine: Data<Engine> = Data::new(VacationEngine::new(MySqlStore::new(pool), directory));

    spawn_scheduler(
        engine.clone(),
        Duration::from_secs(config.scheduler_interval_secs.max(1)),
    );

    let protected_limiter = routes::build_limiter(config.rate_protected_per_min)?;
    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(engine.clone())
            .app_data(config_data.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, &config_data, protected_limiter.clone()))
    })
    .bind(&server_addr)
    .with_context(|| format!("cannot bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
