mod cors;
mod headers;
mod health;

use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use common::env_config::Config;
use db::PgStore;
use limiter::RateLimiter;
use mailer::AppMailer;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();
    let config_data = config.clone();
    let origin = config.cors_allowed_origin.clone();

    // init logger
    if config.console_logging_enabled {
        logger::setup(config.is_production()).expect("Failed to set up logger");
    }

    // init db connection
    let store = db::setup(&config.database_url, config.is_production())
        .await
        .expect("Failed to set up database");
    let store = web::Data::new(store);

    // init outbound email
    let mailer = AppMailer::from_config(config.smtp.as_ref()).expect("Failed to set up mailer");
    if config.smtp.is_none() {
        log::warn!("SMTP_HOST not set, emails will only be logged");
    }
    let mailer = web::Data::new(mailer);

    // one limiter shared by every worker
    let rate_limiter = Arc::new(RateLimiter::new(
        config.rate_limit.max_requests,
        config.rate_limit.window(),
    ));

    log::info!(
        "Starting server on {}:{} ({})",
        config.server_host,
        config.server_port,
        config.environment
    );

    HttpServer::new(move || {
        App::new()
            .app_data(store.clone())
            .app_data(mailer.clone())
            .app_data(web::Data::new(config_data.clone()))
            .wrap(api_auth::gate_middleware()) // 6th
            .wrap(limiter::middleware(rate_limiter.clone())) // 5th
            .wrap(logger::middleware(config_data.console_logging_enabled)) // 4th
            .wrap(extractor::middleware(&config_data.jwt_config.secret)) // 3rd
            .wrap(cors::middleware(&origin)) // 2nd
            .wrap(headers::middleware()) // 1st
            .service(api_auth::mount_auth::<PgStore, AppMailer>())
            .configure(api_auth::configure_account::<PgStore>)
            .service(api_qr::mount_qr::<PgStore>())
            .configure(api_qr::configure_dashboard::<PgStore>)
            .configure(api_export::configure_export::<PgStore>)
            .configure(health::configure)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
