use actix_web::{HttpResponse, Responder, web};
use serde_json::json;

pub async fn get_health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub async fn get_home() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "name": "qrtrack",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/healthz", web::get().to(get_health))
        .route("/", web::get().to(get_home));
}
