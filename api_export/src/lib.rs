use actix_web::web;
use db::QrStore;

pub mod dtos {
    pub mod export;
}
pub mod routes {
    pub mod export;
}
pub mod services {
    pub mod collect;
    pub mod export;
    pub mod pdf;
    pub mod xlsx;
}

pub fn configure_export<Q: QrStore>(cfg: &mut web::ServiceConfig) {
    cfg.route("/export", web::get().to(routes::export::get_export::<Q>));
}
