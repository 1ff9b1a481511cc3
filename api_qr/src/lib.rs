use actix_web::{Scope, web};
use db::QrStore;

pub mod dtos {
    pub mod qr;
}
pub mod routes {
    pub mod dashboard;
    pub mod qr;
    pub mod resolve;
}
pub mod services {
    pub mod qr;
    pub mod resolver;
    pub mod scan_meta;
    pub mod summary;
}

/// `/qr` routes. `/qr/resolve` is public, everything else needs a session.
pub fn mount_qr<Q: QrStore>() -> Scope {
    web::scope("/qr")
        .route("/resolve", web::get().to(routes::resolve::get_resolve::<Q>))
        .route("", web::post().to(routes::qr::post_qr::<Q>))
        .route("", web::get().to(routes::qr::get_qr_codes::<Q>))
        .route("/{short_id}/scans", web::get().to(routes::qr::get_scans::<Q>))
        .route("/{short_id}", web::delete().to(routes::qr::delete_qr::<Q>))
}

pub fn configure_dashboard<Q: QrStore>(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/dashboard",
        web::get().to(routes::dashboard::get_dashboard::<Q>),
    );
}
