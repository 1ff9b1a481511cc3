use actix_web::{Scope, web};
use db::UserStore;
use mailer::Mailer;
use middleware::gate::AccessGate;

pub mod dtos {
    pub mod auth;
}
pub mod middleware {
    pub mod gate;
}
pub mod routes {
    pub mod account;
    pub mod auth;
}
pub mod services {
    pub mod auth;
    pub mod token;
    pub mod user;
    pub mod validation;
}

/// `/auth` routes: registration, sign-in, sign-out, session, reset request.
pub fn mount_auth<U: UserStore, M: Mailer>() -> Scope {
    web::scope("/auth")
        .route("/register", web::post().to(routes::auth::post_register::<U, M>))
        .route("/signin", web::get().to(routes::auth::get_signin))
        .route("/signin", web::post().to(routes::auth::post_signin::<U, M>))
        .route("/signout", web::post().to(routes::auth::post_signout))
        .route("/session", web::get().to(routes::auth::get_session))
        .route(
            "/request-reset-password",
            web::post().to(routes::auth::post_request_reset::<U, M>),
        )
}

/// Token redemption entry points, mounted at the root because they are the
/// targets of emailed links.
pub fn configure_account<U: UserStore>(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/verifyemail",
        web::get().to(routes::account::get_verify_email::<U>),
    )
    .service(
        web::resource("/reset-password")
            .route(web::get().to(routes::account::get_reset_password::<U>))
            .route(web::post().to(routes::account::post_reset_password::<U>)),
    );
}

/// Access gate. Must run after the extractor middleware.
pub fn gate_middleware() -> AccessGate {
    AccessGate
}
