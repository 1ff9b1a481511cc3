use actix_web::{Responder, web};
use common::error::Res;
use common::http::Success;
use db::UserStore;

use crate::dtos::auth::{MessageResponse, ResetPasswordRequest, TokenQuery};
use crate::services;

/// Redeems the verification link sent by email.
///
/// # Output
/// - Success: 200, the account is verified and the token is spent
/// - Error: 400 `INVALID_OR_EXPIRED_TOKEN`
pub async fn get_verify_email<U: UserStore>(
    query: web::Query<TokenQuery>,
    store: web::Data<U>,
) -> Res<impl Responder> {
    let user = services::token::redeem_verification(store.get_ref(), &query.token).await?;
    log::info!("User {} verified their email", user.id);
    Success::ok(MessageResponse::ok(
        "Email verified successfully. You can now sign in.",
    ))
}

/// Checks that a reset link is still usable, without spending it.
pub async fn get_reset_password<U: UserStore>(
    query: web::Query<TokenQuery>,
    store: web::Data<U>,
) -> Res<impl Responder> {
    services::token::check_reset_token(store.get_ref(), &query.token).await?;
    Success::ok(MessageResponse::ok(
        "Token is valid. POST a new password to reset it.",
    ))
}

/// Sets a new password using a reset token.
///
/// # Output
/// - Success: 200, password replaced and token spent
/// - Error: 400 validation errors for a weak password, 400 `INVALID_OR_EXPIRED_TOKEN`
pub async fn post_reset_password<U: UserStore>(
    req: web::Json<ResetPasswordRequest>,
    store: web::Data<U>,
) -> Res<impl Responder> {
    let user = services::token::redeem_reset(store.get_ref(), &req.token, &req.password).await?;
    log::info!("User {} reset their password", user.id);
    Success::ok(MessageResponse::ok(
        "Password reset successfully. You can now sign in.",
    ))
}
