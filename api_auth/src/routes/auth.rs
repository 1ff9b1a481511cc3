use std::sync::Arc;

use actix_web::{
    HttpResponse, Responder,
    cookie::{Cookie, SameSite, time},
    web,
};
use common::env_config::{Config, SESSION_TTL_DAYS};
use common::error::Res;
use common::http::Success;
use common::jwt::{SESSION_COOKIE, SessionClaims};
use common::misc;
use db::{UserStore, models::user::TokenKind};
use mailer::Mailer;
use serde_json::json;

use crate::dtos::auth::{
    CallbackQuery, MessageResponse, RegisterRequest, RegisterResponse, ResetRequest,
    SignInRequest, SignInResponse,
};
use crate::services;

const REGISTERED: &str = "Registration successful! A verification email has been sent to your address. It may take a few minutes to arrive. The verification link will be valid for 24 hours.";
const REGISTERED_EMAIL_DELAYED: &str = "Registration successful! We could not send the verification email right now, so it may be delayed. Sign in to receive a new verification link.";
const RESET_REQUESTED: &str =
    "If an account exists for this email, a password reset link has been sent. The link is valid for 1 hour.";

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::days(SESSION_TTL_DAYS))
        .finish()
}

/// Registers a new user with email and password authentication.
///
/// # Input
/// - `req`: JSON payload `{email, password}`
/// - `store`: Credential store
/// - `mailer`: Outbound email transport
/// - `config`: Application configuration
///
/// # Output
/// - Success: 201 with the sanitized user and whether the verification email went out
/// - Error: 400 with the validation error list, 400 for an existing unverified
///   account, 409 for an existing verified account
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/auth/register', {
///   method: 'POST',
///   headers: { 'Content-Type': 'application/json' },
///   body: JSON.stringify({ email: 'user@example.com', password: 'secure123' })
/// });
/// const { user, emailSent } = await response.json();
/// ```
pub async fn post_register<U: UserStore, M: Mailer>(
    req: web::Json<RegisterRequest>,
    store: web::Data<U>,
    mailer: web::Data<M>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let registration = services::user::register_user(
        store.get_ref(),
        mailer.get_ref(),
        &config.token_config,
        req.into_inner(),
    )
    .await?;

    let message = if registration.email_sent {
        REGISTERED
    } else {
        REGISTERED_EMAIL_DELAYED
    };

    Success::created(RegisterResponse {
        success: true,
        message: message.to_string(),
        user: registration.user,
        email_sent: registration.email_sent,
    })
}

/// Sign-in page stand-in. Echoes where the client goes after signing in.
pub async fn get_signin(query: web::Query<CallbackQuery>) -> Res<impl Responder> {
    let callback_url = services::auth::safe_callback(query.callback_url.as_deref());
    Success::ok(json!({
        "message": "POST email and password to /auth/signin to sign in",
        "callbackUrl": callback_url,
    }))
}

/// Authenticates a user with email and password.
///
/// # Input
/// - `login_data`: JSON payload `{email, password, callbackUrl?}`
///
/// # Output
/// - Success: the session token and claims, plus the `session_token` cookie
/// - Error: 401 `NO_SUCH_USER`, `INVALID_CREDENTIALS` or `UNVERIFIED_ACCOUNT`
///   (the latter also re-sends the verification email)
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/auth/signin', {
///   method: 'POST',
///   credentials: 'include',
///   headers: { 'Content-Type': 'application/json' },
///   body: JSON.stringify({ email: 'user@example.com', password: 'secure123', callbackUrl: '/dashboard' })
/// });
/// if (response.ok) {
///   const { callbackUrl } = await response.json();
///   window.location.href = callbackUrl;
/// }
/// ```
pub async fn post_signin<U: UserStore, M: Mailer>(
    login_data: web::Json<SignInRequest>,
    store: web::Data<U>,
    mailer: web::Data<M>,
    config: web::Data<Arc<Config>>,
) -> Res<HttpResponse> {
    let login = login_data.into_inner();
    let (token, claims) = services::auth::authenticate(
        store.get_ref(),
        mailer.get_ref(),
        &config,
        &login.email,
        &login.password,
    )
    .await?;
    log::info!("User {} signed in", claims.sub);

    let callback_url = services::auth::safe_callback(login.callback_url.as_deref());
    Ok(HttpResponse::Ok()
        .cookie(session_cookie(token.clone(), config.is_production()))
        .json(SignInResponse {
            token,
            user: claims,
            callback_url,
        }))
}

/// Clears the session cookie. Tokens are stateless, so a copied bearer token
/// stays valid until it expires.
pub async fn post_signout() -> Res<HttpResponse> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    Ok(HttpResponse::NoContent().cookie(cookie).finish())
}

/// Current session claims.
pub async fn get_session(claims: SessionClaims) -> Res<impl Responder> {
    Success::ok(json!({
        "user": claims,
        "expires": claims.exp,
    }))
}

/// Starts a password reset.
///
/// Always answers 202 with the same body, whether or not the account exists
/// and whether or not the email went out. Delivery failures are only logged.
pub async fn post_request_reset<U: UserStore, M: Mailer>(
    req: web::Json<ResetRequest>,
    store: web::Data<U>,
    mailer: web::Data<M>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let email = misc::normalize_email(&req.email);

    match store.get_user_by_email(&email).await {
        Ok(Some(user)) => {
            let sent = services::token::send_token_email(
                store.get_ref(),
                mailer.get_ref(),
                &config.token_config,
                &user,
                TokenKind::Reset,
            )
            .await;
            if !sent {
                log::warn!("Password reset email for user {} was not sent", user.id);
            }
        }
        Ok(None) => log::debug!("Password reset requested for unknown email"),
        Err(e) => log::error!("Password reset lookup failed: {}", e),
    }

    Success::accepted(MessageResponse::ok(RESET_REQUESTED))
}
