use common::{
    env_config::Config,
    error::{AuthError, Res},
    jwt::{self, ClaimsSpec, SessionClaims},
    misc,
};
use db::{
    UserStore,
    models::user::{TokenKind, User},
};
use mailer::Mailer;

use crate::services::{token, user};

/// Authenticates existing user and issues a session token.
///
/// Steps run in order: lookup by normalized email (`NoSuchUser`), password
/// check (`InvalidCredentials`), verified check. An unverified account with a
/// correct password gets a fresh verification email before failing with
/// `UnverifiedAccount`.
///
/// # Arguments
///
/// * `store` - Credential store.
/// * `mailer` - Used for the verification email side effect.
/// * `config` - The application configuration.
/// * `email` - Email as typed by the user.
/// * `password` - Plain password.
///
/// # Returns
///
/// The signed token and its claims.
pub async fn authenticate<U: UserStore, M: Mailer>(
    store: &U,
    mailer: &M,
    config: &Config,
    email: &str,
    password: &str,
) -> Res<(String, SessionClaims)> {
    let email = misc::normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials.into());
    }

    let user = store
        .get_user_by_email(&email)
        .await?
        .ok_or(AuthError::NoSuchUser)?;

    if !user::verify_password(password, &user.password_hash)? {
        return Err(AuthError::InvalidCredentials.into());
    }

    if !user.is_verified {
        let sent =
            token::send_token_email(store, mailer, &config.token_config, &user, TokenKind::Verify)
                .await;
        if !sent {
            log::warn!("Verification email re-send failed for unverified user {}", user.id);
        }
        return Err(AuthError::UnverifiedAccount.into());
    }

    jwt::generate_jwt(claims_spec(&user), &config.jwt_config)
}

/// Session identity for a user. Accounts without a display name use the
/// local part of their email.
pub fn claims_spec(user: &User) -> ClaimsSpec {
    ClaimsSpec {
        user_id: user.id,
        email: user.email.clone(),
        name: user
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| misc::name_from_email(&user.email)),
        role: user.role(),
    }
}

/// Only same-site relative paths are followed after sign-in.
pub fn safe_callback(callback: Option<&str>) -> String {
    match callback {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_must_be_local() {
        assert_eq!(safe_callback(Some("/dashboard?tab=2")), "/dashboard?tab=2");
        assert_eq!(safe_callback(Some("https://evil.example")), "/");
        assert_eq!(safe_callback(Some("//evil.example")), "/");
        assert_eq!(safe_callback(None), "/");
    }
}
