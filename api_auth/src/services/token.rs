use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use common::{
    env_config::TokenConfig,
    error::{AuthError, Res},
};
use db::{
    UserStore,
    models::user::{TokenKind, User},
};
use mailer::{MailError, Mailer, templates};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::services::user;

/// Outcome of the email send attached to a token issuance.
pub type Delivery = Result<(), MailError>;

pub fn token_ttl(kind: TokenKind) -> Duration {
    match kind {
        TokenKind::Verify => Duration::hours(24),
        TokenKind::Reset => Duration::hours(1),
    }
}

/// Generates a raw token and the digest that gets stored.
///
/// The raw token is a SHA-256 over the user id, the server secret, the issuance
/// time and 16 random bytes. Only its own SHA-256 digest is persisted, so a
/// leaked users table does not yield redeemable tokens.
pub fn generate_token(user_id: Uuid, secret: &str, issued_at: DateTime<Utc>) -> (String, String) {
    let salt: [u8; 16] = rand::random();

    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(secret.as_bytes());
    hasher.update(issued_at.timestamp_nanos_opt().unwrap_or_default().to_be_bytes());
    hasher.update(salt);
    let raw = URL_SAFE_NO_PAD.encode(hasher.finalize());

    let digest = token_digest(&raw);
    (raw, digest)
}

pub fn token_digest(raw: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(raw.as_bytes()))
}

pub fn token_link(config: &TokenConfig, kind: TokenKind, raw: &str) -> String {
    let base = config.public_base_url.trim_end_matches('/');
    match kind {
        TokenKind::Verify => format!("{}/verifyemail?token={}", base, raw),
        TokenKind::Reset => format!("{}/reset-password?token={}", base, raw),
    }
}

/// Stores a fresh token of `kind` for `user` and emails the link.
///
/// Storage failures are errors. A failed or timed out send is returned as the
/// [`Delivery`] value so the caller decides how to report it.
///
/// # Arguments
///
/// * `store` - Credential store.
/// * `mailer` - Outbound email transport.
/// * `config` - Token secret, link base URL and email timeout.
/// * `user` - Account the token is tied to.
/// * `kind` - Verify (24 hours) or Reset (1 hour).
pub async fn issue_token<U: UserStore, M: Mailer>(
    store: &U,
    mailer: &M,
    config: &TokenConfig,
    user: &User,
    kind: TokenKind,
) -> Res<Delivery> {
    let now = Utc::now();
    let (raw, digest) = generate_token(user.id, &config.secret, now);
    store
        .set_user_token(user.id, kind, &digest, now + token_ttl(kind))
        .await?;

    let link = token_link(config, kind, &raw);
    let email = match kind {
        TokenKind::Verify => templates::verification_email(&user.email, &link),
        TokenKind::Reset => templates::reset_password_email(&user.email, &link),
    };

    let delivery = mailer::send_within(mailer, &email, config.email_timeout()).await;
    if let Err(e) = &delivery {
        log::warn!("Could not send {:?} email to {}: {}", kind, user.email, e);
    }
    Ok(delivery)
}

/// [`issue_token`] for flows that must finish whatever happens to the email.
///
/// # Returns
/// Whether the email went out. A failure to store the token is logged and
/// reported as not sent.
pub async fn send_token_email<U: UserStore, M: Mailer>(
    store: &U,
    mailer: &M,
    config: &TokenConfig,
    user: &User,
    kind: TokenKind,
) -> bool {
    match issue_token(store, mailer, config, user, kind).await {
        Ok(delivery) => delivery.is_ok(),
        Err(e) => {
            log::error!("Could not store {:?} token for user {}: {}", kind, user.id, e);
            false
        }
    }
}

/// Redeems a verification token: the account becomes verified and the token is cleared.
pub async fn redeem_verification<U: UserStore>(store: &U, raw: &str) -> Res<User> {
    if raw.is_empty() {
        return Err(AuthError::InvalidOrExpiredToken.into());
    }
    store
        .consume_verification_token(&token_digest(raw), Utc::now())
        .await?
        .ok_or_else(|| AuthError::InvalidOrExpiredToken.into())
}

/// Redeems a reset token with a new password. The password is validated and
/// hashed before the token is consumed.
pub async fn redeem_reset<U: UserStore>(store: &U, raw: &str, new_password: &str) -> Res<User> {
    if raw.is_empty() {
        return Err(AuthError::InvalidOrExpiredToken.into());
    }
    crate::services::validation::validate_password(new_password)?;
    let password_hash = user::hash_password(new_password)?;

    store
        .consume_reset_token(&token_digest(raw), Utc::now(), &password_hash)
        .await?
        .ok_or_else(|| AuthError::InvalidOrExpiredToken.into())
}

/// Checks a reset token is live without consuming it.
pub async fn check_reset_token<U: UserStore>(store: &U, raw: &str) -> Res<()> {
    if raw.is_empty() {
        return Err(AuthError::InvalidOrExpiredToken.into());
    }
    store
        .find_user_by_token(TokenKind::Reset, &token_digest(raw), Utc::now())
        .await?
        .map(|_| ())
        .ok_or_else(|| AuthError::InvalidOrExpiredToken.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_url_safe() {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let (a, _) = generate_token(id, "secret", now);
        let (b, _) = generate_token(id, "secret", now);

        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn digest_is_stable_and_differs_from_raw() {
        let (raw, digest) = generate_token(Uuid::new_v4(), "secret", Utc::now());
        assert_eq!(token_digest(&raw), digest);
        assert_ne!(raw, digest);
    }

    #[test]
    fn links_point_at_redemption_routes() {
        let config = TokenConfig {
            secret: "s".into(),
            public_base_url: "https://qr.example.com/".into(),
            email_timeout_secs: 1,
        };
        assert_eq!(
            token_link(&config, TokenKind::Verify, "abc"),
            "https://qr.example.com/verifyemail?token=abc"
        );
        assert_eq!(
            token_link(&config, TokenKind::Reset, "abc"),
            "https://qr.example.com/reset-password?token=abc"
        );
    }

    #[test]
    fn ttl_per_kind() {
        assert_eq!(token_ttl(TokenKind::Verify), Duration::hours(24));
        assert_eq!(token_ttl(TokenKind::Reset), Duration::hours(1));
    }
}
