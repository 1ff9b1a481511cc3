use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier},
};
use common::env_config::TokenConfig;
use common::error::{AppError, Res};
use common::misc;
use db::UserStore;
use db::dtos::user::UserCreateRequest;
use db::models::user::{TokenKind, User};
use mailer::Mailer;

use crate::dtos::auth::RegisterRequest;
use crate::services::{token, validation};

/// Result of a registration: the account exists either way, the email may not.
pub struct Registration {
    pub user: User,
    pub email_sent: bool,
}

pub fn hash_password(password: &str) -> Res<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Constant time comparison of `password` against a stored PHC hash.
pub fn verify_password(password: &str, password_hash: &str) -> Res<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| AppError::Internal(format!("Stored password hash is malformed: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Creates an unverified account and sends its verification email.
///
/// An existing unverified account answers 400 and a verified one 409. The
/// account is created even when the email cannot be sent; the failure is
/// reported through [`Registration::email_sent`].
///
/// # Arguments
///
/// * `store` - Credential store.
/// * `mailer` - Outbound email transport.
/// * `config` - Token configuration.
/// * `req` - Registration payload.
///
/// # Returns
///
/// A `Result` containing the [`Registration`] or an `AppError` if an error occurs.
pub async fn register_user<U: UserStore, M: Mailer>(
    store: &U,
    mailer: &M,
    config: &TokenConfig,
    req: RegisterRequest,
) -> Res<Registration> {
    let email = misc::normalize_email(&req.email);
    validation::validate_registration(&email, &req.password)?;

    if let Some(existing) = store.get_user_by_email(&email).await? {
        return Err(if existing.is_verified {
            AppError::Conflict("User already exists".to_string())
        } else {
            AppError::BadRequest(
                "Your account is not verified yet. Please verify your account via email."
                    .to_string(),
            )
        });
    }

    let user = store
        .insert_user(UserCreateRequest {
            email,
            name: None,
            password_hash: hash_password(&req.password)?,
        })
        .await?;
    log::info!("Registered user {}", user.id);

    let email_sent = token::send_token_email(store, mailer, config, &user, TokenKind::Verify).await;

    Ok(Registration { user, email_sent })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_only_the_original_password() {
        let hash = hash_password("abc12345").unwrap();
        assert!(verify_password("abc12345", &hash).unwrap());
        assert!(!verify_password("abc123456", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_internal_error() {
        assert!(matches!(
            verify_password("abc12345", "not-a-phc-string"),
            Err(AppError::Internal(_))
        ));
    }
}
