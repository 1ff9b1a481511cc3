use std::future::{Ready, ready};

use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    env_config::{JwtConfig, SESSION_TTL_DAYS},
    error::{AppError, AuthError, Res},
    misc::Role,
};

/// Cookie holding the session token for browser clients.
pub const SESSION_COOKIE: &str = "session_token";

/// Identity carried by a session token. Nothing about a session is stored
/// server side; every request is re-authenticated from these claims.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionClaims {
    /// User id.
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

pub struct ClaimsSpec {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl SessionClaims {
    pub fn user_id(&self) -> Uuid {
        self.sub
    }
}

/// Generates a session token valid for [`SESSION_TTL_DAYS`] days.
pub fn generate_jwt(spec: ClaimsSpec, config: &JwtConfig) -> Res<(String, SessionClaims)> {
    let now = Utc::now();
    let claims = SessionClaims {
        sub: spec.user_id,
        email: spec.email,
        name: spec.name,
        role: spec.role,
        iat: now.timestamp(),
        exp: (now + Duration::days(SESSION_TTL_DAYS)).timestamp(),
    };

    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;
    Ok((token, claims))
}

/// Extracts claims object from a session token.
/// Rejects a bad signature or an elapsed expiry with [`AuthError::InvalidSession`].
pub fn validate_jwt(token: &str, secret: &str) -> Res<SessionClaims> {
    let mut validation = Validation::default();
    validation.leeway = 0;

    let token_data = jsonwebtoken::decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        log::debug!("Rejected session token: {}", e);
        AppError::Auth(AuthError::InvalidSession)
    })?;
    Ok(token_data.claims)
}

/// Session claims of the current request, as decoded by the extractor middleware.
impl FromRequest for SessionClaims {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let claims = match req.extensions().get::<Res<SessionClaims>>() {
            Some(Ok(claims)) => Ok(claims.clone()),
            Some(Err(_)) => Err(AppError::Auth(AuthError::InvalidSession)),
            None => Err(AppError::Unauthorized(
                "No authorization token provided".to_string(),
            )),
        };
        ready(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
        }
    }

    fn spec() -> ClaimsSpec {
        ClaimsSpec {
            user_id: Uuid::new_v4(),
            email: "ana@example.com".to_string(),
            name: "ana".to_string(),
            role: Role::User,
        }
    }

    #[test]
    fn issued_token_decodes_to_same_claims() {
        let (token, claims) = generate_jwt(spec(), &config()).unwrap();
        let decoded = validate_jwt(&token, "test-secret").unwrap();

        assert_eq!(decoded, claims);
        assert_eq!(decoded.exp - decoded.iat, SESSION_TTL_DAYS * 24 * 3600);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let (token, _) = generate_jwt(spec(), &config()).unwrap();
        let err = validate_jwt(&token, "other-secret").unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::InvalidSession)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: Uuid::new_v4(),
            email: "ana@example.com".to_string(),
            name: "ana".to_string(),
            role: Role::User,
            iat: now - 3600,
            exp: now - 60,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(validate_jwt(&token, "test-secret").is_err());
    }
}
