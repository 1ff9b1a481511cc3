use actix_web::{HttpResponse, http::StatusCode};
use thiserror::Error;

pub type Res<T> = std::result::Result<T, AppError>;

/// Named failure causes of the credential and token flows.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("Email and password are required")]
    MissingCredentials,

    #[error("No user found with this email")]
    NoSuchUser,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Please verify your email first. A new verification email has been sent.")]
    UnverifiedAccount,

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("Invalid or expired session")]
    InvalidSession,
}

impl AuthError {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "MISSING_CREDENTIALS",
            AuthError::NoSuchUser => "NO_SUCH_USER",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::UnverifiedAccount => "UNVERIFIED_ACCOUNT",
            AuthError::InvalidOrExpiredToken => "INVALID_OR_EXPIRED_TOKEN",
            AuthError::InvalidSession => "INVALID_SESSION",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingCredentials | AuthError::InvalidOrExpiredToken => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    // === CONVERSION ERRORS ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("Document error: {0}")]
    Document(String),

    // === APPLICATION ERRORS ===
    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("Authorization error: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Too Many Requests: {0}")]
    TooManyRequests(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Database(_) | AppError::Jwt(_) | AppError::Mail(_) | AppError::Document(_) => {
                "DEPENDENCY"
            }
            AppError::Validation(_) => "VALIDATION",
            AppError::Auth(auth) => auth.kind(),
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::TooManyRequests(_) => "RATE_LIMITED",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_)
            | AppError::Jwt(_)
            | AppError::Mail(_)
            | AppError::Document(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(auth) => auth.status(),
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    pub fn to_http_response(&self) -> HttpResponse {
        let kind = self.kind();

        match self {
            // === CONVERSION ERRORS ===
            AppError::Database(error) => {
                log::error!("Database error: {}", error);
                dependency_response(kind)
            }
            AppError::Jwt(error) => {
                log::error!("JWT error: {}", error);
                dependency_response(kind)
            }
            AppError::Mail(error) => {
                log::error!("Mail error: {}", error);
                dependency_response(kind)
            }
            AppError::Document(error) => {
                log::error!("Document error: {}", error);
                dependency_response(kind)
            }
            AppError::Internal(error) => {
                log::error!("Internal error: {}", error);
                HttpResponse::InternalServerError()
                    .json(serde_json::json!({ "kind": kind, "error": "Internal server error" }))
            }

            // === APPLICATION ERRORS ===
            AppError::Validation(errors) => HttpResponse::BadRequest().json(serde_json::json!({
                "kind": kind,
                "error": self.to_string(),
                "errors": errors,
            })),
            _ => HttpResponse::build(self.status())
                .json(serde_json::json!({ "kind": kind, "error": self.to_string() })),
        }
    }
}

fn dependency_response(kind: &str) -> HttpResponse {
    HttpResponse::InternalServerError().json(serde_json::json!({
        "kind": kind,
        "error": "Something went wrong, please try again later",
    }))
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        self.to_http_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let resp = err.to_http_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn validation_lists_every_violation() {
        let (status, body) = body_json(AppError::Validation(vec![
            "email is invalid".into(),
            "password is too short".into(),
        ]))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "VALIDATION");
        assert_eq!(body["errors"].as_array().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn dependency_detail_is_not_exposed() {
        let (status, body) = body_json(AppError::Mail("smtp.example.com refused AUTH".into())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["kind"], "DEPENDENCY");
        assert!(!body["error"].as_str().unwrap().contains("smtp"));
    }

    #[actix_web::test]
    async fn auth_errors_keep_their_message() {
        let (status, body) = body_json(AuthError::UnverifiedAccount.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["kind"], "UNVERIFIED_ACCOUNT");

        let (status, body) = body_json(AuthError::InvalidOrExpiredToken.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid or expired token");
    }

    #[test]
    fn rate_limit_maps_to_429() {
        let err = AppError::TooManyRequests("slow down".into());
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.kind(), "RATE_LIMITED");
    }
}
