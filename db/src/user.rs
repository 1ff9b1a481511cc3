use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    dtos::user::UserCreateRequest,
    models::user::{TokenKind, User},
};

/// Token and expiry column names for a token kind.
fn token_columns(kind: TokenKind) -> (&'static str, &'static str) {
    match kind {
        TokenKind::Verify => ("verification_token", "verification_token_expires"),
        TokenKind::Reset => ("reset_password_token", "reset_password_expires"),
    }
}

pub async fn get_user_by_email<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    email: &str,
) -> Res<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn get_user_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn insert_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: UserCreateRequest,
) -> Res<User> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, name, password_hash)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(data.email)
    .bind(data.name)
    .bind(data.password_hash)
    .fetch_one(executor)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::Conflict("User already exists".to_string())
        }
        other => AppError::from(other),
    })
}

/// Stores a token digest and expiry, replacing any previous token of that kind.
pub async fn set_user_token<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    kind: TokenKind,
    digest: &str,
    expires_at: DateTime<Utc>,
) -> Res<()> {
    let (token_col, expires_col) = token_columns(kind);
    let query = format!(
        "UPDATE users SET {token_col} = $2, {expires_col} = $3, updated_at = NOW() WHERE id = $1"
    );
    sqlx::query(&query)
        .bind(user_id)
        .bind(digest)
        .bind(expires_at)
        .execute(executor)
        .await?;
    Ok(())
}

/// Live (unexpired) token lookup without consuming it.
pub async fn find_user_by_token<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    kind: TokenKind,
    digest: &str,
    now: DateTime<Utc>,
) -> Res<Option<User>> {
    let (token_col, expires_col) = token_columns(kind);
    let query = format!("SELECT * FROM users WHERE {token_col} = $1 AND {expires_col} > $2");
    sqlx::query_as::<_, User>(&query)
        .bind(digest)
        .bind(now)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

/// Redeems a verification token in one statement: marks the account verified
/// and clears the token. At most one concurrent caller gets the row back.
pub async fn consume_verification_token<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    digest: &str,
    now: DateTime<Utc>,
) -> Res<Option<User>> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET is_verified = TRUE,
            verification_token = NULL,
            verification_token_expires = NULL,
            updated_at = NOW()
        WHERE verification_token = $1 AND verification_token_expires > $2
        RETURNING *
        "#,
    )
    .bind(digest)
    .bind(now)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

/// Redeems a reset token in one statement: replaces the password hash and
/// clears the token.
pub async fn consume_reset_token<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    digest: &str,
    now: DateTime<Utc>,
    password_hash: &str,
) -> Res<Option<User>> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET password_hash = $3,
            reset_password_token = NULL,
            reset_password_expires = NULL,
            updated_at = NOW()
        WHERE reset_password_token = $1 AND reset_password_expires > $2
        RETURNING *
        "#,
    )
    .bind(digest)
    .bind(now)
    .bind(password_hash)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}
