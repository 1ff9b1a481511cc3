use chrono::{DateTime, Utc};
use common::misc::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account record. Secrets never leave the server: the password hash and
/// token digests are skipped when serialized.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,
    #[serde(skip_serializing)]
    pub verification_token_expires: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub reset_password_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_password_expires: Option<DateTime<Utc>>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Stored role, `user` when the column holds anything unexpected.
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or_default()
    }

    /// Stored digest and expiry for the given token kind.
    pub fn token(&self, kind: TokenKind) -> (Option<&str>, Option<DateTime<Utc>>) {
        match kind {
            TokenKind::Verify => (
                self.verification_token.as_deref(),
                self.verification_token_expires,
            ),
            TokenKind::Reset => (
                self.reset_password_token.as_deref(),
                self.reset_password_expires,
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Verify,
    Reset,
}
