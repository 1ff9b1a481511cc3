#![allow(async_fn_in_trait)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::error::Res;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    dtos::{
        qr::{QrCreateRequest, ScanCreateRequest},
        user::UserCreateRequest,
    },
    models::{
        qr::{QrCode, ScanEvent},
        user::{TokenKind, User},
    },
    qr, user,
};

/// Credential store.
pub trait UserStore: Send + Sync + 'static {
    async fn get_user_by_email(&self, email: &str) -> Res<Option<User>>;
    async fn get_user_by_id(&self, user_id: Uuid) -> Res<Option<User>>;

    /// Fails with `Conflict` when the email is taken.
    async fn insert_user(&self, data: UserCreateRequest) -> Res<User>;

    async fn set_user_token(
        &self,
        user_id: Uuid,
        kind: TokenKind,
        digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Res<()>;

    async fn find_user_by_token(
        &self,
        kind: TokenKind,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Res<Option<User>>;

    /// Atomically verifies the account holding this live token and clears it.
    async fn consume_verification_token(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Res<Option<User>>;

    /// Atomically rotates the password of the account holding this live token and clears it.
    async fn consume_reset_token(
        &self,
        digest: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Res<Option<User>>;
}

/// QR records and their scan history.
pub trait QrStore: Send + Sync + 'static {
    /// Fails with `Conflict` when the short id is taken.
    async fn insert_qr(&self, data: QrCreateRequest) -> Res<QrCode>;
    async fn get_qr_by_short_id(&self, short_id: &str) -> Res<Option<QrCode>>;
    /// Newest first.
    async fn list_qr_by_owner(&self, owner_id: Uuid) -> Res<Vec<QrCode>>;
    /// Deletes the record and its scan events.
    async fn delete_qr(&self, qr_id: Uuid) -> Res<bool>;

    /// Atomic increment of `scan_count`, sets `last_scanned` and appends an event.
    async fn record_scan(
        &self,
        short_id: &str,
        scan: ScanCreateRequest,
        at: DateTime<Utc>,
    ) -> Res<Option<QrCode>>;

    /// Newest first.
    async fn list_scans(&self, qr_id: Uuid) -> Res<Vec<ScanEvent>>;
    /// Newest first.
    async fn list_scans_by_owner(&self, owner_id: Uuid) -> Res<Vec<ScanEvent>>;
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl UserStore for PgStore {
    async fn get_user_by_email(&self, email: &str) -> Res<Option<User>> {
        user::get_user_by_email(self.pool(), email).await
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> Res<Option<User>> {
        user::get_user_by_id(self.pool(), user_id).await
    }

    async fn insert_user(&self, data: UserCreateRequest) -> Res<User> {
        user::insert_user(self.pool(), data).await
    }

    async fn set_user_token(
        &self,
        user_id: Uuid,
        kind: TokenKind,
        digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Res<()> {
        user::set_user_token(self.pool(), user_id, kind, digest, expires_at).await
    }

    async fn find_user_by_token(
        &self,
        kind: TokenKind,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Res<Option<User>> {
        user::find_user_by_token(self.pool(), kind, digest, now).await
    }

    async fn consume_verification_token(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Res<Option<User>> {
        user::consume_verification_token(self.pool(), digest, now).await
    }

    async fn consume_reset_token(
        &self,
        digest: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Res<Option<User>> {
        user::consume_reset_token(self.pool(), digest, now, password_hash).await
    }
}

impl QrStore for PgStore {
    async fn insert_qr(&self, data: QrCreateRequest) -> Res<QrCode> {
        qr::insert_qr(self.pool(), data).await
    }

    async fn get_qr_by_short_id(&self, short_id: &str) -> Res<Option<QrCode>> {
        qr::get_qr_by_short_id(self.pool(), short_id).await
    }

    async fn list_qr_by_owner(&self, owner_id: Uuid) -> Res<Vec<QrCode>> {
        qr::list_qr_by_owner(self.pool(), owner_id).await
    }

    async fn delete_qr(&self, qr_id: Uuid) -> Res<bool> {
        qr::delete_qr(self.pool(), qr_id).await
    }

    async fn record_scan(
        &self,
        short_id: &str,
        scan: ScanCreateRequest,
        at: DateTime<Utc>,
    ) -> Res<Option<QrCode>> {
        qr::record_scan(self.pool(), short_id, scan, at).await
    }

    async fn list_scans(&self, qr_id: Uuid) -> Res<Vec<ScanEvent>> {
        qr::list_scans(self.pool(), qr_id).await
    }

    async fn list_scans_by_owner(&self, owner_id: Uuid) -> Res<Vec<ScanEvent>> {
        qr::list_scans_by_owner(self.pool(), owner_id).await
    }
}
