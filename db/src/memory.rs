//! In-process store backed by `dashmap`. Every mutation happens while holding
//! the shard lock of the affected entry, which gives the same single-winner
//! guarantees as the conditional `UPDATE ... RETURNING` statements of the
//! PostgreSQL store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use dashmap::{DashMap, mapref::entry::Entry};
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
    store::{QrStore, UserStore},
};

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    users: DashMap<Uuid, User>,
    emails: DashMap<String, Uuid>,
    // keyed by short id
    qrs: DashMap<String, QrCode>,
    scans: DashMap<Uuid, Vec<ScanEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.inner.users.len()
    }

    fn user_id_with_token(&self, kind: TokenKind, digest: &str) -> Option<Uuid> {
        self.inner
            .users
            .iter()
            .find(|u| u.token(kind).0 == Some(digest))
            .map(|u| *u.key())
    }
}

fn token_is_live(user: &User, kind: TokenKind, digest: &str, now: DateTime<Utc>) -> bool {
    match user.token(kind) {
        (Some(stored), Some(expires)) => stored == digest && expires > now,
        _ => false,
    }
}

impl UserStore for MemoryStore {
    async fn get_user_by_email(&self, email: &str) -> Res<Option<User>> {
        let id = self.inner.emails.get(email).map(|id| *id);
        Ok(id.and_then(|id| self.inner.users.get(&id).map(|u| u.clone())))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> Res<Option<User>> {
        Ok(self.inner.users.get(&user_id).map(|u| u.clone()))
    }

    async fn insert_user(&self, data: UserCreateRequest) -> Res<User> {
        match self.inner.emails.entry(data.email.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict("User already exists".to_string())),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let user = User {
                    id: Uuid::new_v4(),
                    email: data.email,
                    name: data.name,
                    password_hash: data.password_hash,
                    is_verified: false,
                    verification_token: None,
                    verification_token_expires: None,
                    reset_password_token: None,
                    reset_password_expires: None,
                    role: "user".to_string(),
                    created_at: now,
                    updated_at: now,
                };
                self.inner.users.insert(user.id, user.clone());
                slot.insert(user.id);
                Ok(user)
            }
        }
    }

    async fn set_user_token(
        &self,
        user_id: Uuid,
        kind: TokenKind,
        digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Res<()> {
        let Some(mut user) = self.inner.users.get_mut(&user_id) else {
            return Err(AppError::NotFound("User not found".to_string()));
        };
        match kind {
            TokenKind::Verify => {
                user.verification_token = Some(digest.to_string());
                user.verification_token_expires = Some(expires_at);
            }
            TokenKind::Reset => {
                user.reset_password_token = Some(digest.to_string());
                user.reset_password_expires = Some(expires_at);
            }
        }
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn find_user_by_token(
        &self,
        kind: TokenKind,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Res<Option<User>> {
        Ok(self.inner.users.iter().find_map(|u| {
            token_is_live(u.value(), kind, digest, now).then(|| u.value().clone())
        }))
    }

    async fn consume_verification_token(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Res<Option<User>> {
        let Some(id) = self.user_id_with_token(TokenKind::Verify, digest) else {
            return Ok(None);
        };
        let Some(mut user) = self.inner.users.get_mut(&id) else {
            return Ok(None);
        };
        // re-checked under the write lock
        if !token_is_live(&user, TokenKind::Verify, digest, now) {
            return Ok(None);
        }
        user.is_verified = true;
        user.verification_token = None;
        user.verification_token_expires = None;
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn consume_reset_token(
        &self,
        digest: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Res<Option<User>> {
        let Some(id) = self.user_id_with_token(TokenKind::Reset, digest) else {
            return Ok(None);
        };
        let Some(mut user) = self.inner.users.get_mut(&id) else {
            return Ok(None);
        };
        if !token_is_live(&user, TokenKind::Reset, digest, now) {
            return Ok(None);
        }
        user.password_hash = password_hash.to_string();
        user.reset_password_token = None;
        user.reset_password_expires = None;
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }
}

impl QrStore for MemoryStore {
    async fn insert_qr(&self, data: QrCreateRequest) -> Res<QrCode> {
        match self.inner.qrs.entry(data.short_id.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict("shortId already taken".to_string())),
            Entry::Vacant(slot) => {
                let qr = QrCode {
                    id: Uuid::new_v4(),
                    short_id: data.short_id,
                    owner_id: data.owner_id,
                    target_url: data.target_url,
                    title: data.title,
                    text_content: data.text_content,
                    show_title: data.show_title,
                    show_text: data.show_text,
                    options: data.options,
                    scan_count: 0,
                    created_at: Utc::now(),
                    last_scanned: None,
                };
                slot.insert(qr.clone());
                Ok(qr)
            }
        }
    }

    async fn get_qr_by_short_id(&self, short_id: &str) -> Res<Option<QrCode>> {
        Ok(self.inner.qrs.get(short_id).map(|q| q.clone()))
    }

    async fn list_qr_by_owner(&self, owner_id: Uuid) -> Res<Vec<QrCode>> {
        let mut codes: Vec<QrCode> = self
            .inner
            .qrs
            .iter()
            .filter(|q| q.owner_id == owner_id)
            .map(|q| q.clone())
            .collect();
        codes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(codes)
    }

    async fn delete_qr(&self, qr_id: Uuid) -> Res<bool> {
        let short_id = self
            .inner
            .qrs
            .iter()
            .find(|q| q.id == qr_id)
            .map(|q| q.key().clone());

        let Some(short_id) = short_id else {
            return Ok(false);
        };
        let removed = self.inner.qrs.remove(&short_id).is_some();
        self.inner.scans.remove(&qr_id);
        Ok(removed)
    }

    async fn record_scan(
        &self,
        short_id: &str,
        scan: ScanCreateRequest,
        at: DateTime<Utc>,
    ) -> Res<Option<QrCode>> {
        let Some(mut qr) = self.inner.qrs.get_mut(short_id) else {
            return Ok(None);
        };
        qr.scan_count += 1;
        qr.last_scanned = Some(at);

        let event = ScanEvent {
            id: Uuid::new_v4(),
            qr_id: qr.id,
            short_id: qr.short_id.clone(),
            scanned_at: at,
            device: scan.device,
            browser: scan.browser,
            os: scan.os,
            location: scan.location,
            ip_address: scan.ip_address,
        };
        self.inner.scans.entry(qr.id).or_default().push(event);

        Ok(Some(qr.clone()))
    }

    async fn list_scans(&self, qr_id: Uuid) -> Res<Vec<ScanEvent>> {
        let mut scans = self
            .inner
            .scans
            .get(&qr_id)
            .map(|s| s.clone())
            .unwrap_or_default();
        scans.sort_by(|a, b| b.scanned_at.cmp(&a.scanned_at));
        Ok(scans)
    }

    async fn list_scans_by_owner(&self, owner_id: Uuid) -> Res<Vec<ScanEvent>> {
        let qr_ids: Vec<Uuid> = self
            .inner
            .qrs
            .iter()
            .filter(|q| q.owner_id == owner_id)
            .map(|q| q.id)
            .collect();

        let mut scans: Vec<ScanEvent> = qr_ids
            .iter()
            .filter_map(|id| self.inner.scans.get(id).map(|s| s.clone()))
            .flatten()
            .collect();
        scans.sort_by(|a, b| b.scanned_at.cmp(&a.scanned_at));
        Ok(scans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_user(email: &str) -> UserCreateRequest {
        UserCreateRequest {
            email: email.to_string(),
            name: None,
            password_hash: "hash".to_string(),
        }
    }

    fn new_qr(owner_id: Uuid, short_id: &str) -> QrCreateRequest {
        QrCreateRequest {
            short_id: short_id.to_string(),
            owner_id,
            target_url: "https://example.com".to_string(),
            title: "Menu".to_string(),
            text_content: None,
            show_title: true,
            show_text: false,
            options: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn should_reject_duplicate_email() {
        let store = MemoryStore::new();
        store.insert_user(new_user("a@x.io")).await.unwrap();

        let err = store.insert_user(new_user("a@x.io")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn should_consume_verification_token_once() {
        let store = MemoryStore::new();
        let user = store.insert_user(new_user("a@x.io")).await.unwrap();
        let now = Utc::now();
        store
            .set_user_token(user.id, TokenKind::Verify, "digest", now + Duration::hours(1))
            .await
            .unwrap();

        let first = store.consume_verification_token("digest", now).await.unwrap();
        let second = store.consume_verification_token("digest", now).await.unwrap();

        assert!(first.unwrap().is_verified);
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn should_not_consume_expired_token() {
        let store = MemoryStore::new();
        let user = store.insert_user(new_user("a@x.io")).await.unwrap();
        let now = Utc::now();
        store
            .set_user_token(user.id, TokenKind::Reset, "digest", now - Duration::seconds(1))
            .await
            .unwrap();

        let res = store.consume_reset_token("digest", now, "new-hash").await.unwrap();
        assert!(res.is_none());

        let stored = store.get_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "hash");
    }

    #[tokio::test]
    async fn should_count_every_concurrent_scan() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        store.insert_qr(new_qr(owner, "abc12345")).await.unwrap();

        let scans = (0..50).map(|_| {
            store.record_scan("abc12345", ScanCreateRequest::default(), Utc::now())
        });
        futures::future::join_all(scans).await;

        let qr = store.get_qr_by_short_id("abc12345").await.unwrap().unwrap();
        assert_eq!(qr.scan_count, 50);
        assert!(qr.last_scanned.is_some());
        assert_eq!(store.list_scans(qr.id).await.unwrap().len(), 50);
    }

    #[tokio::test]
    async fn should_scope_scans_to_owner() {
        let store = MemoryStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store.insert_qr(new_qr(a, "aaaaaaaa")).await.unwrap();
        store.insert_qr(new_qr(b, "bbbbbbbb")).await.unwrap();
        store
            .record_scan("aaaaaaaa", ScanCreateRequest::default(), Utc::now())
            .await
            .unwrap();
        store
            .record_scan("bbbbbbbb", ScanCreateRequest::default(), Utc::now())
            .await
            .unwrap();

        let scans = store.list_scans_by_owner(a).await.unwrap();
        assert_eq!(scans.len(), 1);
        assert_eq!(scans[0].short_id, "aaaaaaaa");
    }

    #[tokio::test]
    async fn should_drop_scans_with_deleted_record() {
        let store = MemoryStore::new();
        let qr = store.insert_qr(new_qr(Uuid::new_v4(), "cccccccc")).await.unwrap();
        store
            .record_scan("cccccccc", ScanCreateRequest::default(), Utc::now())
            .await
            .unwrap();

        assert!(store.delete_qr(qr.id).await.unwrap());
        assert!(store.get_qr_by_short_id("cccccccc").await.unwrap().is_none());
        assert!(store.list_scans(qr.id).await.unwrap().is_empty());
        assert!(!store.delete_qr(qr.id).await.unwrap());
    }
}
