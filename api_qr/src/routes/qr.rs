use std::sync::Arc;

use actix_web::{HttpResponse, Responder, web};
use common::env_config::Config;
use common::error::Res;
use common::http::Success;
use common::jwt::SessionClaims;
use db::QrStore;

use crate::dtos::qr::{QrCreateBody, QrCreatedResponse};
use crate::services;

/// Saves a QR code for the signed-in user.
///
/// # Input
/// - `req`: JSON payload `{targetUrl, title, textContent?, showTitle?, showText?, options?}`
///
/// # Output
/// - Success: 201 with the record and the `scanUrl` to encode
/// - Error: 400 with the validation error list
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/qr', {
///   method: 'POST',
///   credentials: 'include',
///   headers: { 'Content-Type': 'application/json' },
///   body: JSON.stringify({ targetUrl: 'https://example.com', title: 'Flyer' })
/// });
/// const { shortId, scanUrl } = await response.json();
/// ```
pub async fn post_qr<Q: QrStore>(
    claims: SessionClaims,
    req: web::Json<QrCreateBody>,
    store: web::Data<Q>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let qr = services::qr::create_qr(store.get_ref(), claims.user_id(), req.into_inner()).await?;
    log::info!("User {} created QR {}", claims.sub, qr.short_id);

    let scan_url = services::qr::scan_url(&config.token_config, &qr.short_id, &qr.target_url);
    Success::created(QrCreatedResponse { qr, scan_url })
}

/// The caller's QR codes, newest first.
pub async fn get_qr_codes<Q: QrStore>(
    claims: SessionClaims,
    store: web::Data<Q>,
) -> Res<impl Responder> {
    let codes = store.list_qr_by_owner(claims.user_id()).await?;
    Success::ok(codes)
}

/// Scan history of one of the caller's codes, newest first.
pub async fn get_scans<Q: QrStore>(
    claims: SessionClaims,
    path: web::Path<String>,
    store: web::Data<Q>,
) -> Res<impl Responder> {
    let qr = services::qr::owned_qr(store.get_ref(), &path, claims.user_id()).await?;
    let scans = store.list_scans(qr.id).await?;
    Success::ok(scans)
}

/// Deletes one of the caller's codes along with its scans.
///
/// # Output
/// - Success: 204
/// - Error: 404 unknown short id, 403 owned by another user
pub async fn delete_qr<Q: QrStore>(
    claims: SessionClaims,
    path: web::Path<String>,
    store: web::Data<Q>,
) -> Res<HttpResponse> {
    let qr = services::qr::owned_qr(store.get_ref(), &path, claims.user_id()).await?;
    store.delete_qr(qr.id).await?;
    log::info!("User {} deleted QR {}", claims.sub, qr.short_id);
    Success::no_content()
}
