use actix_web::{HttpMessage, HttpRequest, HttpResponse, web};
use chrono::Utc;
use common::{
    error::{AppError, Res},
    http,
    misc::ClientAddress,
};
use db::QrStore;

use crate::dtos::qr::ResolveQuery;
use crate::services::{
    resolver::{self, Resolution},
    scan_meta,
};

/// Scan target of every printed code. Reachable without a session.
///
/// # Input
/// - `shortId`: Identifier of the saved record, or `find` for an unsaved preview
/// - `targetUrl`: Destination used when there is no saved record
///
/// # Output
/// - 302 to the stored target (scan recorded) or to `targetUrl`
/// - 404 when neither is usable
pub async fn get_resolve<Q: QrStore>(
    req: HttpRequest,
    query: web::Query<ResolveQuery>,
    store: web::Data<Q>,
) -> Res<HttpResponse> {
    let client = req.extensions().get::<ClientAddress>().map(|c| c.0.clone());
    let scan = scan_meta::scan_metadata(req.headers(), client);

    let resolution = resolver::resolve(
        store.get_ref(),
        query.short_id.as_deref(),
        query.target_url.as_deref(),
        scan,
        Utc::now(),
    )
    .await;

    match resolution {
        Resolution::Redirect(location) => Ok(http::found(&location)),
        Resolution::NotFound => Err(AppError::NotFound("QR code not found".to_string())),
    }
}
