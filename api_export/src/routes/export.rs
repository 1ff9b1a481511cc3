use std::sync::Arc;

use actix_web::{HttpResponse, web};
use common::env_config::Config;
use common::error::{AppError, Res};
use common::http;
use common::jwt::SessionClaims;
use db::QrStore;

use crate::dtos::export::ExportQuery;
use crate::services::{
    collect,
    export::{self, ExportFormat},
};

/// Downloads the caller's QR codes and scans.
///
/// # Input
/// - `format`: `pdf` or `excel`
///
/// # Output
/// - Success: the document as an attachment (`QRData.pdf` or `qr-codes-export.xlsx`)
/// - Error: 400 unknown format, 404 nothing to export, 500 rendering failure
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/export?format=pdf', { credentials: 'include' });
/// const blob = await response.blob();
/// ```
pub async fn get_export<Q: QrStore>(
    claims: SessionClaims,
    query: web::Query<ExportQuery>,
    store: web::Data<Q>,
    config: web::Data<Arc<Config>>,
) -> Res<HttpResponse> {
    let format: ExportFormat = query
        .format
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Missing export format".to_string()))?
        .parse()?;

    let data = collect::collect_export(store.get_ref(), &claims).await?;
    let bytes = export::render(format, data, config.export_timeout()).await?;
    log::info!(
        "User {} exported {} bytes as {:?}",
        claims.sub,
        bytes.len(),
        format
    );

    Ok(http::attachment(bytes, format.content_type(), format.filename()))
}
