use std::collections::HashMap;

use api_qr::services::summary::{self, Summary};
use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use common::jwt::SessionClaims;
use db::{
    QrStore,
    models::qr::{QrCode, ScanEvent},
};
use uuid::Uuid;

/// Scans listed per code in the PDF detail pages.
pub const RECENT_SCANS: usize = 5;

#[derive(Debug, Clone)]
pub struct CodeExport {
    pub qr: QrCode,
    /// Newest first, at most [`RECENT_SCANS`].
    pub recent_scans: Vec<ScanEvent>,
}

/// Everything one owner's export contains.
#[derive(Debug, Clone)]
pub struct ExportData {
    pub owner_name: String,
    pub owner_email: String,
    pub generated_at: DateTime<Utc>,
    pub summary: Summary,
    pub codes: Vec<CodeExport>,
    /// Every scan of every exported code, newest first.
    pub scans: Vec<ScanEvent>,
}

/// Gathers the caller's codes and scans. The owner always comes from the
/// session, never from the request.
///
/// # Returns
/// `NotFound` when the caller owns no codes.
pub async fn collect_export<Q: QrStore>(store: &Q, claims: &SessionClaims) -> Res<ExportData> {
    let owner_id: Uuid = claims.user_id();
    let codes: Vec<QrCode> = store
        .list_qr_by_owner(owner_id)
        .await?
        .into_iter()
        .filter(|qr| qr.owner_id == owner_id)
        .collect();
    if codes.is_empty() {
        return Err(AppError::NotFound("No QR codes to export".to_string()));
    }

    let mut by_code: HashMap<Uuid, Vec<ScanEvent>> =
        codes.iter().map(|qr| (qr.id, Vec::new())).collect();
    let mut scans = Vec::new();
    for scan in store.list_scans_by_owner(owner_id).await? {
        if let Some(recent) = by_code.get_mut(&scan.qr_id) {
            if recent.len() < RECENT_SCANS {
                recent.push(scan.clone());
            }
            scans.push(scan);
        }
    }

    let summary = summary::summarize(&codes);
    let codes = codes
        .into_iter()
        .map(|qr| CodeExport {
            recent_scans: by_code.remove(&qr.id).unwrap_or_default(),
            qr,
        })
        .collect();

    Ok(ExportData {
        owner_name: claims.name.clone(),
        owner_email: claims.email.clone(),
        generated_at: Utc::now(),
        summary,
        codes,
        scans,
    })
}
