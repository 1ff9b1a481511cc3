use actix_web::{Responder, web};
use common::error::Res;
use common::http::Success;
use common::jwt::SessionClaims;
use db::QrStore;

use crate::dtos::qr::DashboardResponse;
use crate::services::summary;

/// Totals for the signed-in user plus their codes, newest first.
pub async fn get_dashboard<Q: QrStore>(
    claims: SessionClaims,
    store: web::Data<Q>,
) -> Res<impl Responder> {
    let qr_codes = store.list_qr_by_owner(claims.user_id()).await?;
    Success::ok(DashboardResponse {
        summary: summary::summarize(&qr_codes),
        qr_codes,
    })
}
