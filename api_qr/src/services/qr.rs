use common::{
    env_config::TokenConfig,
    error::{AppError, Res},
};
use db::{QrStore, dtos::qr::QrCreateRequest, models::qr::QrCode};
use rand::{Rng, distributions::Alphanumeric};
use uuid::Uuid;

use crate::dtos::qr::QrCreateBody;
use crate::services::resolver::{PREVIEW_SHORT_ID, redirectable};

pub const SHORT_ID_LEN: usize = 8;
pub const TITLE_MAX_LEN: usize = 200;
const DEFAULT_TITLE: &str = "Untitled QR Code";
const MAX_ID_ATTEMPTS: usize = 5;

/// Random base62 short id.
pub fn generate_short_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SHORT_ID_LEN)
        .map(char::from)
        .collect()
}

/// URL encoded into the printed code.
pub fn scan_url(config: &TokenConfig, short_id: &str, target_url: &str) -> String {
    let target: String = url::form_urlencoded::byte_serialize(target_url.as_bytes()).collect();
    format!(
        "{}/qr/resolve?shortId={}&targetUrl={}",
        config.public_base_url.trim_end_matches('/'),
        short_id,
        target
    )
}

fn validate(body: &QrCreateBody) -> Res<()> {
    let mut errors = Vec::new();
    if body.target_url.trim().is_empty() {
        errors.push("Target URL is required.".to_string());
    } else if !redirectable(body.target_url.trim()) {
        errors.push("Target URL must be an absolute http or https URL.".to_string());
    }
    if body.title.chars().count() > TITLE_MAX_LEN {
        errors.push(format!("Title must be at most {} characters long.", TITLE_MAX_LEN));
    }
    if let Some(options) = &body.options {
        if !options.is_object() {
            errors.push("Options must be a JSON object.".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

/// Saves a new QR record for `owner_id` under a fresh short id.
///
/// # Returns
/// The stored record. Short id collisions are retried a few times before
/// giving up with an internal error.
pub async fn create_qr<Q: QrStore>(store: &Q, owner_id: Uuid, body: QrCreateBody) -> Res<QrCode> {
    validate(&body)?;

    let title = match body.title.trim() {
        "" => DEFAULT_TITLE.to_string(),
        t => t.to_string(),
    };
    let text_content = body
        .text_content
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    for _ in 0..MAX_ID_ATTEMPTS {
        let short_id = generate_short_id();
        if short_id == PREVIEW_SHORT_ID {
            continue;
        }
        let data = QrCreateRequest {
            short_id,
            owner_id,
            target_url: body.target_url.trim().to_string(),
            title: title.clone(),
            text_content: text_content.clone(),
            show_title: body.show_title,
            show_text: body.show_text,
            options: body.options.clone().unwrap_or_else(|| serde_json::json!({})),
        };
        match store.insert_qr(data).await {
            Err(AppError::Conflict(_)) => log::warn!("Short id collision, retrying"),
            other => return other,
        }
    }
    Err(AppError::Internal(
        "Could not allocate a unique short id".to_string(),
    ))
}

/// Looks up a record the caller owns.
///
/// # Returns
/// `NotFound` when no record has this short id, `Forbidden` when it belongs
/// to someone else.
pub async fn owned_qr<Q: QrStore>(store: &Q, short_id: &str, owner_id: Uuid) -> Res<QrCode> {
    let qr = store
        .get_qr_by_short_id(short_id)
        .await?
        .ok_or_else(|| AppError::NotFound("QR code not found".to_string()))?;
    if qr.owner_id != owner_id {
        log::warn!("User {} tried to access QR {} they do not own", owner_id, short_id);
        return Err(AppError::Forbidden(
            "You do not have access to this QR code".to_string(),
        ));
    }
    Ok(qr)
}
