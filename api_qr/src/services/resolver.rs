use chrono::{DateTime, Utc};
use db::{QrStore, dtos::qr::ScanCreateRequest};

/// Short id used by the live preview of a code that has not been saved yet.
pub const PREVIEW_SHORT_ID: &str = "find";

#[derive(Debug, PartialEq)]
pub enum Resolution {
    Redirect(String),
    NotFound,
}

/// Accepts only absolute http(s) URLs.
pub fn redirectable(target: &str) -> bool {
    url::Url::parse(target)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false)
}

fn fallback(target: Option<&str>) -> Resolution {
    match target.map(str::trim).filter(|t| redirectable(t)) {
        Some(t) => Resolution::Redirect(t.to_string()),
        None => Resolution::NotFound,
    }
}

/// Resolves a scanned short id to the URL the scanner should land on.
///
/// A stored record always wins over the caller supplied fallback and gets
/// its scan recorded. Storage failures are logged and never stop the
/// redirect: an unreadable record degrades to the fallback, a failed scan
/// write still redirects to the stored target.
///
/// # Arguments
/// * `short_id` - Identifier from the QR payload, possibly the preview sentinel
/// * `fallback_url` - Target encoded next to it, used when there is no record
/// * `scan` - Metadata for the scan event
pub async fn resolve<Q: QrStore>(
    store: &Q,
    short_id: Option<&str>,
    fallback_url: Option<&str>,
    scan: ScanCreateRequest,
    now: DateTime<Utc>,
) -> Resolution {
    let short_id = match short_id.map(str::trim) {
        Some(id) if !id.is_empty() && id != PREVIEW_SHORT_ID => id,
        _ => return fallback(fallback_url),
    };

    let record = match store.get_qr_by_short_id(short_id).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            log::debug!("No QR record for {}, using fallback", short_id);
            return fallback(fallback_url);
        }
        Err(e) => {
            log::error!("QR lookup failed for {}: {}", short_id, e);
            return fallback(fallback_url);
        }
    };

    if let Err(e) = store.record_scan(short_id, scan, now).await {
        log::error!("Failed to record scan for {}: {}", short_id, e);
    }
    Resolution::Redirect(record.target_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_absolute_web_urls_are_redirectable() {
        assert!(redirectable("https://example.com"));
        assert!(redirectable("http://example.com/a?b=c"));
        assert!(!redirectable("/dashboard"));
        assert!(!redirectable("javascript:alert(1)"));
        assert!(!redirectable("ftp://example.com"));
        assert!(!redirectable(""));
    }

    #[test]
    fn fallback_without_a_usable_target_is_not_found() {
        assert_eq!(fallback(None), Resolution::NotFound);
        assert_eq!(fallback(Some("nope")), Resolution::NotFound);
        assert_eq!(
            fallback(Some(" https://example.com ")),
            Resolution::Redirect("https://example.com".to_string())
        );
    }
}
