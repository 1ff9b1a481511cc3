use db::models::qr::QrCode;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MostScanned {
    pub short_id: String,
    pub title: String,
    pub scan_count: i64,
}

/// Aggregate figures over one owner's codes.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_codes: usize,
    pub total_scans: i64,
    /// Rounded to two decimals; zero when there are no codes.
    pub average_scans: f64,
    pub most_scanned: Option<MostScanned>,
}

pub fn summarize(codes: &[QrCode]) -> Summary {
    let total_codes = codes.len();
    let total_scans: i64 = codes.iter().map(|qr| qr.scan_count).sum();
    let average_scans = if total_codes == 0 {
        0.0
    } else {
        (total_scans as f64 / total_codes as f64 * 100.0).round() / 100.0
    };

    // first of the top scorers in list order, so ties go to the newest
    let most_scanned = codes
        .iter()
        .filter(|qr| qr.scan_count > 0)
        .fold(None::<&QrCode>, |best, qr| match best {
            Some(b) if b.scan_count >= qr.scan_count => Some(b),
            _ => Some(qr),
        })
        .map(|qr| MostScanned {
            short_id: qr.short_id.clone(),
            title: qr.title.clone(),
            scan_count: qr.scan_count,
        });

    Summary {
        total_codes,
        total_scans,
        average_scans,
        most_scanned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn code(short_id: &str, scans: i64) -> QrCode {
        QrCode {
            id: Uuid::new_v4(),
            short_id: short_id.to_string(),
            owner_id: Uuid::nil(),
            target_url: "https://example.com".to_string(),
            title: short_id.to_uppercase(),
            text_content: None,
            show_title: true,
            show_text: false,
            options: serde_json::json!({}),
            scan_count: scans,
            created_at: Utc::now(),
            last_scanned: None,
        }
    }

    #[test]
    fn empty_summary_has_no_average() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_codes, 0);
        assert_eq!(summary.average_scans, 0.0);
        assert!(summary.most_scanned.is_none());
    }

    #[test]
    fn totals_and_top_code() {
        let summary = summarize(&[code("a", 1), code("b", 4), code("c", 4), code("d", 0)]);
        assert_eq!(summary.total_codes, 4);
        assert_eq!(summary.total_scans, 9);
        assert_eq!(summary.average_scans, 2.25);
        assert_eq!(summary.most_scanned.unwrap().short_id, "b");
    }

    #[test]
    fn unscanned_codes_have_no_top_code() {
        assert!(summarize(&[code("a", 0)]).most_scanned.is_none());
    }
}
