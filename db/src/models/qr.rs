use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCode {
    pub id: Uuid,
    pub short_id: String,
    pub owner_id: Uuid,
    pub target_url: String,
    pub title: String,
    pub text_content: Option<String>,
    pub show_title: bool,
    pub show_text: bool,
    /// Styling options (colors, shapes, margin), stored verbatim.
    pub options: serde_json::Value,
    pub scan_count: i64,
    pub created_at: DateTime<Utc>,
    pub last_scanned: Option<DateTime<Utc>>,
}

/// One resolved scan. Append-only.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanEvent {
    pub id: Uuid,
    pub qr_id: Uuid,
    pub short_id: String,
    pub scanned_at: DateTime<Utc>,
    pub device: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub location: Option<String>,
    pub ip_address: Option<String>,
}
