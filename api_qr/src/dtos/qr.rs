use db::models::qr::QrCode;
use serde::{Deserialize, Serialize};

use crate::services::summary::Summary;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveQuery {
    pub short_id: Option<String>,
    pub target_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCreateBody {
    #[serde(default)]
    pub target_url: String,
    #[serde(default)]
    pub title: String,
    pub text_content: Option<String>,
    #[serde(default = "default_true")]
    pub show_title: bool,
    #[serde(default)]
    pub show_text: bool,
    pub options: Option<serde_json::Value>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCreatedResponse {
    #[serde(flatten)]
    pub qr: QrCode,
    pub scan_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub summary: Summary,
    pub qr_codes: Vec<QrCode>,
}
