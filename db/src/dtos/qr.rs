use uuid::Uuid;

pub struct QrCreateRequest {
    pub short_id: String,
    pub owner_id: Uuid,
    pub target_url: String,
    pub title: String,
    pub text_content: Option<String>,
    pub show_title: bool,
    pub show_text: bool,
    pub options: serde_json::Value,
}

/// Best-effort scan metadata; every field may be absent.
#[derive(Debug, Clone, Default)]
pub struct ScanCreateRequest {
    pub device: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub location: Option<String>,
    pub ip_address: Option<String>,
}
