use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}
