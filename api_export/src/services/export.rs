use std::{str::FromStr, time::Duration};

use common::error::{AppError, Res};

use super::{collect::ExportData, pdf, xlsx};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Excel,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn filename(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "QRData.pdf",
            ExportFormat::Excel => "qr-codes-export.xlsx",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            other => Err(AppError::BadRequest(format!(
                "Unsupported export format '{}'. Use 'pdf' or 'excel'.",
                other
            ))),
        }
    }
}

/// Renders `data` off the async workers, bounded by `limit`.
/// Either the whole document comes back or an error does.
pub async fn render(format: ExportFormat, data: ExportData, limit: Duration) -> Res<Vec<u8>> {
    let task = tokio::task::spawn_blocking(move || match format {
        ExportFormat::Pdf => pdf::render_pdf(&data).map_err(|e| e.to_string()),
        ExportFormat::Excel => xlsx::render_xlsx(&data).map_err(|e| e.to_string()),
    });

    match tokio::time::timeout(limit, task).await {
        Ok(Ok(Ok(bytes))) if !bytes.is_empty() => Ok(bytes),
        Ok(Ok(Ok(_))) => Err(AppError::Document("rendered an empty document".to_string())),
        Ok(Ok(Err(e))) => Err(AppError::Document(e)),
        Ok(Err(join)) => Err(AppError::Document(format!("render task failed: {}", join))),
        Err(_) => Err(AppError::Document(format!(
            "rendering took longer than {}s",
            limit.as_secs()
        ))),
    }
}
