use rust_xlsxwriter::{Color, Format, FormatPattern, Workbook, Worksheet, XlsxError};

use super::collect::ExportData;

const QR_COLUMNS: [(&str, f64); 6] = [
    ("Short ID", 14.0),
    ("Title", 30.0),
    ("Target URL", 50.0),
    ("Created", 20.0),
    ("Scan Count", 12.0),
    ("Last Scanned", 20.0),
];

const SCAN_COLUMNS: [(&str, f64); 6] = [
    ("Short ID", 14.0),
    ("Scanned At", 22.0),
    ("Device", 12.0),
    ("Browser", 18.0),
    ("OS", 12.0),
    ("Location", 24.0),
];

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn header_row(sheet: &mut Worksheet, columns: &[(&str, f64)]) -> Result<(), XlsxError> {
    let header = Format::new()
        .set_bold()
        .set_pattern(FormatPattern::Solid)
        .set_background_color(Color::RGB(0xE0E0E0));

    for (col, (title, width)) in columns.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *title, &header)?;
        sheet.set_column_width(col, *width)?;
    }
    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

/// Workbook with a "QR Codes" sheet and a "Scans" sheet.
pub fn render_xlsx(data: &ExportData) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("QR Codes")?;
        header_row(sheet, &QR_COLUMNS)?;

        for (i, code) in data.codes.iter().enumerate() {
            let row = i as u32 + 1;
            let qr = &code.qr;
            let last_scanned = qr
                .last_scanned
                .map(|t| t.format(DATE_FORMAT).to_string())
                .unwrap_or_else(|| "Never".to_string());

            sheet.write_string(row, 0, &qr.short_id)?;
            sheet.write_string(row, 1, &qr.title)?;
            sheet.write_string(row, 2, &qr.target_url)?;
            sheet.write_string(row, 3, qr.created_at.format(DATE_FORMAT).to_string())?;
            sheet.write_number(row, 4, qr.scan_count as f64)?;
            sheet.write_string(row, 5, last_scanned)?;
        }
    }

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Scans")?;
        header_row(sheet, &SCAN_COLUMNS)?;

        for (i, scan) in data.scans.iter().enumerate() {
            let row = i as u32 + 1;
            let cells = [
                scan.device.as_deref(),
                scan.browser.as_deref(),
                scan.os.as_deref(),
                scan.location.as_deref(),
            ];

            sheet.write_string(row, 0, &scan.short_id)?;
            sheet.write_string(row, 1, scan.scanned_at.format(DATE_FORMAT).to_string())?;
            for (offset, cell) in cells.iter().enumerate() {
                sheet.write_string(row, 2 + offset as u16, cell.unwrap_or(""))?;
            }
        }
    }

    workbook.save_to_buffer()
}
