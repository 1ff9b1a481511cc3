use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Rgb,
};

use super::collect::{CodeExport, ExportData};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const CODES_PER_PAGE: usize = 5;
/// Builtin fonts have no metrics we can query, so long lines are cut.
const MAX_LINE_CHARS: usize = 95;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Writes top to bottom on one page layer.
struct Cursor {
    layer: PdfLayerReference,
    y: f32,
}

impl Cursor {
    fn new(layer: PdfLayerReference) -> Self {
        Self {
            layer,
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn text(&mut self, text: &str, size: f32, font: &IndirectFontRef, gray: f32, indent: f32) {
        self.layer
            .set_fill_color(Color::Rgb(Rgb::new(gray, gray, gray, None)));
        self.layer
            .use_text(printable(text), size, Mm(MARGIN + indent), Mm(self.y), font);
    }

    fn line(&mut self, text: &str, size: f32, font: &IndirectFontRef, gray: f32, advance: f32) {
        self.text(text, size, font, gray, 0.0);
        self.y -= advance;
    }

    fn skip(&mut self, mm: f32) {
        self.y -= mm;
    }
}

/// Builtin fonts only cover WinAnsi; anything else becomes `?`.
fn printable(text: &str) -> String {
    let mut out: String = text
        .chars()
        .map(|c| if (c as u32) < 0x100 && !c.is_control() { c } else { '?' })
        .take(MAX_LINE_CHARS)
        .collect();
    if text.chars().count() > MAX_LINE_CHARS {
        out.push_str("...");
    }
    out
}

fn new_page(doc: &PdfDocumentReference, name: &str) -> Cursor {
    let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), name);
    Cursor::new(doc.get_page(page).get_layer(layer))
}

fn cover(cursor: &mut Cursor, data: &ExportData, fonts: &Fonts) {
    cursor.skip(60.0);
    cursor.line("QR Code Export Report", 24.0, &fonts.bold, 0.0, 14.0);
    cursor.line(
        &format!("Generated on: {}", data.generated_at.format("%Y-%m-%d %H:%M UTC")),
        12.0,
        &fonts.regular,
        0.4,
        7.0,
    );
    cursor.line(
        &format!("Account: {} <{}>", data.owner_name, data.owner_email),
        12.0,
        &fonts.regular,
        0.4,
        7.0,
    );
}

fn summary(cursor: &mut Cursor, data: &ExportData, fonts: &Fonts) {
    cursor.line("Summary", 20.0, &fonts.bold, 0.0, 14.0);

    let most_scanned = match &data.summary.most_scanned {
        Some(top) => format!("{} ({} scans)", top.title, top.scan_count),
        None => "None".to_string(),
    };
    let items = [
        format!("Total QR Codes: {}", data.summary.total_codes),
        format!("Total Scans: {}", data.summary.total_scans),
        format!("Average Scans per Code: {:.2}", data.summary.average_scans),
        format!("Most Scanned: {}", most_scanned),
    ];
    for item in &items {
        cursor.line(item, 12.0, &fonts.regular, 0.2, 9.0);
    }
}

fn code_block(cursor: &mut Cursor, code: &CodeExport, fonts: &Fonts) {
    let qr = &code.qr;
    cursor.line(&qr.title, 14.0, &fonts.bold, 0.0, 6.0);

    let last_scan = qr
        .last_scanned
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "Never".to_string());
    let details = [
        format!("Short ID: {}", qr.short_id),
        format!("URL: {}", qr.target_url),
        format!("Created: {}", qr.created_at.format("%Y-%m-%d")),
        format!("Total Scans: {}", qr.scan_count),
        format!("Last Scan: {}", last_scan),
    ];
    for detail in &details {
        cursor.line(detail, 9.0, &fonts.regular, 0.2, 4.0);
    }

    if !code.recent_scans.is_empty() {
        cursor.skip(1.0);
        cursor.line("Recent Scans:", 10.0, &fonts.bold, 0.0, 4.0);
        for scan in &code.recent_scans {
            let mut entry = format!("- {}", scan.scanned_at.format("%Y-%m-%d %H:%M UTC"));
            for part in [&scan.location, &scan.device].into_iter().flatten() {
                entry.push_str(" - ");
                entry.push_str(part);
            }
            cursor.text(&entry, 8.0, &fonts.regular, 0.3, 5.0);
            cursor.skip(3.5);
        }
    }
    cursor.skip(3.0);
}

/// Renders the report: cover, summary, then detail pages of five codes each.
pub fn render_pdf(data: &ExportData) -> Result<Vec<u8>, printpdf::Error> {
    let (doc, page, layer) = PdfDocument::new(
        "QR Code Export Report",
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Cover",
    );
    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold)?,
    };

    let mut cursor = Cursor::new(doc.get_page(page).get_layer(layer));
    cover(&mut cursor, data, &fonts);

    let mut cursor = new_page(&doc, "Summary");
    summary(&mut cursor, data, &fonts);

    for (n, chunk) in data.codes.chunks(CODES_PER_PAGE).enumerate() {
        let mut cursor = new_page(&doc, &format!("Codes {}", n + 1));
        for code in chunk {
            code_block(&mut cursor, code, &fonts);
        }
    }

    doc.save_to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_replaces_unsupported_chars_and_truncates() {
        assert_eq!(printable("Café"), "Café");
        assert_eq!(printable("QR ✓"), "QR ?");
        let long = "x".repeat(MAX_LINE_CHARS + 10);
        assert_eq!(printable(&long).len(), MAX_LINE_CHARS + 3);
    }
}
