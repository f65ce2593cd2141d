//! PDF export of invoices, credit notes and monthly reports.
//!
//! Documents are single A4 pages drawn with the built-in Helvetica faces, so
//! nothing has to be embedded. Rendering is pure: the caller decides where
//! the bytes go.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use officine_core::{CreditNote, Invoice, MonthlyReport, Supplier, format_date};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rgb,
};

use crate::config::PharmacyInfo;
use crate::error::PdfError;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const FOOTER: &str = "Document généré par Pharmacie Manager";
const MISSING: &str = "N/A";

/// Points to millimetres.
const PT_TO_MM: f32 = 0.352_78;
/// Average Helvetica glyph width, as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;

const BLUE: (f32, f32, f32) = (0.0, 0.4, 0.8);
const RED: (f32, f32, f32) = (0.863, 0.208, 0.271);
const BLACK: (f32, f32, f32) = (0.0, 0.0, 0.0);
const GREY: (f32, f32, f32) = (0.4, 0.4, 0.4);
const LIGHT_GREY: (f32, f32, f32) = (0.6, 0.6, 0.6);

/// A rendered document and the name it should be saved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Document {
    /// Write the document into `dir` under its file name, creating `dir` if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns `PdfError::Io` if the file cannot be written.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, PdfError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

// ============================================================================
// Page writer
// ============================================================================

/// Top-down cursor over a single page.
struct Page {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    /// Distance from the top edge, in millimetres.
    y: f32,
}

impl Page {
    fn new(title: &str) -> Result<Self, PdfError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| PdfError::Render(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| PdfError::Render(e.to_string()))?;
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: MARGIN,
        })
    }

    fn color(&self, (r, g, b): (f32, f32, f32)) {
        self.layer.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
    }

    fn text_at(&self, text: &str, size: f32, x: f32, y: f32, bold: bool) {
        if text.trim().is_empty() {
            return;
        }
        let font = if bold { &self.bold } else { &self.regular };
        self.layer
            .use_text(text, size, Mm(x), Mm(PAGE_HEIGHT - y), font);
    }

    /// Left-aligned text at the cursor, then move down by `advance`.
    fn line(&mut self, text: &str, size: f32, advance: f32) {
        self.text_at(text, size, MARGIN, self.y, false);
        self.y += advance;
    }

    fn centered(&self, text: &str, size: f32, y: f32, bold: bool) {
        let x = ((PAGE_WIDTH - text_width(text, size)) / 2.0).max(MARGIN);
        self.text_at(text, size, x, y, bold);
    }

    fn rule(&self, y: f32) {
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN), Mm(PAGE_HEIGHT - y)), false),
                (Point::new(Mm(PAGE_WIDTH - MARGIN), Mm(PAGE_HEIGHT - y)), false),
            ],
            is_closed: false,
        });
    }

    fn letterhead(&mut self, pharmacy: &PharmacyInfo) {
        self.color(GREY);
        for line in [
            &pharmacy.name,
            &pharmacy.address,
            &pharmacy.city,
            &pharmacy.phone,
            &pharmacy.email,
        ] {
            self.line(line, 10.0, 6.0);
        }
        self.y += 9.0;
    }

    /// A header row then body rows, columns starting at `columns` offsets
    /// from the margin. Amount columns after the first are right-aligned.
    fn table(&mut self, header: &[&str], rows: &[Vec<String>], columns: &[f32], accent: (f32, f32, f32)) {
        const ROW: f32 = 8.0;
        let right_edge = |i: usize| {
            columns
                .get(i + 1)
                .map_or(PAGE_WIDTH - MARGIN, |next| MARGIN + next - 2.0)
        };

        self.color(accent);
        self.rule(self.y - 5.0);
        for (i, (title, offset)) in header.iter().zip(columns).enumerate() {
            let x = if i == 0 {
                MARGIN + offset
            } else {
                right_edge(i) - text_width(title, 10.0)
            };
            self.text_at(title, 10.0, x, self.y, true);
        }
        self.y += ROW;
        self.rule(self.y - 5.0);

        self.color(BLACK);
        for row in rows {
            for (i, (cell, offset)) in row.iter().zip(columns).enumerate() {
                let x = if i == 0 {
                    MARGIN + offset
                } else {
                    right_edge(i) - text_width(cell, 10.0)
                };
                self.text_at(cell, 10.0, x, self.y, false);
            }
            self.y += ROW;
            self.rule(self.y - 5.0);
        }
    }

    fn footer(&self, second_line: &str) {
        let y = PAGE_HEIGHT - 20.0;
        self.color(LIGHT_GREY);
        self.centered(FOOTER, 8.0, y, false);
        self.centered(second_line, 8.0, y + 5.0, false);
    }

    fn finish(self, file_name: String) -> Result<Document, PdfError> {
        let mut writer = std::io::BufWriter::new(Vec::<u8>::new());
        self.doc
            .save(&mut writer)
            .map_err(|e| PdfError::Render(e.to_string()))?;
        let bytes = writer
            .into_inner()
            .map_err(|e| PdfError::Render(e.to_string()))?;
        Ok(Document { file_name, bytes })
    }
}

#[allow(clippy::cast_precision_loss)]
fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * AVG_GLYPH_WIDTH * PT_TO_MM
}

/// Split `text` into lines of at most `width` characters, on word
/// boundaries where possible.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    lines
}

/// Entity numbers go into file names; anything but letters, digits, `-` and
/// `_` becomes `_`.
fn file_stem(number: &str) -> String {
    let stem: String = number
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() { "sans_numero".to_owned() } else { stem }
}

fn or_missing(text: &str) -> &str {
    if text.trim().is_empty() { MISSING } else { text }
}

fn date_or_missing(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| MISSING.to_owned(), |d| format_date(Some(d)))
}

// ============================================================================
// Documents
// ============================================================================

/// Render an invoice. `supplier` adds the supplier's address when the
/// invoice only carries a reference.
///
/// # Errors
///
/// Returns `PdfError::Render` if the document cannot be produced.
pub fn invoice_pdf(
    invoice: &Invoice,
    supplier: Option<&Supplier>,
    pharmacy: &PharmacyInfo,
) -> Result<Document, PdfError> {
    let mut page = Page::new("Facture")?;

    page.color(BLUE);
    page.centered("PHARMACIE - FACTURE", 20.0, page.y, true);
    page.y += 20.0;
    page.letterhead(pharmacy);

    page.color(BLACK);
    page.line(
        &format!("Numéro de facture: {}", or_missing(&invoice.invoice_number)),
        12.0,
        8.0,
    );
    page.line(&format!("Date: {}", date_or_missing(invoice.invoice_date)), 12.0, 8.0);
    page.line(
        &format!("Date d'échéance: {}", date_or_missing(invoice.due_date)),
        12.0,
        8.0,
    );

    page.line("Fournisseur:", 12.0, 6.0);
    let name = supplier.map_or(invoice.supplier.name.as_str(), |s| s.name.as_str());
    if !name.trim().is_empty() {
        page.line(name, 10.0, 6.0);
    }
    if let Some(supplier) = supplier {
        if let Some(address) = supplier.address.as_deref() {
            page.line(address, 10.0, 6.0);
        }
        if let (Some(postal_code), Some(city)) = (&supplier.postal_code, &supplier.city) {
            page.line(&format!("{postal_code} {city}"), 10.0, 6.0);
        }
    }
    page.y += 9.0;

    page.table(
        &["Description", "Montant"],
        &[vec!["Net à payer".to_owned(), invoice.net_to_pay.format_plain()]],
        &[0.0, 120.0],
        BLUE,
    );
    page.y += 12.0;

    page.line(&format!("Statut: {}", invoice.status.label_fr()), 12.0, 10.0);
    if let Some(notes) = invoice.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        page.line("Notes:", 12.0, 6.0);
        for line in wrap(notes, 90) {
            page.line(&line, 10.0, 5.0);
        }
    }

    page.footer("Page 1 sur 1");
    page.finish(format!("facture_{}.pdf", file_stem(&invoice.invoice_number)))
}

/// Render a credit note.
///
/// # Errors
///
/// Returns `PdfError::Render` if the document cannot be produced.
pub fn credit_note_pdf(note: &CreditNote, pharmacy: &PharmacyInfo) -> Result<Document, PdfError> {
    let mut page = Page::new("Avoir")?;

    page.color(RED);
    page.centered("PHARMACIE - AVOIR", 20.0, page.y, true);
    page.y += 20.0;
    page.letterhead(pharmacy);

    page.color(BLACK);
    page.line(
        &format!("Numéro d'avoir: {}", or_missing(&note.credit_note_number)),
        12.0,
        8.0,
    );
    page.line(&format!("Date: {}", date_or_missing(note.credit_note_date)), 12.0, 8.0);
    page.line(
        &format!("Facture associée: {}", or_missing(note.invoice_number().unwrap_or_default())),
        12.0,
        14.0,
    );

    page.table(
        &["Description", "Montant"],
        &[
            vec!["Montant de l'avoir".to_owned(), note.amount.format_plain()],
            vec!["Motif".to_owned(), or_missing(&note.reason).to_owned()],
            vec!["Statut".to_owned(), note.status.label_fr().to_owned()],
        ],
        &[0.0, 100.0],
        RED,
    );

    page.footer("Page 1 sur 1");
    page.finish(format!("avoir_{}.pdf", file_stem(&note.credit_note_number)))
}

/// Render a monthly report, stamped with `today`.
///
/// # Errors
///
/// Returns `PdfError::Render` if the document cannot be produced.
pub fn monthly_report_pdf(report: &MonthlyReport, today: NaiveDate) -> Result<Document, PdfError> {
    let mut page = Page::new("Rapport mensuel")?;

    page.color(BLUE);
    page.centered("RAPPORT MENSUEL", 20.0, page.y, true);
    page.y += 15.0;
    page.centered(&report.period_label(), 14.0, page.y, false);
    page.y += 25.0;

    page.color(BLACK);
    page.text_at("Résumé financier", 12.0, MARGIN, page.y, true);
    page.y += 10.0;
    page.table(
        &["Description", "Montant"],
        &[
            vec!["Total factures".to_owned(), report.total_invoices_amount.format_plain()],
            vec!["Total avoirs".to_owned(), report.total_credit_notes_amount.format_plain()],
            vec!["Net à payer".to_owned(), report.net_to_pay.format_plain()],
            vec!["Nombre de factures".to_owned(), report.invoices_count.to_string()],
            vec!["Nombre d'avoirs".to_owned(), report.credit_notes_count.to_string()],
        ],
        &[0.0, 120.0],
        BLUE,
    );
    page.y += 12.0;

    if !report.supplier_breakdown.is_empty() {
        page.color(BLACK);
        page.text_at("Détails par fournisseur", 12.0, MARGIN, page.y, true);
        page.y += 10.0;
        let rows: Vec<Vec<String>> = report
            .supplier_breakdown
            .iter()
            .map(|row| {
                vec![
                    row.supplier.name.clone(),
                    row.total_amount.format_plain(),
                    row.total_credit_amount.format_plain(),
                    row.net_amount.format_plain(),
                ]
            })
            .collect();
        page.table(
            &["Fournisseur", "Factures", "Avoirs", "Net"],
            &rows,
            &[0.0, 60.0, 95.0, 130.0],
            BLUE,
        );
    }

    page.footer(&format!("Généré le {}", format_date(Some(today))));
    page.finish(format!(
        "rapport_{:02}_{}.pdf",
        report.month.unwrap_or_default(),
        report.year.unwrap_or_default()
    ))
}
