use std::io::BufWriter;

use printpdf::*;

use crate::error::{PaycertError, Result};
use crate::fmt::{money, quantity};
use crate::ledger::ProgressiveTotals;
use crate::reports::{CertificateReport, ProjectStatement};

// US Letter dimensions (mm)
const PAGE_W: f32 = 215.9;
const PAGE_H: f32 = 279.4;
const MARGIN_TOP: f32 = 25.4;
const MARGIN_BOTTOM: f32 = 25.4;
const MARGIN_LEFT: f32 = 19.05;
const MARGIN_RIGHT: f32 = 19.05;
const ROW_H: f32 = 5.0;
const FONT_SIZE: f32 = 9.0;
const TITLE_SIZE: f32 = 16.0;
const SUBTITLE_SIZE: f32 = 10.0;

fn approx_text_width(text: &str, size: f32) -> f32 {
    text.len() as f32 * size * 0.18
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
}

struct Col {
    width: f32,
    align: Align,
}

struct PdfWriter {
    doc: PdfDocumentReference,
    font: IndirectFontRef,
    font_bold: IndirectFontRef,
    current_page: PdfPageIndex,
    current_layer: PdfLayerIndex,
    y: f32,
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| PaycertError::Pdf(format!("{e:?}")))?;
        let font_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| PaycertError::Pdf(format!("{e:?}")))?;
        Ok(Self {
            doc,
            font,
            font_bold,
            current_page: page,
            current_layer: layer,
            y: MARGIN_TOP,
        })
    }

    fn pdf_y(&self) -> f32 {
        PAGE_H - self.y
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer");
        self.current_page = page;
        self.current_layer = layer;
        self.y = MARGIN_TOP;
    }

    fn ensure_space(&mut self, needed: f32) {
        if self.y + needed > PAGE_H - MARGIN_BOTTOM {
            self.new_page();
        }
    }

    fn text(&self, s: &str, x: f32, size: f32, bold: bool) {
        let font = if bold { &self.font_bold } else { &self.font };
        self.doc
            .get_page(self.current_page)
            .get_layer(self.current_layer)
            .use_text(s, size, Mm(x), Mm(self.pdf_y()), font);
    }

    fn hline(&self) {
        let layer = self
            .doc
            .get_page(self.current_page)
            .get_layer(self.current_layer);
        layer.set_outline_thickness(0.5);
        layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN_LEFT), Mm(self.pdf_y())), false),
                (Point::new(Mm(PAGE_W - MARGIN_RIGHT), Mm(self.pdf_y())), false),
            ],
            is_closed: false,
        });
    }

    fn header(&mut self, title: &str, company: &str, subtitle: &str) {
        self.text(title, MARGIN_LEFT, TITLE_SIZE, true);
        self.y += 7.0;
        if !company.is_empty() {
            self.text(company, MARGIN_LEFT, SUBTITLE_SIZE, false);
            self.y += 5.0;
        }
        self.text(subtitle, MARGIN_LEFT, SUBTITLE_SIZE, false);
        self.y += 5.0;
        let ts = chrono::Local::now().format("Generated %Y-%m-%d %H:%M").to_string();
        self.text(&ts, MARGIN_LEFT, 8.0, false);
        self.y += 5.0;
        self.hline();
        self.y += 5.0;
    }

    fn cells(&mut self, cols: &[Col], values: &[&str], bold: bool) {
        let mut x = MARGIN_LEFT;
        for (col, value) in cols.iter().zip(values) {
            match col.align {
                Align::Left => self.text(value, x, FONT_SIZE, bold),
                Align::Right => {
                    let tw = approx_text_width(value, FONT_SIZE);
                    self.text(value, x + col.width - tw, FONT_SIZE, bold);
                }
            }
            x += col.width;
        }
        self.y += ROW_H;
    }

    fn table_header(&mut self, cols: &[Col], headers: &[&str]) {
        self.ensure_space(ROW_H * 2.0);
        self.cells(cols, headers, true);
        self.hline();
        self.y += 2.0;
    }

    fn table_row(&mut self, cols: &[Col], values: &[&str], bold: bool) {
        self.ensure_space(ROW_H);
        self.cells(cols, values, bold);
    }

    fn section_label(&mut self, label: &str) {
        self.ensure_space(ROW_H);
        self.text(label, MARGIN_LEFT, FONT_SIZE, true);
        self.y += ROW_H;
    }

    fn blank_row(&mut self) {
        self.y += ROW_H;
    }

    fn separator(&mut self) {
        self.hline();
        self.y += 2.0;
    }

    fn to_bytes(self) -> Result<Vec<u8>> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| PaycertError::Pdf(format!("{e:?}")))?;
        buf.into_inner().map_err(|e| PaycertError::Pdf(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Render functions
// ---------------------------------------------------------------------------

const SUMMARY_COLS: [Col; 4] = [
    Col { width: 70.0, align: Align::Left },
    Col { width: 35.8, align: Align::Right },
    Col { width: 36.0, align: Align::Right },
    Col { width: 36.0, align: Align::Right },
];

fn progressive_row(pdf: &mut PdfWriter, label: &str, t: &ProgressiveTotals, bold: bool) {
    let (p, c, d) = (money(t.previous), money(t.current), money(t.to_date));
    pdf.table_row(&SUMMARY_COLS, &[label, &p, &c, &d], bold);
}

fn certificate_title(report: &CertificateReport) -> String {
    let final_mark = if report.certificate.is_final { " (Final)" } else { "" };
    format!("Payment Certificate #{}{final_mark}", report.certificate.certificate_number)
}

fn certificate_subtitle(report: &CertificateReport) -> String {
    let mut s = format!("{} | {}", report.project_name, report.certificate.status.label());
    if let Some(on) = &report.certificate.approved_on {
        s.push_str(&format!(" | Approved {on}"));
        if let Some(by) = &report.certificate.approved_by {
            s.push_str(&format!(" by {by}"));
        }
    }
    s
}

fn certificate_summary(pdf: &mut PdfWriter, report: &CertificateReport) {
    pdf.section_label("Summary");
    pdf.table_header(&SUMMARY_COLS, &["", "Previous", "Current", "To Date"]);
    progressive_row(pdf, "Contract work", &report.contract, false);
    progressive_row(pdf, "Addendum work", &report.addendum, false);
    progressive_row(pdf, "Total work", &report.work, true);
    progressive_row(pdf, "Special items", &report.special, false);
    pdf.separator();
    progressive_row(pdf, "Total certified", &report.total, true);
    pdf.blank_row();

    let value_cols = &[
        Col { width: 141.8, align: Align::Left },
        Col { width: 36.0, align: Align::Right },
    ];
    let rows = [
        ("Items submitted", money(report.items_submitted)),
        ("Items claimed", money(report.items_claimed)),
        ("Original contract value", money(report.contract_values.original)),
        ("Revised contract value", money(report.contract_values.revised)),
        ("Total contract value", money(report.contract_values.total)),
        ("Certified to date", money(report.certified_to_date)),
        ("Certified %", format!("{:.2}%", report.certified_pct)),
    ];
    for (label, value) in &rows {
        pdf.table_row(value_cols, &[*label, value.as_str()], false);
    }
    if !report.certificate.notes.is_empty() {
        pdf.blank_row();
        pdf.section_label("Notes");
        for line in textwrap::wrap(&report.certificate.notes, 95) {
            pdf.table_row(value_cols, &[line.as_ref()], false);
        }
    }
}

pub fn render_certificate(report: &CertificateReport, company: &str) -> Result<Vec<u8>> {
    let title = certificate_title(report);
    let mut pdf = PdfWriter::new(&title)?;
    pdf.header(&title, company, &certificate_subtitle(report));

    let cols = &[
        Col { width: 18.0, align: Align::Left },
        Col { width: 70.0, align: Align::Left },
        Col { width: 14.0, align: Align::Left },
        Col { width: 20.0, align: Align::Right },
        Col { width: 25.0, align: Align::Right },
        Col { width: 30.8, align: Align::Right },
    ];
    for group in &report.groups {
        pdf.section_label(&group.name);
        pdf.table_header(cols, &["Item", "Description", "Unit", "Qty", "Rate", "Amount"]);
        for line in &group.lines {
            let qty = quantity(line.quantity);
            let rate = money(line.unit_price);
            let amt = money(line.total_price);
            let desc: String = line.description.chars().take(45).collect();
            pdf.table_row(
                cols,
                &[&line.item_number, &desc, &line.unit_measurement, &qty, &rate, &amt],
                false,
            );
        }
        let sub = money(group.subtotal);
        pdf.table_row(cols, &["", "Subtotal", "", "", "", &sub], true);
        pdf.blank_row();
    }

    certificate_summary(&mut pdf, report);
    pdf.to_bytes()
}

/// Summary page only, without the claim lines.
pub fn render_certificate_abridged(report: &CertificateReport, company: &str) -> Result<Vec<u8>> {
    let title = certificate_title(report);
    let mut pdf = PdfWriter::new(&title)?;
    pdf.header(&title, company, &certificate_subtitle(report));
    certificate_summary(&mut pdf, report);
    pdf.to_bytes()
}

pub fn render_statement(report: &ProjectStatement, company: &str) -> Result<Vec<u8>> {
    let mut pdf = PdfWriter::new("Project Statement")?;
    pdf.header("Project Statement", company, &report.project_name);

    let cols = &[
        Col { width: 18.0, align: Align::Left },
        Col { width: 33.8, align: Align::Left },
        Col { width: 42.0, align: Align::Right },
        Col { width: 42.0, align: Align::Right },
        Col { width: 42.0, align: Align::Right },
    ];
    pdf.table_header(cols, &["No.", "Status", "Previous", "Current", "To Date"]);
    for row in &report.rows {
        let number = if row.is_final {
            format!("{} (F)", row.number)
        } else {
            row.number.to_string()
        };
        let (p, c, d) = (
            money(row.totals.previous),
            money(row.totals.current),
            money(row.totals.to_date),
        );
        pdf.table_row(cols, &[&number, row.status.label(), &p, &c, &d], false);
    }
    pdf.blank_row();

    if !report.payments.is_empty() {
        let pay_cols = &[
            Col { width: 135.8, align: Align::Left },
            Col { width: 42.0, align: Align::Right },
        ];
        pdf.section_label("Payments");
        pdf.table_header(pay_cols, &["Date", "Amount"]);
        for p in &report.payments {
            let amt = money(p.amount);
            pdf.table_row(pay_cols, &[&p.date, &amt], false);
        }
        pdf.blank_row();
    }

    let total_cols = &[
        Col { width: 135.8, align: Align::Left },
        Col { width: 42.0, align: Align::Right },
    ];
    pdf.separator();
    let rows = [
        ("Total contract value", money(report.contract_values.total)),
        ("Certified to date", money(report.certified_to_date)),
        ("Certified %", format!("{:.2}%", report.certified_pct)),
        ("Total paid", money(report.total_paid)),
    ];
    for (label, value) in &rows {
        pdf.table_row(total_cols, &[*label, value.as_str()], false);
    }
    let outstanding = money(report.outstanding);
    pdf.table_row(total_cols, &["Balance outstanding", &outstanding], true);

    pdf.to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificates::{add_claim, create_certificate, transition};
    use crate::db::test_db;
    use crate::models::{CertificateStatus, Project};
    use crate::projects::fixtures::{d, item};
    use crate::projects::{add_line_item, add_payment, add_project, add_structure, find_project, find_structure, get_line_item};
    use crate::reports::{get_certificate_report, get_project_statement};

    fn seed(conn: &rusqlite::Connection) -> Project {
        add_project(conn, "Clinic").unwrap();
        let p = find_project(conn, "Clinic").unwrap();
        add_structure(conn, p.id, "Block A", "").unwrap();
        let s = find_structure(conn, p.id, "Block A").unwrap();
        let id = add_line_item(conn, &s, &item("1.1", "Brickwork", "100", "50")).unwrap();
        let li = get_line_item(conn, p.id, id).unwrap();
        let c1 = create_certificate(conn, &p, false, "First valuation").unwrap();
        add_claim(conn, &c1, &li, d("10"), true, true).unwrap();
        transition(conn, &p, 1, CertificateStatus::Approved, "qs").unwrap();
        let c2 = create_certificate(conn, &p, true, "").unwrap();
        add_claim(conn, &c2, &li, d("2"), false, false).unwrap();
        add_payment(conn, p.id, "2026-02-01", d("900")).unwrap();
        p
    }

    #[test]
    fn test_render_certificate_produces_pdf() {
        let (_dir, conn) = test_db();
        let p = seed(&conn);
        let report = get_certificate_report(&conn, &p, 1).unwrap();
        let bytes = render_certificate(&report, "Acme Civils").unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_abridged_certificate_produces_pdf() {
        let (_dir, conn) = test_db();
        let p = seed(&conn);
        let report = get_certificate_report(&conn, &p, 2).unwrap();
        let abridged = render_certificate_abridged(&report, "").unwrap();
        assert!(abridged.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_statement_produces_pdf() {
        let (_dir, conn) = test_db();
        let p = seed(&conn);
        let report = get_project_statement(&conn, &p).unwrap();
        let bytes = render_statement(&report, "Acme Civils").unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
