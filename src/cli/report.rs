use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::{money, quantity};
use crate::ledger::ProgressiveTotals;
use crate::projects::find_project;
use crate::reports::{self, CertificateReport};

fn right(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

fn progressive_row(table: &mut Table, label: &str, t: &ProgressiveTotals, bold: bool) {
    let label = if bold { label.bold() } else { label.normal() };
    table.add_row(vec![
        Cell::new(label),
        right(money(t.previous)),
        right(money(t.current)),
        right(money(t.to_date)),
    ]);
}

fn summary_table(r: &CertificateReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["", "Previous", "Current", "To Date"]);
    progressive_row(&mut table, "Contract work", &r.contract, false);
    progressive_row(&mut table, "Addendum work", &r.addendum, false);
    progressive_row(&mut table, "Total work", &r.work, true);
    progressive_row(&mut table, "Special items", &r.special, false);
    progressive_row(&mut table, "Total certified", &r.total, true);
    table
}

pub fn cert(project: &str, number: i64) -> Result<()> {
    let conn = open_db()?;
    let p = find_project(&conn, project)?;
    let r = reports::get_certificate_report(&conn, &p, number)?;

    let final_mark = if r.certificate.is_final { " (final)" } else { "" };
    println!(
        "{} | Payment Certificate #{}{final_mark} | {}",
        r.project_name.bold(),
        r.certificate.certificate_number,
        r.certificate.status.label()
    );
    if let (Some(on), by) = (&r.certificate.approved_on, &r.certificate.approved_by) {
        println!("Approved {on}{}", by.as_deref().map(|b| format!(" by {b}")).unwrap_or_default());
    }

    if r.groups.is_empty() {
        println!("\nNo claim lines on this certificate.");
    } else {
        let mut lines = Table::new();
        lines.set_header(vec!["Item", "Description", "Unit", "Qty", "Rate", "Amount"]);
        for g in &r.groups {
            lines.add_row(vec![Cell::new(g.name.as_str().cyan().bold())]);
            for l in &g.lines {
                lines.add_row(vec![
                    Cell::new(&l.item_number),
                    Cell::new(&l.description),
                    Cell::new(&l.unit_measurement),
                    right(quantity(l.quantity)),
                    right(money(l.unit_price)),
                    right(money(l.total_price)),
                ]);
            }
            lines.add_row(vec![
                Cell::new(""),
                Cell::new("Subtotal".bold()),
                Cell::new(""),
                Cell::new(""),
                Cell::new(""),
                right(money(g.subtotal)),
            ]);
        }
        println!("\n{lines}");
    }

    println!("\nSummary\n{}", summary_table(&r));

    let mut values = Table::new();
    values.add_row(vec![Cell::new("Items submitted"), right(money(r.items_submitted))]);
    values.add_row(vec![Cell::new("Items claimed"), right(money(r.items_claimed))]);
    values.add_row(vec![Cell::new("Original contract value"), right(money(r.contract_values.original))]);
    values.add_row(vec![Cell::new("Revised contract value"), right(money(r.contract_values.revised))]);
    values.add_row(vec![Cell::new("Total contract value"), right(money(r.contract_values.total))]);
    values.add_row(vec![Cell::new("Certified to date"), right(money(r.certified_to_date))]);
    values.add_row(vec![Cell::new("Certified %"), right(format!("{:.2}%", r.certified_pct))]);
    println!("{values}");

    if !r.certificate.notes.is_empty() {
        println!("\nNotes: {}", r.certificate.notes);
    }
    Ok(())
}

pub fn statement(project: &str) -> Result<()> {
    let conn = open_db()?;
    let p = find_project(&conn, project)?;
    let s = reports::get_project_statement(&conn, &p)?;

    let mut table = Table::new();
    table.set_header(vec!["No.", "Status", "Previous", "Current", "To Date"]);
    for row in &s.rows {
        let number = if row.is_final {
            format!("{} (final)", row.number)
        } else {
            row.number.to_string()
        };
        table.add_row(vec![
            Cell::new(number),
            Cell::new(row.status.label()),
            right(money(row.totals.previous)),
            right(money(row.totals.current)),
            right(money(row.totals.to_date)),
        ]);
    }
    println!("Project Statement: {}\n{table}", s.project_name.bold());

    if !s.payments.is_empty() {
        let mut pay = Table::new();
        pay.set_header(vec!["Date", "Amount"]);
        for payment in &s.payments {
            pay.add_row(vec![Cell::new(&payment.date), right(money(payment.amount))]);
        }
        println!("\nPayments\n{pay}");
    }

    let outstanding = money(s.outstanding);
    let outstanding = if s.outstanding.is_sign_negative() && !s.outstanding.is_zero() {
        outstanding.red().bold()
    } else {
        outstanding.bold()
    };
    let mut totals = Table::new();
    totals.add_row(vec![Cell::new("Total contract value"), right(money(s.contract_values.total))]);
    totals.add_row(vec![Cell::new("Certified to date"), right(money(s.certified_to_date))]);
    totals.add_row(vec![Cell::new("Certified %"), right(format!("{:.2}%", s.certified_pct))]);
    totals.add_row(vec![Cell::new("Total paid"), right(money(s.total_paid))]);
    totals.add_row(vec![
        Cell::new("Balance outstanding".bold()),
        Cell::new(outstanding).set_alignment(CellAlignment::Right),
    ]);
    println!("\n{totals}");
    Ok(())
}
