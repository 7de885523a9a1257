use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::certificates::{certificate_ref, create_certificate, list_certificates, load_ledger, transition};
use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::money;
use crate::models::CertificateStatus;
use crate::projects::find_project;
use crate::settings::load_settings;

pub fn new(project: &str, is_final: bool, notes: &str) -> Result<()> {
    let conn = open_db()?;
    let p = find_project(&conn, project)?;
    let cert = create_certificate(&conn, &p, is_final, notes)?;
    let suffix = if cert.is_final { " (final)" } else { "" };
    println!("Created payment certificate #{}{suffix} for {}", cert.certificate_number, p.name);
    Ok(())
}

pub fn list(project: &str) -> Result<()> {
    let conn = open_db()?;
    let p = find_project(&conn, project)?;
    let ledger = load_ledger(&conn, p.id)?;

    let mut table = Table::new();
    table.set_header(vec!["No.", "Status", "Final", "Current", "To Date", "Created", "Approved"]);
    for c in list_certificates(&conn, p.id)? {
        let totals = ledger.totals(&certificate_ref(&c))?;
        let status = match c.status {
            CertificateStatus::Approved => c.status.label().green(),
            CertificateStatus::Rejected => c.status.label().red(),
            _ => c.status.label().normal(),
        };
        table.add_row(vec![
            Cell::new(c.certificate_number),
            Cell::new(status),
            Cell::new(if c.is_final { "yes" } else { "" }),
            Cell::new(money(totals.current)).set_alignment(CellAlignment::Right),
            Cell::new(money(totals.to_date)).set_alignment(CellAlignment::Right),
            Cell::new(&c.created_at),
            Cell::new(c.approved_on.unwrap_or_default()),
        ]);
    }
    println!("Payment certificates of {}\n{table}", p.name);
    Ok(())
}

pub fn set_status(project: &str, number: i64, next: CertificateStatus) -> Result<()> {
    let conn = open_db()?;
    let p = find_project(&conn, project)?;
    let user = load_settings().user_name;
    let cert = transition(&conn, &p, number, next, &user)?;
    println!("Payment certificate #{} is now {}", cert.certificate_number, cert.status.label());
    if cert.is_final && cert.status == CertificateStatus::Approved {
        println!("Final account issued for {}", p.name);
    }
    Ok(())
}
