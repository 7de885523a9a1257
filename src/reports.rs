use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::certificates::{certificate_ref, get_certificate, list_certificates, list_claims, load_ledger, ClaimRow};
use crate::error::Result;
use crate::fmt::{checked_add, checked_sub, checked_sum};
use crate::ledger::{certified_percentage, ProgressiveTotals};
use crate::models::{CertificateStatus, Payment, PaymentCertificate, Project};
use crate::projects::{contract_values, list_line_items, list_payments, ContractValues};

// ---------------------------------------------------------------------------
// Payment certificate
// ---------------------------------------------------------------------------

pub struct StructureGroup {
    pub name: String,
    pub lines: Vec<ClaimRow>,
    pub subtotal: Decimal,
}

pub struct CertificateReport {
    pub project_name: String,
    pub certificate: PaymentCertificate,
    pub groups: Vec<StructureGroup>,
    pub contract: ProgressiveTotals,
    pub addendum: ProgressiveTotals,
    pub special: ProgressiveTotals,
    pub work: ProgressiveTotals,
    pub total: ProgressiveTotals,
    pub items_submitted: Decimal,
    pub items_claimed: Decimal,
    pub contract_values: ContractValues,
    pub certified_to_date: Decimal,
    pub certified_pct: Decimal,
}

fn group_by_structure(rows: Vec<ClaimRow>) -> Result<Vec<StructureGroup>> {
    let mut groups: Vec<StructureGroup> = Vec::new();
    for row in rows {
        match groups.last_mut() {
            Some(g) if g.name == row.structure_name => {
                g.subtotal = checked_add(g.subtotal, row.total_price)?;
                g.lines.push(row);
            }
            _ => groups.push(StructureGroup {
                name: row.structure_name.clone(),
                subtotal: row.total_price,
                lines: vec![row],
            }),
        }
    }
    Ok(groups)
}

pub fn get_certificate_report(conn: &Connection, project: &Project, number: i64) -> Result<CertificateReport> {
    let certificate = get_certificate(conn, project, number)?;
    let ledger = load_ledger(conn, project.id)?;
    let cert = ledger
        .certificate(number)
        .cloned()
        .unwrap_or_else(|| certificate_ref(&certificate));

    let groups = group_by_structure(list_claims(conn, certificate.id)?)?;
    let values = contract_values(&list_line_items(conn, project.id)?)?;
    let certified_to_date = ledger.certified_to_date()?;

    Ok(CertificateReport {
        project_name: project.name.clone(),
        contract: ledger.contract_totals(&cert)?,
        addendum: ledger.addendum_totals(&cert)?,
        special: ledger.special_totals(&cert)?,
        work: ledger.work_totals(&cert)?,
        total: ledger.totals(&cert)?,
        items_submitted: ledger.items_submitted(&cert)?,
        items_claimed: ledger.items_claimed(&cert)?,
        certified_pct: certified_percentage(certified_to_date, values.total)?,
        contract_values: values,
        certified_to_date,
        groups,
        certificate,
    })
}

// ---------------------------------------------------------------------------
// Project statement
// ---------------------------------------------------------------------------

pub struct StatementRow {
    pub number: i64,
    pub status: CertificateStatus,
    pub is_final: bool,
    pub totals: ProgressiveTotals,
}

pub struct ProjectStatement {
    pub project_name: String,
    pub rows: Vec<StatementRow>,
    pub payments: Vec<Payment>,
    pub contract_values: ContractValues,
    pub certified_to_date: Decimal,
    pub certified_pct: Decimal,
    pub total_paid: Decimal,
    pub outstanding: Decimal,
}

pub fn get_project_statement(conn: &Connection, project: &Project) -> Result<ProjectStatement> {
    let ledger = load_ledger(conn, project.id)?;
    let rows = list_certificates(conn, project.id)?
        .iter()
        .map(|c| {
            Ok(StatementRow {
                number: c.certificate_number,
                status: c.status,
                is_final: c.is_final,
                totals: ledger.totals(&certificate_ref(c))?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let payments = list_payments(conn, project.id)?;
    let total_paid = checked_sum(payments.iter().map(|p| p.amount))?;
    let values = contract_values(&list_line_items(conn, project.id)?)?;
    let certified_to_date = ledger.certified_to_date()?;

    Ok(ProjectStatement {
        project_name: project.name.clone(),
        certified_pct: certified_percentage(certified_to_date, values.total)?,
        contract_values: values,
        outstanding: checked_sub(certified_to_date, total_paid)?,
        certified_to_date,
        total_paid,
        payments,
        rows,
    })
}
