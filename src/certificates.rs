use rusqlite::{Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use crate::db::decimal_at;
use crate::error::{PaycertError, Result};
use crate::fmt::line_total;
use crate::ledger::{CertificateRef, ClaimLine, LineKind, ProjectLedger};
use crate::models::{CertificateStatus, LineItem, PaymentCertificate, Project, ProjectStatus};
use crate::projects::set_project_status;

const CERTIFICATE_SELECT: &str = "SELECT id, project_id, certificate_number, status, is_final, notes, \
     approved_on, approved_by, created_at FROM payment_certificates";

fn certificate_from_row(row: &Row<'_>) -> rusqlite::Result<(PaymentCertificate, String)> {
    let status: String = row.get(3)?;
    Ok((
        PaymentCertificate {
            id: row.get(0)?,
            project_id: row.get(1)?,
            certificate_number: row.get(2)?,
            status: CertificateStatus::Draft,
            is_final: row.get(4)?,
            notes: row.get(5)?,
            approved_on: row.get(6)?,
            approved_by: row.get(7)?,
            created_at: row.get(8)?,
        },
        status,
    ))
}

fn with_status((mut cert, status): (PaymentCertificate, String)) -> Result<PaymentCertificate> {
    cert.status = status.parse()?;
    Ok(cert)
}

pub fn certificate_ref(cert: &PaymentCertificate) -> CertificateRef {
    CertificateRef {
        id: cert.id,
        project_id: Some(cert.project_id),
        certificate_number: cert.certificate_number,
        status: cert.status,
    }
}

/// One past the highest number used so far in the project.
pub fn next_certificate_number(conn: &Connection, project_id: i64) -> Result<i64> {
    let next: i64 = conn.query_row(
        "SELECT COALESCE(MAX(certificate_number), 0) + 1 FROM payment_certificates WHERE project_id = ?1",
        [project_id],
        |r| r.get(0),
    )?;
    Ok(next)
}

pub fn create_certificate(
    conn: &Connection,
    project: &Project,
    is_final: bool,
    notes: &str,
) -> Result<PaymentCertificate> {
    if project.status == ProjectStatus::FinalAccountIssued {
        return Err(PaycertError::Other(format!(
            "Project {} already has its final account issued",
            project.name
        )));
    }
    let number = next_certificate_number(conn, project.id)?;
    conn.execute(
        "INSERT INTO payment_certificates (project_id, certificate_number, is_final, notes) \
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![project.id, number, is_final, notes],
    )?;
    tracing::info!(project = %project.name, number, "payment certificate created");
    get_certificate(conn, project, number)
}

pub fn list_certificates(conn: &Connection, project_id: i64) -> Result<Vec<PaymentCertificate>> {
    let sql = format!("{CERTIFICATE_SELECT} WHERE project_id = ?1 ORDER BY certificate_number");
    let mut stmt = conn.prepare(&sql)?;
    let raw = stmt
        .query_map([project_id], certificate_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    raw.into_iter().map(with_status).collect()
}

pub fn get_certificate(conn: &Connection, project: &Project, number: i64) -> Result<PaymentCertificate> {
    let sql = format!("{CERTIFICATE_SELECT} WHERE project_id = ?1 AND certificate_number = ?2");
    let raw = conn
        .query_row(&sql, [project.id, number], certificate_from_row)
        .optional()?
        .ok_or_else(|| PaycertError::UnknownCertificate {
            project: project.name.clone(),
            number,
        })?;
    with_status(raw)
}

/// Move a certificate through the approval workflow. Approving the final
/// certificate also closes the project's account, in the same transaction.
pub fn transition(
    conn: &Connection,
    project: &Project,
    number: i64,
    next: CertificateStatus,
    user: &str,
) -> Result<PaymentCertificate> {
    let cert = get_certificate(conn, project, number)?;
    if !cert.status.can_transition_to(next) {
        return Err(PaycertError::InvalidTransition {
            number,
            from: cert.status.to_string(),
            to: next.to_string(),
        });
    }

    let tx = conn.unchecked_transaction()?;
    if next == CertificateStatus::Approved {
        let approved_by = if user.is_empty() { None } else { Some(user) };
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        tx.execute(
            "UPDATE payment_certificates SET status = ?1, approved_on = ?2, approved_by = ?3 WHERE id = ?4",
            rusqlite::params![next.as_str(), now, approved_by, cert.id],
        )?;
        if cert.is_final {
            set_project_status(&tx, project.id, ProjectStatus::FinalAccountIssued)?;
            tx.execute(
                "UPDATE projects SET final_payment_certificate_id = ?1 WHERE id = ?2",
                [cert.id, project.id],
            )?;
            tracing::info!(project = %project.name, number, "final account issued");
        }
    } else {
        tx.execute(
            "UPDATE payment_certificates SET status = ?1 WHERE id = ?2",
            rusqlite::params![next.as_str(), cert.id],
        )?;
    }
    tx.commit()?;

    tracing::info!(
        project = %project.name,
        number,
        from = cert.status.as_str(),
        to = next.as_str(),
        "certificate status changed"
    );
    get_certificate(conn, project, number)
}

// ---------------------------------------------------------------------------
// Claims (actual transactions)
// ---------------------------------------------------------------------------

pub struct ClaimRow {
    pub id: i64,
    pub structure_name: String,
    pub item_number: String,
    pub description: String,
    pub unit_measurement: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub kind: LineKind,
    pub approved: bool,
    pub claimed: bool,
}

/// Capture work done against a line item. The price is fixed at capture time
/// from the line item's rate.
pub fn add_claim(
    conn: &Connection,
    cert: &PaymentCertificate,
    item: &LineItem,
    quantity: Decimal,
    approved: bool,
    claimed: bool,
) -> Result<i64> {
    if item.project_id != cert.project_id {
        return Err(PaycertError::UnknownLineItem(item.id));
    }
    if cert.status == CertificateStatus::Approved {
        return Err(PaycertError::Other(format!(
            "Payment certificate #{} is approved; claims can no longer change",
            cert.certificate_number
        )));
    }
    if quantity <= Decimal::ZERO {
        return Err(PaycertError::InvalidAmount(format!(
            "quantity must be greater than zero, got {quantity}"
        )));
    }
    let total = line_total(quantity, item.unit_price)?;
    conn.execute(
        "INSERT INTO actual_transactions (payment_certificate_id, line_item_id, quantity, unit_price, \
         total_price, approved, claimed) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            cert.id,
            item.id,
            quantity.to_string(),
            item.unit_price.to_string(),
            total.to_string(),
            approved,
            claimed,
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::debug!(certificate = cert.certificate_number, line_item = item.id, %total, "claim captured");
    Ok(id)
}

pub fn list_claims(conn: &Connection, certificate_id: i64) -> Result<Vec<ClaimRow>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, s.name, li.item_number, li.description, li.unit_measurement, \
         t.quantity, t.unit_price, t.total_price, li.addendum, li.special_item, t.approved, t.claimed \
         FROM actual_transactions t \
         JOIN line_items li ON t.line_item_id = li.id \
         JOIN structures s ON li.structure_id = s.id \
         WHERE t.payment_certificate_id = ?1 \
         ORDER BY s.name, li.row_index, t.id",
    )?;
    let rows = stmt
        .query_map([certificate_id], |row| {
            Ok(ClaimRow {
                id: row.get(0)?,
                structure_name: row.get(1)?,
                item_number: row.get(2)?,
                description: row.get(3)?,
                unit_measurement: row.get(4)?,
                quantity: decimal_at(row, 5)?,
                unit_price: decimal_at(row, 6)?,
                total_price: decimal_at(row, 7)?,
                kind: LineKind::from_flags(row.get(8)?, row.get(9)?),
                approved: row.get(10)?,
                claimed: row.get(11)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Snapshot every certificate and claim of a project for the calculator.
pub fn load_ledger(conn: &Connection, project_id: i64) -> Result<ProjectLedger> {
    let certificates = list_certificates(conn, project_id)?
        .iter()
        .map(certificate_ref)
        .collect();

    let mut stmt = conn.prepare(
        "SELECT t.payment_certificate_id, t.total_price, li.addendum, li.special_item, t.approved, t.claimed \
         FROM actual_transactions t \
         JOIN payment_certificates pc ON t.payment_certificate_id = pc.id \
         JOIN line_items li ON t.line_item_id = li.id \
         WHERE pc.project_id = ?1",
    )?;
    let lines = stmt
        .query_map([project_id], |row| {
            Ok(ClaimLine {
                certificate_id: row.get(0)?,
                amount: decimal_at(row, 1)?,
                kind: LineKind::from_flags(row.get(2)?, row.get(3)?),
                approved: row.get(4)?,
                claimed: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(ProjectLedger::new(project_id, certificates, lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::projects::fixtures::{d, item};
    use crate::projects::{add_line_item, add_project, add_structure, find_project, find_structure, get_line_item};

    fn setup(conn: &Connection) -> (Project, LineItem) {
        add_project(conn, "Clinic").unwrap();
        let p = find_project(conn, "Clinic").unwrap();
        add_structure(conn, p.id, "Block A", "").unwrap();
        let s = find_structure(conn, p.id, "Block A").unwrap();
        let id = add_line_item(conn, &s, &item("1.1", "Brickwork", "100", "50")).unwrap();
        let li = get_line_item(conn, p.id, id).unwrap();
        (p, li)
    }

    #[test]
    fn test_certificate_numbers_increment() {
        let (_dir, conn) = test_db();
        let (p, _) = setup(&conn);
        assert_eq!(next_certificate_number(&conn, p.id).unwrap(), 1);
        let c1 = create_certificate(&conn, &p, false, "").unwrap();
        let c2 = create_certificate(&conn, &p, false, "").unwrap();
        assert_eq!((c1.certificate_number, c2.certificate_number), (1, 2));
        assert_eq!(c1.status, CertificateStatus::Draft);
        assert_eq!(next_certificate_number(&conn, p.id).unwrap(), 3);
    }

    #[test]
    fn test_claim_total_is_quantity_times_rate() {
        let (_dir, conn) = test_db();
        let (p, li) = setup(&conn);
        let cert = create_certificate(&conn, &p, false, "").unwrap();
        add_claim(&conn, &cert, &li, d("2.5"), false, false).unwrap();
        let claims = list_claims(&conn, cert.id).unwrap();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].total_price, d("250"));
        assert_eq!(claims[0].kind, LineKind::Contract);
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let (_dir, conn) = test_db();
        let (p, li) = setup(&conn);
        let cert = create_certificate(&conn, &p, false, "").unwrap();
        assert!(add_claim(&conn, &cert, &li, Decimal::ZERO, false, false).is_err());
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let (_dir, conn) = test_db();
        let (p, li) = setup(&conn);
        let cert = create_certificate(&conn, &p, false, "").unwrap();
        let err = add_claim(&conn, &cert, &li, d("-5"), false, false).unwrap_err();
        assert!(matches!(err, PaycertError::InvalidAmount(_)));
        assert!(list_claims(&conn, cert.id).unwrap().is_empty());
        let ledger = load_ledger(&conn, p.id).unwrap();
        assert_eq!(ledger.current_claim_total(&certificate_ref(&cert)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_oversized_quantity_rejected_without_panic() {
        let (_dir, conn) = test_db();
        let (p, li) = setup(&conn);
        let cert = create_certificate(&conn, &p, false, "").unwrap();
        let qty = crate::fmt::parse_amount("79228162514264337593543950335").unwrap();
        let err = add_claim(&conn, &cert, &li, qty, false, false).unwrap_err();
        assert!(matches!(err, PaycertError::InvalidAmount(_)));
        assert!(list_claims(&conn, cert.id).unwrap().is_empty());
    }

    #[test]
    fn test_approval_workflow() {
        let (_dir, conn) = test_db();
        let (p, _) = setup(&conn);
        create_certificate(&conn, &p, false, "").unwrap();
        let submitted = transition(&conn, &p, 1, CertificateStatus::Submitted, "qs").unwrap();
        assert_eq!(submitted.status, CertificateStatus::Submitted);
        let approved = transition(&conn, &p, 1, CertificateStatus::Approved, "qs").unwrap();
        assert_eq!(approved.status, CertificateStatus::Approved);
        assert_eq!(approved.approved_by.as_deref(), Some("qs"));
        assert!(approved.approved_on.is_some());

        let err = transition(&conn, &p, 1, CertificateStatus::Draft, "qs").unwrap_err();
        assert!(matches!(err, PaycertError::InvalidTransition { number: 1, .. }));
    }

    #[test]
    fn test_approved_certificate_rejects_new_claims() {
        let (_dir, conn) = test_db();
        let (p, li) = setup(&conn);
        create_certificate(&conn, &p, false, "").unwrap();
        let approved = transition(&conn, &p, 1, CertificateStatus::Approved, "").unwrap();
        assert!(approved.approved_by.is_none());
        assert!(add_claim(&conn, &approved, &li, d("1"), false, false).is_err());
    }

    #[test]
    fn test_final_certificate_closes_project() {
        let (_dir, conn) = test_db();
        let (p, _) = setup(&conn);
        let cert = create_certificate(&conn, &p, true, "Final account").unwrap();
        transition(&conn, &p, 1, CertificateStatus::Approved, "qs").unwrap();
        let reloaded = find_project(&conn, "Clinic").unwrap();
        assert_eq!(reloaded.status, ProjectStatus::FinalAccountIssued);
        assert_eq!(reloaded.final_payment_certificate_id, Some(cert.id));
        assert!(create_certificate(&conn, &reloaded, false, "").is_err());
    }

    #[test]
    fn test_unknown_certificate() {
        let (_dir, conn) = test_db();
        let (p, _) = setup(&conn);
        assert!(matches!(
            get_certificate(&conn, &p, 9),
            Err(PaycertError::UnknownCertificate { number: 9, .. })
        ));
    }

    #[test]
    fn test_load_ledger_matches_scenario() {
        let (_dir, conn) = test_db();
        let (p, li) = setup(&conn);
        for (qty, approve) in [("10", true), ("5", true), ("2", false)] {
            let cert = create_certificate(&conn, &p, false, "").unwrap();
            add_claim(&conn, &cert, &li, d(qty), false, false).unwrap();
            if approve {
                transition(&conn, &p, cert.certificate_number, CertificateStatus::Approved, "qs").unwrap();
            }
        }
        let ledger = load_ledger(&conn, p.id).unwrap();
        let third = certificate_ref(&get_certificate(&conn, &p, 3).unwrap());
        assert_eq!(ledger.progressive_previous(&third).unwrap(), d("1500"));
        assert_eq!(ledger.current_claim_total(&third).unwrap(), d("200"));
        assert_eq!(ledger.progressive_to_date(&third).unwrap(), d("1700"));
        let first = certificate_ref(&get_certificate(&conn, &p, 1).unwrap());
        assert_eq!(ledger.progressive_previous(&first).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_load_ledger_excludes_other_projects() {
        let (_dir, conn) = test_db();
        let (p, li) = setup(&conn);
        add_project(&conn, "Depot").unwrap();
        let other = find_project(&conn, "Depot").unwrap();
        add_structure(&conn, other.id, "Shed", "").unwrap();
        let s = find_structure(&conn, other.id, "Shed").unwrap();
        let other_item_id = add_line_item(&conn, &s, &item("9", "Roof sheets", "1000", "1")).unwrap();
        let other_item = get_line_item(&conn, other.id, other_item_id).unwrap();

        let foreign = create_certificate(&conn, &other, false, "").unwrap();
        add_claim(&conn, &foreign, &other_item, d("3"), false, false).unwrap();
        transition(&conn, &other, 1, CertificateStatus::Approved, "").unwrap();

        let mine = create_certificate(&conn, &p, false, "").unwrap();
        create_certificate(&conn, &p, false, "").unwrap();
        add_claim(&conn, &mine, &li, d("1"), false, false).unwrap();

        let ledger = load_ledger(&conn, p.id).unwrap();
        let second = certificate_ref(&get_certificate(&conn, &p, 2).unwrap());
        assert_eq!(ledger.progressive_previous(&second).unwrap(), Decimal::ZERO);

        let foreign_ref = certificate_ref(&get_certificate(&conn, &other, 1).unwrap());
        assert!(matches!(
            ledger.progressive_previous(&foreign_ref),
            Err(PaycertError::ScopeViolation { .. })
        ));
        // A line item from another project cannot be claimed here.
        assert!(add_claim(&conn, &mine, &other_item, d("1"), false, false).is_err());
    }
}
