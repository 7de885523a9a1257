use rusqlite::Connection;

use crate::certificates::{add_claim, create_certificate, transition};
use crate::cli::open_db;
use crate::db::{get_metadata, init_db, set_metadata};
use crate::error::Result;
use crate::fmt::parse_amount;
use crate::models::{CertificateStatus, ProjectStatus};
use crate::projects::{
    add_line_item, add_payment, add_project, add_structure, find_project, find_structure, get_line_item,
    set_project_status, NewLineItem,
};
use crate::settings::load_settings;

const PROJECT_NAME: &str = "Demo Clinic Upgrade";

struct DemoItem {
    structure: &'static str,
    number: &'static str,
    description: &'static str,
    unit: &'static str,
    quantity: &'static str,
    rate: &'static str,
    addendum: bool,
    special: bool,
}

const STRUCTURES: &[(&str, &str)] = &[
    ("Clinic Block", "Main single-storey clinic building"),
    ("Guard House", "Entrance guard house"),
    ("External Works", "Paving, fencing and stormwater"),
];

const ITEMS: &[DemoItem] = &[
    DemoItem { structure: "Clinic Block", number: "1.1", description: "Site clearance", unit: "m2", quantity: "1200", rate: "12.50", addendum: false, special: false },
    DemoItem { structure: "Clinic Block", number: "1.2", description: "Excavation for foundations", unit: "m3", quantity: "180", rate: "145.00", addendum: false, special: false },
    DemoItem { structure: "Clinic Block", number: "1.3", description: "Concrete 25MPa in foundations", unit: "m3", quantity: "95", rate: "1850.00", addendum: false, special: false },
    DemoItem { structure: "Clinic Block", number: "1.4", description: "Face brickwork 230mm", unit: "m2", quantity: "640", rate: "420.00", addendum: false, special: false },
    DemoItem { structure: "Guard House", number: "2.1", description: "Brickwork 110mm", unit: "m2", quantity: "85", rate: "310.00", addendum: false, special: false },
    DemoItem { structure: "Guard House", number: "2.2", description: "Roof sheeting", unit: "m2", quantity: "32", rate: "275.00", addendum: false, special: false },
    DemoItem { structure: "External Works", number: "3.1", description: "Interlocking paving", unit: "m2", quantity: "900", rate: "195.00", addendum: false, special: false },
    DemoItem { structure: "External Works", number: "3.2", description: "Additional palisade fencing", unit: "m", quantity: "150", rate: "680.00", addendum: true, special: false },
    DemoItem { structure: "External Works", number: "3.3", description: "Removal of unforeseen rock", unit: "m3", quantity: "40", rate: "950.00", addendum: false, special: true },
];

/// (certificate number, item number, quantity)
const CLAIMS: &[(i64, &str, &str)] = &[
    (1, "1.1", "1200"),
    (1, "1.2", "180"),
    (2, "1.3", "95"),
    (2, "1.4", "250"),
    (2, "3.3", "12"),
    (3, "1.4", "300"),
    (3, "2.1", "85"),
    (3, "3.2", "60"),
];

const PAYMENTS: &[(&str, &str)] = &[("2026-02-15", "40000.00"), ("2026-04-10", "250000.00")];

fn insert_demo_data(conn: &Connection) -> Result<usize> {
    let pid = add_project(conn, PROJECT_NAME)?;
    let project = find_project(conn, PROJECT_NAME)?;
    set_project_status(conn, pid, ProjectStatus::Active)?;

    for (name, description) in STRUCTURES {
        add_structure(conn, pid, name, description)?;
    }
    let mut item_ids = Vec::new();
    for it in ITEMS {
        let structure = find_structure(conn, pid, it.structure)?;
        let id = add_line_item(
            conn,
            &structure,
            &NewLineItem {
                item_number: it.number,
                payment_reference: "",
                description: it.description,
                unit_measurement: it.unit,
                unit_price: parse_amount(it.rate)?,
                budgeted_quantity: parse_amount(it.quantity)?,
                addendum: it.addendum,
                special_item: it.special,
            },
        )?;
        item_ids.push((it.number, id));
    }

    let user = load_settings().user_name;
    let mut claims = 0;
    for number in 1..=3 {
        let cert = create_certificate(conn, &project, false, "")?;
        for (_, item_number, qty) in CLAIMS.iter().filter(|(n, _, _)| *n == number) {
            let id = item_ids
                .iter()
                .find(|(n, _)| n == item_number)
                .map(|(_, id)| *id)
                .unwrap_or_default();
            let item = get_line_item(conn, pid, id)?;
            add_claim(conn, &cert, &item, parse_amount(qty)?, true, number < 3)?;
            claims += 1;
        }
        // The latest certificate stays in draft.
        if number < 3 {
            transition(conn, &project, number, CertificateStatus::Approved, &user)?;
        }
    }

    for (date, amount) in PAYMENTS {
        add_payment(conn, pid, date, parse_amount(amount)?)?;
    }
    Ok(claims)
}

pub fn run() -> Result<()> {
    let conn = open_db()?;
    init_db(&conn)?;

    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM projects WHERE name = ?1)",
        [PROJECT_NAME],
        |r| r.get(0),
    )?;
    if exists {
        println!("Demo data already loaded (project '{PROJECT_NAME}' exists).");
        return Ok(());
    }

    let tx = conn.unchecked_transaction()?;
    let claims = insert_demo_data(&tx)?;
    if get_metadata(&tx, "company_name").is_none() {
        set_metadata(&tx, "company_name", "Demo Civils (Pty) Ltd")?;
    }
    tx.commit()?;

    println!("Demo data loaded!");
    println!("  Project:       {PROJECT_NAME}");
    println!("  Structures:    {}", STRUCTURES.len());
    println!("  Line items:    {}", ITEMS.len());
    println!("  Certificates:  3 (2 approved, 1 draft)");
    println!("  Claim lines:   {claims}");
    println!("  Payments:      {}", PAYMENTS.len());
    println!();
    println!("Try: paycert report statement --project \"{PROJECT_NAME}\"");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::reports::{get_certificate_report, get_project_statement};
    use crate::projects::fixtures::d;

    #[test]
    fn test_demo_data_is_consistent() {
        let (_dir, conn) = test_db();
        let claims = insert_demo_data(&conn).unwrap();
        assert_eq!(claims, CLAIMS.len());

        let p = find_project(&conn, PROJECT_NAME).unwrap();
        let third = get_certificate_report(&conn, &p, 3).unwrap();
        // 15000 + 26100 approved on #1; 175750 + 105000 + 11400 on #2
        assert_eq!(third.total.previous, d("333250"));
        assert_eq!(third.certificate.status, CertificateStatus::Draft);

        let s = get_project_statement(&conn, &p).unwrap();
        assert_eq!(s.certified_to_date, d("333250"));
        assert_eq!(s.outstanding, d("43250"));
    }
}
