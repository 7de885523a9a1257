use comfy_table::{Cell, CellAlignment, Table};

use crate::certificates::{self, get_certificate, list_claims};
use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::{line_total, money, parse_amount, quantity};
use crate::picker::LineItemPicker;
use crate::projects::{find_project, get_line_item, list_line_items, list_structures};
use crate::tui::run_view;

pub fn add(project: &str, cert: i64, item: i64, qty: &str, approved: bool, claimed: bool) -> Result<()> {
    let conn = open_db()?;
    let p = find_project(&conn, project)?;
    let certificate = get_certificate(&conn, &p, cert)?;
    let line_item = get_line_item(&conn, p.id, item)?;
    let qty = parse_amount(qty)?;
    certificates::add_claim(&conn, &certificate, &line_item, qty, approved, claimed)?;
    let total = line_total(qty, line_item.unit_price)?;
    println!(
        "Claimed {} x {} on certificate #{} ({})",
        line_item.item_number,
        quantity(qty),
        cert,
        money(total)
    );
    Ok(())
}

pub fn capture(project: &str, cert: i64) -> Result<()> {
    let conn = open_db()?;
    let p = find_project(&conn, project)?;
    let certificate = get_certificate(&conn, &p, cert)?;
    let items = list_line_items(&conn, p.id)?;
    if items.is_empty() {
        println!("No line items for {}. Add some with `paycert item add`.", p.name);
        return Ok(());
    }
    let structures = list_structures(&conn, p.id)?;
    let mut picker = LineItemPicker::new(&conn, &p.name, certificate, &structures, items)?;
    run_view(&mut picker)?;
    println!("Captured {} claim line(s) on certificate #{cert}", picker.captured());
    Ok(())
}

pub fn list(project: &str, cert: i64) -> Result<()> {
    let conn = open_db()?;
    let p = find_project(&conn, project)?;
    let certificate = get_certificate(&conn, &p, cert)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Structure", "Item", "Description", "Qty", "Rate", "Amount", "Sub", "Clm"]);
    for c in list_claims(&conn, certificate.id)? {
        table.add_row(vec![
            Cell::new(c.id),
            Cell::new(c.structure_name),
            Cell::new(c.item_number),
            Cell::new(c.description),
            Cell::new(quantity(c.quantity)).set_alignment(CellAlignment::Right),
            Cell::new(money(c.unit_price)).set_alignment(CellAlignment::Right),
            Cell::new(money(c.total_price)).set_alignment(CellAlignment::Right),
            Cell::new(if c.approved { "x" } else { "" }),
            Cell::new(if c.claimed { "x" } else { "" }),
        ]);
    }
    println!("Claims on certificate #{cert} of {}\n{table}", p.name);
    Ok(())
}
