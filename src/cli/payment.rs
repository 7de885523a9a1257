use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::open_db;
use crate::error::{PaycertError, Result};
use crate::fmt::{checked_sum, money, parse_amount};
use crate::projects::{add_payment, find_project, list_payments};

fn validate_date(date: &str) -> Result<()> {
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| PaycertError::Other(format!("Invalid date {date}, expected YYYY-MM-DD")))
}

pub fn add(project: &str, amount: &str, date: Option<String>) -> Result<()> {
    let conn = open_db()?;
    let p = find_project(&conn, project)?;
    let amount = parse_amount(amount)?;
    let date = date.unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
    validate_date(&date)?;
    add_payment(&conn, p.id, &date, amount)?;
    println!("Recorded payment of {} on {date} for {}", money(amount), p.name);
    Ok(())
}

pub fn list(project: &str) -> Result<()> {
    let conn = open_db()?;
    let p = find_project(&conn, project)?;
    let payments = list_payments(&conn, p.id)?;
    let total = checked_sum(payments.iter().map(|p| p.amount))?;

    let mut table = Table::new();
    table.set_header(vec!["Date", "Amount"]);
    for pay in &payments {
        table.add_row(vec![
            Cell::new(&pay.date),
            Cell::new(money(pay.amount)).set_alignment(CellAlignment::Right),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total"),
        Cell::new(money(total)).set_alignment(CellAlignment::Right),
    ]);
    println!("Payments received for {}\n{table}", p.name);
    Ok(())
}
