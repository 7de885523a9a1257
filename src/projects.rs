use rusqlite::{Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use crate::db::decimal_at;
use crate::error::{PaycertError, Result};
use crate::fmt::{checked_add, line_total};
use crate::models::{LineItem, Payment, Project, ProjectStatus, Structure};

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<(i64, String, String, Option<i64>)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn build_project((id, name, status, final_id): (i64, String, String, Option<i64>)) -> Result<Project> {
    Ok(Project {
        id,
        name,
        status: status.parse()?,
        final_payment_certificate_id: final_id,
    })
}

pub fn add_project(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute("INSERT INTO projects (name) VALUES (?1)", [name])?;
    let id = conn.last_insert_rowid();
    tracing::info!(project = name, id, "project created");
    Ok(id)
}

pub fn list_projects(conn: &Connection) -> Result<Vec<Project>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, status, final_payment_certificate_id FROM projects ORDER BY name",
    )?;
    let raw = stmt
        .query_map([], project_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    raw.into_iter().map(build_project).collect()
}

pub fn find_project(conn: &Connection, name: &str) -> Result<Project> {
    let raw = conn
        .query_row(
            "SELECT id, name, status, final_payment_certificate_id FROM projects WHERE name = ?1",
            [name],
            project_from_row,
        )
        .optional()?
        .ok_or_else(|| PaycertError::UnknownProject(name.to_string()))?;
    build_project(raw)
}

pub fn set_project_status(conn: &Connection, project_id: i64, status: ProjectStatus) -> Result<()> {
    conn.execute(
        "UPDATE projects SET status = ?1 WHERE id = ?2",
        rusqlite::params![status.as_str(), project_id],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Structures
// ---------------------------------------------------------------------------

pub fn add_structure(conn: &Connection, project_id: i64, name: &str, description: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO structures (project_id, name, description) VALUES (?1, ?2, ?3)",
        rusqlite::params![project_id, name, description],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_structures(conn: &Connection, project_id: i64) -> Result<Vec<Structure>> {
    let mut stmt = conn.prepare(
        "SELECT id, project_id, name, description FROM structures \
         WHERE project_id = ?1 ORDER BY name",
    )?;
    let rows = stmt
        .query_map([project_id], |row| {
            Ok(Structure {
                id: row.get(0)?,
                project_id: row.get(1)?,
                name: row.get(2)?,
                description: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn find_structure(conn: &Connection, project_id: i64, name: &str) -> Result<Structure> {
    list_structures(conn, project_id)?
        .into_iter()
        .find(|s| s.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| PaycertError::UnknownStructure(name.to_string()))
}

// ---------------------------------------------------------------------------
// Bill of quantities line items
// ---------------------------------------------------------------------------

pub struct NewLineItem<'a> {
    pub item_number: &'a str,
    pub payment_reference: &'a str,
    pub description: &'a str,
    pub unit_measurement: &'a str,
    pub unit_price: Decimal,
    pub budgeted_quantity: Decimal,
    pub addendum: bool,
    pub special_item: bool,
}

pub fn add_line_item(conn: &Connection, structure: &Structure, item: &NewLineItem<'_>) -> Result<i64> {
    let next_row: i64 = conn.query_row(
        "SELECT COALESCE(MAX(row_index), 0) + 1 FROM line_items WHERE project_id = ?1",
        [structure.project_id],
        |r| r.get(0),
    )?;
    let total = line_total(item.budgeted_quantity, item.unit_price)?;
    conn.execute(
        "INSERT INTO line_items (project_id, structure_id, row_index, item_number, payment_reference, \
         description, unit_measurement, unit_price, budgeted_quantity, total_price, addendum, special_item) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        rusqlite::params![
            structure.project_id,
            structure.id,
            next_row,
            item.item_number,
            item.payment_reference,
            item.description,
            item.unit_measurement,
            item.unit_price.to_string(),
            item.budgeted_quantity.to_string(),
            total.to_string(),
            item.addendum,
            item.special_item,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

const LINE_ITEM_SELECT: &str = "SELECT li.id, li.project_id, li.structure_id, s.name, li.row_index, \
     li.item_number, li.payment_reference, li.description, li.unit_measurement, \
     li.unit_price, li.budgeted_quantity, li.total_price, li.addendum, li.special_item \
     FROM line_items li JOIN structures s ON li.structure_id = s.id";

fn line_item_from_row(row: &Row<'_>) -> rusqlite::Result<LineItem> {
    Ok(LineItem {
        id: row.get(0)?,
        project_id: row.get(1)?,
        structure_id: row.get(2)?,
        structure_name: row.get(3)?,
        row_index: row.get(4)?,
        item_number: row.get(5)?,
        payment_reference: row.get(6)?,
        description: row.get(7)?,
        unit_measurement: row.get(8)?,
        unit_price: decimal_at(row, 9)?,
        budgeted_quantity: decimal_at(row, 10)?,
        total_price: decimal_at(row, 11)?,
        addendum: row.get(12)?,
        special_item: row.get(13)?,
    })
}

pub fn list_line_items(conn: &Connection, project_id: i64) -> Result<Vec<LineItem>> {
    let sql = format!("{LINE_ITEM_SELECT} WHERE li.project_id = ?1 ORDER BY li.row_index");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([project_id], line_item_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_line_item(conn: &Connection, project_id: i64, id: i64) -> Result<LineItem> {
    let sql = format!("{LINE_ITEM_SELECT} WHERE li.project_id = ?1 AND li.id = ?2");
    conn.query_row(&sql, [project_id, id], line_item_from_row)
        .optional()?
        .ok_or(PaycertError::UnknownLineItem(id))
}

/// Contract values of a project, split the way certificates report them.
/// `revised` is original plus addendum; `total` adds special items too.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ContractValues {
    pub original: Decimal,
    pub addendum: Decimal,
    pub special: Decimal,
    pub revised: Decimal,
    pub total: Decimal,
}

pub fn contract_values(items: &[LineItem]) -> Result<ContractValues> {
    let mut values = ContractValues::default();
    for item in items {
        let bucket = if item.special_item {
            &mut values.special
        } else if item.addendum {
            &mut values.addendum
        } else {
            &mut values.original
        };
        *bucket = checked_add(*bucket, item.total_price)?;
    }
    values.revised = checked_add(values.original, values.addendum)?;
    values.total = checked_add(values.revised, values.special)?;
    Ok(values)
}

// ---------------------------------------------------------------------------
// Payments received
// ---------------------------------------------------------------------------

pub fn add_payment(conn: &Connection, project_id: i64, date: &str, amount: Decimal) -> Result<i64> {
    if amount <= Decimal::ZERO {
        return Err(PaycertError::InvalidAmount(amount.to_string()));
    }
    conn.execute(
        "INSERT INTO payments (project_id, date, amount) VALUES (?1, ?2, ?3)",
        rusqlite::params![project_id, date, amount.to_string()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_payments(conn: &Connection, project_id: i64) -> Result<Vec<Payment>> {
    let mut stmt = conn.prepare(
        "SELECT id, project_id, date, amount FROM payments WHERE project_id = ?1 ORDER BY date, id",
    )?;
    let rows = stmt
        .query_map([project_id], |row| {
            Ok(Payment {
                id: row.get(0)?,
                project_id: row.get(1)?,
                date: row.get(2)?,
                amount: decimal_at(row, 3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use std::str::FromStr;

    pub fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    pub fn item<'a>(number: &'a str, description: &'a str, rate: &str, qty: &str) -> NewLineItem<'a> {
        NewLineItem {
            item_number: number,
            payment_reference: "",
            description,
            unit_measurement: "m2",
            unit_price: d(rate),
            budgeted_quantity: d(qty),
            addendum: false,
            special_item: false,
        }
    }
}
