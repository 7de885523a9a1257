use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::{PaycertError, Result};
use crate::fmt::money;
use crate::models::ProjectStatus;
use crate::projects::{self, contract_values, find_project, list_line_items, set_project_status};

pub fn add(name: &str) -> Result<()> {
    let conn = open_db()?;
    projects::add_project(&conn, name)?;
    println!("Added project: {name}");
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let rows = projects::list_projects(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Status"]);
    for p in rows {
        table.add_row(vec![Cell::new(p.id), Cell::new(&p.name), Cell::new(p.status)]);
    }
    println!("Projects\n{table}");
    Ok(())
}

pub fn activate(name: &str) -> Result<()> {
    let conn = open_db()?;
    let project = find_project(&conn, name)?;
    if project.status == ProjectStatus::FinalAccountIssued {
        return Err(PaycertError::Other(format!(
            "Project {name} already has its final account issued"
        )));
    }
    set_project_status(&conn, project.id, ProjectStatus::Active)?;
    println!("Project {name} is now {}", ProjectStatus::Active);
    Ok(())
}

pub fn values(name: &str) -> Result<()> {
    let conn = open_db()?;
    let project = find_project(&conn, name)?;
    let v = contract_values(&list_line_items(&conn, project.id)?)?;

    let mut table = Table::new();
    table.set_header(vec!["Contract value", "Amount"]);
    table.add_row(vec![Cell::new("Original"), Cell::new(money(v.original))]);
    table.add_row(vec![Cell::new("Addendum"), Cell::new(money(v.addendum))]);
    table.add_row(vec![Cell::new("Revised".bold()), Cell::new(money(v.revised))]);
    table.add_row(vec![Cell::new("Special items"), Cell::new(money(v.special))]);
    table.add_row(vec![Cell::new("Total".bold()), Cell::new(money(v.total))]);
    println!("{}\n{table}", project.name);
    Ok(())
}
