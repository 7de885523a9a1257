use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::projects::{add_structure, find_project, list_structures};

pub fn add(project: &str, name: &str, description: &str) -> Result<()> {
    let conn = open_db()?;
    let p = find_project(&conn, project)?;
    add_structure(&conn, p.id, name, description)?;
    println!("Added structure {name} to {}", p.name);
    Ok(())
}

pub fn list(project: &str) -> Result<()> {
    let conn = open_db()?;
    let p = find_project(&conn, project)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Description"]);
    for s in list_structures(&conn, p.id)? {
        table.add_row(vec![Cell::new(s.id), Cell::new(s.name), Cell::new(s.description)]);
    }
    println!("Structures of {}\n{table}", p.name);
    Ok(())
}
