use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::filter::{FilterOption, OptionFilter};
use crate::fmt::{line_total, money, parse_amount, quantity};
use crate::models::LineItem;
use crate::projects::{add_line_item, find_project, find_structure, list_line_items, NewLineItem};

pub struct AddArgs {
    pub project: String,
    pub structure: String,
    pub number: String,
    pub description: String,
    pub unit: String,
    pub quantity: String,
    pub rate: String,
    pub reference: String,
    pub addendum: bool,
    pub special: bool,
}

pub fn add(args: AddArgs) -> Result<()> {
    let conn = open_db()?;
    let p = find_project(&conn, &args.project)?;
    let s = find_structure(&conn, p.id, &args.structure)?;
    let item = NewLineItem {
        item_number: &args.number,
        payment_reference: &args.reference,
        description: &args.description,
        unit_measurement: &args.unit,
        unit_price: parse_amount(&args.rate)?,
        budgeted_quantity: parse_amount(&args.quantity)?,
        addendum: args.addendum,
        special_item: args.special,
    };
    let id = add_line_item(&conn, &s, &item)?;
    let total = line_total(item.budgeted_quantity, item.unit_price)?;
    println!(
        "Added line item {id}: {} {} ({})",
        args.number,
        args.description,
        money(total)
    );
    Ok(())
}

/// Narrow the items the same way the interactive picker does.
fn filter_items(items: &[LineItem], structure_id: Option<i64>, search: &str) -> Vec<i64> {
    let options = items
        .iter()
        .map(|li| {
            FilterOption::new(
                &li.id.to_string(),
                &li.item_number,
                &li.structure_id.to_string(),
                &format!("{} {} {}", li.item_number, li.description, li.payment_reference),
            )
        })
        .collect();
    let mut filter = OptionFilter::new(options);
    filter.set_structure_filter(&structure_id.map(|id| id.to_string()).unwrap_or_default());
    filter.set_search_term(search);
    filter
        .visible_values()
        .into_iter()
        .filter_map(|v| v.parse().ok())
        .collect()
}

pub fn list(project: &str, structure: Option<&str>, search: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let p = find_project(&conn, project)?;
    let structure_id = match structure {
        Some(name) => Some(find_structure(&conn, p.id, name)?.id),
        None => None,
    };
    let items = list_line_items(&conn, p.id)?;
    let ids = filter_items(&items, structure_id, search.unwrap_or(""));

    let mut table = Table::new();
    table.set_header(vec!["ID", "Structure", "Item", "Description", "Unit", "Qty", "Rate", "Amount", "Kind"]);
    for li in items.iter().filter(|li| ids.contains(&li.id)) {
        let kind = match (li.addendum, li.special_item) {
            (_, true) => "special",
            (true, false) => "addendum",
            _ => "",
        };
        table.add_row(vec![
            Cell::new(li.id),
            Cell::new(&li.structure_name),
            Cell::new(&li.item_number),
            Cell::new(&li.description),
            Cell::new(&li.unit_measurement),
            Cell::new(quantity(li.budgeted_quantity)).set_alignment(CellAlignment::Right),
            Cell::new(money(li.unit_price)).set_alignment(CellAlignment::Right),
            Cell::new(money(li.total_price)).set_alignment(CellAlignment::Right),
            Cell::new(kind),
        ]);
    }
    println!("Line items of {} ({})\n{table}", p.name, ids.len());
    Ok(())
}
