use crate::db::{get_connection, get_metadata, DB_FILE};
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::settings::{load_settings, settings_file_exists};

fn count(conn: &rusqlite::Connection, table: &str) -> Result<i64> {
    Ok(conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))?)
}

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    let db_path = data_dir.join(DB_FILE);

    if !settings_file_exists() {
        println!("Settings:   (defaults, run `paycert init`)");
    }
    println!("User:       {}", if settings.user_name.is_empty() { "(not set)" } else { &settings.user_name });
    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());

    if db_path.exists() {
        let size = std::fs::metadata(&db_path)?.len();
        println!("DB size:    {}", format_bytes(size));

        let conn = get_connection(&db_path)?;
        let company = get_metadata(&conn, "company_name");
        println!("Company:    {}", company.as_deref().unwrap_or("(not set)"));

        let drafts: i64 = conn.query_row(
            "SELECT count(*) FROM payment_certificates WHERE status IN ('DRAFT', 'SUBMITTED')",
            [],
            |r| r.get(0),
        )?;

        println!();
        println!("Projects:      {}", count(&conn, "projects")?);
        println!("Structures:    {}", count(&conn, "structures")?);
        println!("Line items:    {}", count(&conn, "line_items")?);
        println!("Certificates:  {}", count(&conn, "payment_certificates")?);
        println!("  pending:     {drafts}");
        println!("Payments:      {}", count(&conn, "payments")?);
    } else {
        println!();
        println!("Database not found. Run `paycert init` to set up.");
    }

    Ok(())
}
