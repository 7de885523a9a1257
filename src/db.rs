use std::path::Path;
use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use crate::error::Result;

pub const DB_FILE: &str = "paycert.db";

// Monetary and quantity columns are TEXT holding canonical decimal strings.
// Never aggregate them with SQL SUM(): that goes through REAL.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL DEFAULT 'SETUP',
    final_payment_certificate_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (final_payment_certificate_id) REFERENCES payment_certificates(id)
);

CREATE TABLE IF NOT EXISTS structures (
    id INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    created_at TEXT DEFAULT (datetime('now')),
    UNIQUE (project_id, name),
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS line_items (
    id INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL,
    structure_id INTEGER NOT NULL,
    row_index INTEGER NOT NULL,
    item_number TEXT NOT NULL DEFAULT '',
    payment_reference TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    unit_measurement TEXT NOT NULL DEFAULT '',
    unit_price TEXT NOT NULL DEFAULT '0',
    budgeted_quantity TEXT NOT NULL DEFAULT '0',
    total_price TEXT NOT NULL DEFAULT '0',
    addendum INTEGER NOT NULL DEFAULT 0,
    special_item INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE,
    FOREIGN KEY (structure_id) REFERENCES structures(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS payment_certificates (
    id INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL,
    certificate_number INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'DRAFT',
    is_final INTEGER NOT NULL DEFAULT 0,
    notes TEXT NOT NULL DEFAULT '',
    approved_on TEXT,
    approved_by TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    UNIQUE (project_id, certificate_number),
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_certificates_number_status
    ON payment_certificates (certificate_number, status);

CREATE TABLE IF NOT EXISTS actual_transactions (
    id INTEGER PRIMARY KEY,
    payment_certificate_id INTEGER NOT NULL,
    line_item_id INTEGER NOT NULL,
    quantity TEXT NOT NULL,
    unit_price TEXT NOT NULL,
    total_price TEXT NOT NULL,
    approved INTEGER NOT NULL DEFAULT 0,
    claimed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (payment_certificate_id) REFERENCES payment_certificates(id) ON DELETE CASCADE,
    FOREIGN KEY (line_item_id) REFERENCES line_items(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_transactions_certificate_item
    ON actual_transactions (payment_certificate_id, line_item_id);

CREATE TABLE IF NOT EXISTS payments (
    id INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    amount TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    tracing::debug!("schema ensured");
    Ok(())
}

pub fn get_metadata(conn: &Connection, key: &str) -> Option<String> {
    conn.query_row("SELECT value FROM metadata WHERE key = ?1", [key], |r| r.get(0))
        .optional()
        .ok()
        .flatten()
}

pub fn set_metadata(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO metadata (key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

/// Read a TEXT decimal column. Malformed values surface as a conversion error
/// rather than being coerced to zero.
pub fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(raw.trim())
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let conn = get_connection(&dir.path().join("test.db")).unwrap();
    init_db(&conn).unwrap();
    (dir, conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &[
            "metadata",
            "projects",
            "structures",
            "line_items",
            "payment_certificates",
            "actual_transactions",
            "payments",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_metadata_upsert() {
        let (_dir, conn) = test_db();
        assert_eq!(get_metadata(&conn, "company_name"), None);
        set_metadata(&conn, "company_name", "Acme Civils").unwrap();
        set_metadata(&conn, "company_name", "Acme Civils (Pty) Ltd").unwrap();
        assert_eq!(
            get_metadata(&conn, "company_name").as_deref(),
            Some("Acme Civils (Pty) Ltd")
        );
    }

    #[test]
    fn test_certificate_numbers_unique_per_project() {
        let (_dir, conn) = test_db();
        conn.execute("INSERT INTO projects (name) VALUES ('A')", []).unwrap();
        let a = conn.last_insert_rowid();
        conn.execute("INSERT INTO projects (name) VALUES ('B')", []).unwrap();
        let b = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO payment_certificates (project_id, certificate_number) VALUES (?1, 1)",
            [a],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO payment_certificates (project_id, certificate_number) VALUES (?1, 1)",
            [b],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO payment_certificates (project_id, certificate_number) VALUES (?1, 1)",
            [a],
        );
        assert!(dup.is_err());
    }

    #[test]
    fn test_decimal_at_rejects_garbage() {
        let (_dir, conn) = test_db();
        let ok: Decimal = conn.query_row("SELECT '12.345'", [], |r| decimal_at(r, 0)).unwrap();
        assert_eq!(ok.to_string(), "12.345");
        let bad = conn.query_row("SELECT 'abc'", [], |r| decimal_at(r, 0));
        assert!(bad.is_err());
    }
}
