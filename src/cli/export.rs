use std::path::{Path, PathBuf};

use crate::cli::open_db;
use crate::db::get_metadata;
use crate::error::Result;
use crate::projects::find_project;
use crate::reports;
use crate::settings::get_data_dir;

fn slug(name: &str) -> String {
    let mut out = String::new();
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

fn default_path(name: &str) -> PathBuf {
    let date = chrono::Local::now().format("%Y-%m-%d").to_string();
    get_data_dir().join("exports").join(format!("{name}-{date}.pdf"))
}

fn write_pdf(bytes: &[u8], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "pdf written");
    println!("Wrote {}", path.display());
    Ok(())
}

pub fn cert(project: &str, number: i64, abridged: bool, output: Option<String>) -> Result<()> {
    let conn = open_db()?;
    let p = find_project(&conn, project)?;
    let report = reports::get_certificate_report(&conn, &p, number)?;
    let company = get_metadata(&conn, "company_name").unwrap_or_default();
    let bytes = if abridged {
        crate::pdf::render_certificate_abridged(&report, &company)?
    } else {
        crate::pdf::render_certificate(&report, &company)?
    };
    let kind = if abridged { "certificate-abridged" } else { "certificate" };
    let path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| default_path(&format!("{}-{kind}-{number}", slug(&p.name))));
    write_pdf(&bytes, &path)
}

pub fn statement(project: &str, output: Option<String>) -> Result<()> {
    let conn = open_db()?;
    let p = find_project(&conn, project)?;
    let report = reports::get_project_statement(&conn, &p)?;
    let company = get_metadata(&conn, "company_name").unwrap_or_default();
    let bytes = crate::pdf::render_statement(&report, &company)?;
    let path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| default_path(&format!("{}-statement", slug(&p.name))));
    write_pdf(&bytes, &path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug() {
        assert_eq!(slug("Clinic Upgrade (Phase 2)"), "clinic-upgrade-phase-2");
        assert_eq!(slug("N1/R101"), "n1-r101");
    }
}
