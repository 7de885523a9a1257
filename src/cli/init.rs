use std::io::Write;
use std::path::PathBuf;

use crate::db::{get_connection, init_db, set_metadata, DB_FILE};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_file_exists, shellexpand_path};

pub fn run(data_dir: Option<String>, company: Option<String>, user: Option<String>) -> Result<()> {
    let mut settings = load_settings();

    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    } else if !settings_file_exists() {
        print!("Data directory [{}]: ", settings.data_dir);
        std::io::stdout().flush()?;
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        let chosen = input.trim();
        if !chosen.is_empty() {
            settings.data_dir = shellexpand_path(chosen);
        }
    }
    if let Some(name) = user {
        settings.user_name = name;
    }

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;
    std::fs::create_dir_all(resolved.join("exports"))?;
    save_settings(&settings)?;

    let conn = get_connection(&resolved.join(DB_FILE))?;
    init_db(&conn)?;
    if let Some(name) = company {
        set_metadata(&conn, "company_name", &name)?;
    }

    tracing::info!(data_dir = %resolved.display(), "initialized");
    println!("Initialized paycert at {}", resolved.display());
    Ok(())
}
