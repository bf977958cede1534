pub mod migrations;
pub mod repository;

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;

use crate::error::AppError;

pub const STORE_FILE_NAME: &str = "sortdeck.db";

/// Per-user location of the session store, e.g. `~/.local/share/sortdeck/sortdeck.db`.
pub fn default_store_path() -> Result<PathBuf, AppError> {
    let dirs = directories::ProjectDirs::from("", "", "sortdeck")
        .ok_or_else(|| AppError::General("could not resolve a data directory".to_string()))?;
    Ok(dirs.data_dir().join(STORE_FILE_NAME))
}

pub fn open_store(path: &Path) -> Result<Connection, AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    migrations::run_migrations(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection, AppError> {
    let conn = Connection::open_in_memory()?;
    migrations::run_migrations(&conn)?;
    Ok(conn)
}
