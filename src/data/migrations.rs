use rusqlite::Connection;

use crate::error::AppError;

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS decisions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_key TEXT NOT NULL,
    file_path TEXT NOT NULL,
    decision TEXT NOT NULL,
    destination_folder TEXT,
    updated_at TEXT DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(session_key, file_path)
);

CREATE INDEX IF NOT EXISTS idx_decisions_session ON decisions(session_key);

CREATE TABLE IF NOT EXISTS folder_tree (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_key TEXT NOT NULL,
    folder_path TEXT NOT NULL,
    display_name TEXT NOT NULL,
    is_virtual BOOLEAN DEFAULT 0,
    is_pinned BOOLEAN DEFAULT 0,
    parent_path TEXT,
    sort_order INTEGER DEFAULT 0,
    UNIQUE(session_key, folder_path)
);

CREATE INDEX IF NOT EXISTS idx_folder_tree_session ON folder_tree(session_key, sort_order);

CREATE TABLE IF NOT EXISTS folder_connections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_key TEXT NOT NULL,
    folder_path TEXT NOT NULL,
    group_id INTEGER NOT NULL,
    UNIQUE(session_key, folder_path)
);

CREATE TABLE IF NOT EXISTS quick_access (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_key TEXT NOT NULL,
    position INTEGER NOT NULL,
    folder_path TEXT NOT NULL,
    UNIQUE(session_key, position)
);

CREATE TABLE IF NOT EXISTS recent_folders (
    folder_path TEXT PRIMARY KEY,
    last_used TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_recent_last_used ON recent_folders(last_used DESC);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

pub fn run_migrations(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch(SCHEMA_V1)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for table in [
            "decisions",
            "folder_tree",
            "folder_connections",
            "quick_access",
            "recent_folders",
            "settings",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_migration_enables_wal() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open(dir.path().join("test.db")).unwrap();
        run_migrations(&conn).unwrap();

        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
    }

    #[test]
    fn test_migration_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
    }
}
