use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::file_record::Decision;
use crate::models::folder_node::{ConnectionRow, FolderRow};
use crate::models::settings::MAX_QUICK_ACCESS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedDecision {
    pub file_path: String,
    pub decision: Decision,
    pub destination_folder: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentFolder {
    pub folder_path: String,
    pub last_used: String,
}

pub fn upsert_decision(
    conn: &Connection,
    session_key: &str,
    file_path: &str,
    decision: Decision,
    destination_folder: Option<&str>,
) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO decisions (session_key, file_path, decision, destination_folder, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(session_key, file_path) DO UPDATE SET
            decision = excluded.decision,
            destination_folder = excluded.destination_folder,
            updated_at = excluded.updated_at",
        params![
            session_key,
            file_path,
            decision.to_string(),
            destination_folder,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn delete_decision(
    conn: &Connection,
    session_key: &str,
    file_path: &str,
) -> Result<usize, AppError> {
    let count = conn.execute(
        "DELETE FROM decisions WHERE session_key = ?1 AND file_path = ?2",
        params![session_key, file_path],
    )?;
    Ok(count)
}

/// Replaces the stored decisions of a session with `rows` in one transaction.
pub fn replace_decisions(
    conn: &Connection,
    session_key: &str,
    rows: &[(String, Decision, Option<String>)],
) -> Result<(), AppError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM decisions WHERE session_key = ?1",
        params![session_key],
    )?;
    let now = Utc::now().to_rfc3339();
    {
        let mut stmt = tx.prepare(
            "INSERT INTO decisions (session_key, file_path, decision, destination_folder, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for (path, decision, destination) in rows {
            stmt.execute(params![
                session_key,
                path,
                decision.to_string(),
                destination,
                now
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

pub fn load_decisions(
    conn: &Connection,
    session_key: &str,
) -> Result<Vec<PersistedDecision>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT file_path, decision, destination_folder, updated_at
         FROM decisions WHERE session_key = ?1 ORDER BY id ASC",
    )?;

    let rows = stmt
        .query_map(params![session_key], |row| {
            let decision_str: String = row.get(1)?;
            Ok((
                row.get::<_, String>(0)?,
                decision_str,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?
        .filter_map(|r| r.ok())
        .filter_map(|(file_path, decision_str, destination_folder, updated_at)| {
            let decision = decision_str.parse::<Decision>().ok()?;
            Some(PersistedDecision {
                file_path,
                decision,
                destination_folder,
                updated_at,
            })
        })
        .collect();

    Ok(rows)
}

pub fn clear_decisions(conn: &Connection, session_key: &str) -> Result<usize, AppError> {
    let count = conn.execute(
        "DELETE FROM decisions WHERE session_key = ?1",
        params![session_key],
    )?;
    Ok(count)
}

pub fn replace_folder_tree(
    conn: &Connection,
    session_key: &str,
    folders: &[FolderRow],
    connections: &[ConnectionRow],
) -> Result<(), AppError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM folder_tree WHERE session_key = ?1",
        params![session_key],
    )?;
    tx.execute(
        "DELETE FROM folder_connections WHERE session_key = ?1",
        params![session_key],
    )?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO folder_tree (session_key, folder_path, display_name, is_virtual, is_pinned, parent_path, sort_order)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for folder in folders {
            stmt.execute(params![
                session_key,
                folder.folder_path,
                folder.display_name,
                folder.is_virtual,
                folder.is_pinned,
                folder.parent_path,
                folder.sort_order,
            ])?;
        }

        let mut stmt = tx.prepare(
            "INSERT INTO folder_connections (session_key, folder_path, group_id) VALUES (?1, ?2, ?3)",
        )?;
        for connection in connections {
            stmt.execute(params![
                session_key,
                connection.folder_path,
                connection.group_id
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

pub fn load_folder_tree(conn: &Connection, session_key: &str) -> Result<Vec<FolderRow>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT folder_path, display_name, is_virtual, is_pinned, parent_path, sort_order
         FROM folder_tree WHERE session_key = ?1 ORDER BY sort_order ASC, id ASC",
    )?;

    let rows = stmt
        .query_map(params![session_key], |row| {
            Ok(FolderRow {
                folder_path: row.get(0)?,
                display_name: row.get(1)?,
                is_virtual: row.get(2)?,
                is_pinned: row.get(3)?,
                parent_path: row.get(4)?,
                sort_order: row.get(5)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();

    Ok(rows)
}

pub fn load_connections(
    conn: &Connection,
    session_key: &str,
) -> Result<Vec<ConnectionRow>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT folder_path, group_id FROM folder_connections WHERE session_key = ?1 ORDER BY id ASC",
    )?;

    let rows = stmt
        .query_map(params![session_key], |row| {
            Ok(ConnectionRow {
                folder_path: row.get(0)?,
                group_id: row.get(1)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();

    Ok(rows)
}

/// Overwrites the quick-access list wholesale; anything past ten entries is dropped.
pub fn save_quick_access(
    conn: &Connection,
    session_key: &str,
    folders: &[String],
) -> Result<(), AppError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM quick_access WHERE session_key = ?1",
        params![session_key],
    )?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO quick_access (session_key, position, folder_path) VALUES (?1, ?2, ?3)",
        )?;
        for (position, folder) in folders.iter().take(MAX_QUICK_ACCESS).enumerate() {
            stmt.execute(params![session_key, position as i64, folder])?;
        }
    }
    tx.commit()?;
    Ok(())
}

pub fn load_quick_access(conn: &Connection, session_key: &str) -> Result<Vec<String>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT folder_path FROM quick_access WHERE session_key = ?1 ORDER BY position ASC",
    )?;
    let rows = stmt
        .query_map(params![session_key], |row| row.get(0))?
        .filter_map(|r| r.ok())
        .collect();
    Ok(rows)
}

pub fn touch_recent_folder(
    conn: &Connection,
    folder_path: &str,
    used_at: DateTime<Utc>,
) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO recent_folders (folder_path, last_used) VALUES (?1, ?2)
         ON CONFLICT(folder_path) DO UPDATE SET last_used = excluded.last_used",
        params![folder_path, used_at.to_rfc3339()],
    )?;
    Ok(())
}

pub fn recent_folders(conn: &Connection, limit: usize) -> Result<Vec<RecentFolder>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT folder_path, last_used FROM recent_folders ORDER BY last_used DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok(RecentFolder {
                folder_path: row.get(0)?,
                last_used: row.get(1)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();
    Ok(rows)
}

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>, AppError> {
    let value = conn
        .query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

// Needed for rusqlite optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
