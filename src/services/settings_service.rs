use rusqlite::Connection;

use crate::data::repository;
use crate::error::AppError;
use crate::models::settings::{ReviewSettings, MAX_QUICK_ACCESS};

const KEY_OVERWRITE: &str = "overwrite_existing";
const KEY_RECOVERABLE: &str = "prefer_recoverable_delete";
const KEY_QUICK_ACCESS_LIMIT: &str = "quick_access_limit";

fn parse_bool(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(str::trim) {
        Some("true" | "1" | "yes") => true,
        Some("false" | "0" | "no") => false,
        _ => default,
    }
}

/// Reads settings, falling back to defaults for missing or malformed values.
pub fn load(conn: &Connection) -> Result<ReviewSettings, AppError> {
    let defaults = ReviewSettings::default();
    let quick_access_limit = repository::get_setting(conn, KEY_QUICK_ACCESS_LIMIT)?
        .and_then(|v| v.trim().parse::<usize>().ok())
        .map(|n| n.clamp(1, MAX_QUICK_ACCESS))
        .unwrap_or(defaults.quick_access_limit);

    Ok(ReviewSettings {
        overwrite_existing: parse_bool(
            repository::get_setting(conn, KEY_OVERWRITE)?,
            defaults.overwrite_existing,
        ),
        prefer_recoverable_delete: parse_bool(
            repository::get_setting(conn, KEY_RECOVERABLE)?,
            defaults.prefer_recoverable_delete,
        ),
        quick_access_limit,
    })
}

pub fn save(conn: &Connection, settings: &ReviewSettings) -> Result<(), AppError> {
    repository::set_setting(conn, KEY_OVERWRITE, &settings.overwrite_existing.to_string())?;
    repository::set_setting(
        conn,
        KEY_RECOVERABLE,
        &settings.prefer_recoverable_delete.to_string(),
    )?;
    repository::set_setting(
        conn,
        KEY_QUICK_ACCESS_LIMIT,
        &settings.quick_access_limit.to_string(),
    )?;
    Ok(())
}
