//! Recoverable deletion.
//!
//! The committer only knows the [`RecoverableDelete`] trait. [`delete_with_fallback`]
//! tries it first and deletes permanently when it is unavailable or fails.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::services::file_service;

pub trait RecoverableDelete {
    fn name(&self) -> &'static str;

    fn delete(&self, path: &Path) -> Result<(), AppError>;
}

/// The platform recycle bin, via the `trash` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTrash;

impl RecoverableDelete for SystemTrash {
    fn name(&self) -> &'static str {
        "system trash"
    }

    fn delete(&self, path: &Path) -> Result<(), AppError> {
        trash::delete(path).map_err(|e| AppError::Trash(e.to_string()))
    }
}

/// An application-managed trash folder. Each item lands in its own `<uuid>/`
/// directory, with a `<uuid>.json` sidecar recording where it came from.
#[derive(Debug, Clone)]
pub struct AppTrash {
    root: PathBuf,
}

pub struct TrashedItem {
    pub trash_path: PathBuf,
    pub original_path: PathBuf,
}

impl AppTrash {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `~/.sortdeck/trash`.
    pub fn in_home() -> Result<Self, AppError> {
        let dirs = directories::BaseDirs::new()
            .ok_or_else(|| AppError::General("could not resolve home directory".to_string()))?;
        Ok(Self::new(dirs.home_dir().join(".sortdeck").join("trash")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn trash(&self, src: &Path) -> Result<TrashedItem, AppError> {
        if fs::symlink_metadata(src).is_err() {
            return Err(AppError::General(format!(
                "path does not exist: {}",
                src.display()
            )));
        }

        let file_name = src
            .file_name()
            .ok_or_else(|| AppError::General(format!("invalid path: {}", src.display())))?;

        let item_dir = self.root.join(uuid::Uuid::new_v4().to_string());
        let sidecar = metadata_path(&item_dir);
        fs::create_dir_all(&item_dir)?;
        let dest = item_dir.join(file_name);

        // Metadata goes first so a failure leaves the source where it was.
        let metadata = serde_json::json!({
            "original_path": src.to_string_lossy(),
            "deleted_at": chrono::Utc::now().to_rfc3339(),
            "file_name": file_name.to_string_lossy(),
        });
        let written = serde_json::to_string_pretty(&metadata)
            .map_err(AppError::from)
            .and_then(|json| fs::write(&sidecar, json).map_err(AppError::from));
        if let Err(e) = written {
            discard(&item_dir);
            return Err(e);
        }

        if let Err(e) = fs::rename(src, &dest) {
            discard(&item_dir);
            return Err(AppError::Trash(format!(
                "could not move {} into app trash: {e}",
                src.display()
            )));
        }

        Ok(TrashedItem {
            trash_path: dest,
            original_path: src.to_path_buf(),
        })
    }

    pub fn restore(&self, item: &TrashedItem) -> Result<(), AppError> {
        if !item.trash_path.exists() {
            return Err(AppError::General(format!(
                "trash item does not exist: {}",
                item.trash_path.display()
            )));
        }

        if let Some(parent) = item.original_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::rename(&item.trash_path, &item.original_path)?;

        if let Some(item_dir) = item.trash_path.parent() {
            discard(item_dir);
        }

        Ok(())
    }
}

fn metadata_path(item_dir: &Path) -> PathBuf {
    item_dir.with_extension("json")
}

fn discard(item_dir: &Path) {
    let _ = fs::remove_dir_all(item_dir);
    let _ = fs::remove_file(metadata_path(item_dir));
}

impl RecoverableDelete for AppTrash {
    fn name(&self) -> &'static str {
        "app trash"
    }

    fn delete(&self, path: &Path) -> Result<(), AppError> {
        self.trash(path).map(|_| ())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteMethod {
    Recoverable,
    /// Permanent delete after the recoverable attempt failed with this reason.
    Permanent { fallback_reason: Option<String> },
}

/// Deletes `path`, preferring `recoverable` when given.
pub fn delete_with_fallback(
    recoverable: Option<&dyn RecoverableDelete>,
    path: &Path,
) -> Result<DeleteMethod, AppError> {
    if fs::symlink_metadata(path).is_err() {
        return Err(AppError::General(format!(
            "path does not exist: {}",
            path.display()
        )));
    }

    let fallback_reason = match recoverable {
        Some(mechanism) => match mechanism.delete(path) {
            Ok(()) => return Ok(DeleteMethod::Recoverable),
            Err(e) => {
                tracing::debug!(
                    path = %path.display(),
                    mechanism = mechanism.name(),
                    "recoverable delete failed: {e}"
                );
                Some(format!("{} unavailable: {e}", mechanism.name()))
            }
        },
        None => None,
    };

    file_service::remove_permanently(path)?;
    Ok(DeleteMethod::Permanent { fallback_reason })
}
