use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Upper bound on `_N` suffixes tried before a move is given up.
pub const MAX_NAME_ATTEMPTS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Renamed(PathBuf),
    /// Copied because rename failed (usually across devices).
    Copied(PathBuf),
    /// Copied, but the source could not be removed afterwards.
    CopiedSourceRetained { destination: PathBuf, reason: String },
}

impl MoveOutcome {
    pub fn destination(&self) -> &Path {
        match self {
            Self::Renamed(p) | Self::Copied(p) => p,
            Self::CopiedSourceRetained { destination, .. } => destination,
        }
    }
}

pub fn create_dir(path: &Path) -> Result<(), AppError> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// Something (a file, a directory or a symlink, dangling or not) sits at `path`.
fn is_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// First free `stem_N.ext` next to `path`, trying N = 1.. up to `max_attempts`.
/// Returns `path` unchanged when nothing is there yet.
pub fn unique_destination(path: &Path, max_attempts: usize) -> Result<PathBuf, AppError> {
    if !is_occupied(path) {
        return Ok(path.to_path_buf());
    }

    let parent = path.parent().unwrap_or(Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = path.extension().map(|s| s.to_string_lossy().to_string());

    for counter in 1..=max_attempts {
        let candidate_name = match &extension {
            Some(ext) => format!("{stem}_{counter}.{ext}"),
            None => format!("{stem}_{counter}"),
        };
        let candidate = parent.join(candidate_name);
        if !is_occupied(&candidate) {
            return Ok(candidate);
        }
    }

    Err(AppError::NamesExhausted {
        path: path.display().to_string(),
        attempts: max_attempts,
    })
}

/// `dest_dir` is `source` or lies below it, lexically or once resolved on disk.
fn is_inside(dest_dir: &Path, source: &Path) -> bool {
    if dest_dir.starts_with(source) {
        return true;
    }
    let Ok(source) = fs::canonicalize(source) else {
        return false;
    };
    // The destination may not exist yet; resolve its deepest existing ancestor.
    dest_dir
        .ancestors()
        .find_map(|ancestor| fs::canonicalize(ancestor).ok())
        .is_some_and(|resolved| resolved.starts_with(&source))
}

/// Moves `source` into `dest_dir` under its own file name.
///
/// The directory is created when missing. A taken name is either removed
/// (`overwrite`) or avoided with a numeric suffix. A directory is never moved
/// into itself or one of its descendants.
pub fn move_into(source: &Path, dest_dir: &Path, overwrite: bool) -> Result<MoveOutcome, AppError> {
    move_into_with(source, dest_dir, overwrite, |from, to| fs::rename(from, to), |path| {
        if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        }
    })
}

fn move_into_with(
    source: &Path,
    dest_dir: &Path,
    overwrite: bool,
    rename: impl Fn(&Path, &Path) -> io::Result<()>,
    remove_source: impl Fn(&Path) -> io::Result<()>,
) -> Result<MoveOutcome, AppError> {
    if fs::symlink_metadata(source).is_err() {
        return Err(AppError::General(format!(
            "source does not exist: {}",
            source.display()
        )));
    }
    let file_name = source.file_name().ok_or_else(|| {
        AppError::General(format!("invalid source path: {}", source.display()))
    })?;

    let requested = dest_dir.join(file_name);
    if requested == source {
        return Ok(MoveOutcome::Renamed(requested));
    }
    if is_inside(dest_dir, source) {
        return Err(AppError::MoveIntoItself {
            path: source.display().to_string(),
            destination: dest_dir.display().to_string(),
        });
    }

    if !dest_dir.is_dir() {
        fs::create_dir_all(dest_dir)?;
    }

    let target = if is_occupied(&requested) {
        if overwrite {
            remove_permanently(&requested)?;
            requested
        } else {
            unique_destination(&requested, MAX_NAME_ATTEMPTS)?
        }
    } else {
        requested
    };

    if rename(source, &target).is_ok() {
        return Ok(MoveOutcome::Renamed(target));
    }

    if source.is_dir() {
        copy_dir_recursive(source, &target)?;
    } else {
        fs::copy(source, &target)?;
    }

    match remove_source(source) {
        Ok(()) => Ok(MoveOutcome::Copied(target)),
        Err(e) => Ok(MoveOutcome::CopiedSourceRetained {
            destination: target,
            reason: e.to_string(),
        }),
    }
}

pub fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<(), AppError> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let dest_child = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &dest_child)?;
        } else {
            fs::copy(entry.path(), &dest_child)?;
        }
    }
    Ok(())
}

pub fn remove_permanently(path: &Path) -> Result<(), AppError> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_dir_is_recursive() {
        let base = tempfile::tempdir().unwrap();
        let target = base.path().join("a").join("b");
        create_dir(&target).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn test_unique_destination_picks_lowest_free_suffix() {
        let base = tempfile::tempdir().unwrap();
        let taken = base.path().join("report.pdf");
        fs::write(&taken, b"1").unwrap();
        fs::write(base.path().join("report_1.pdf"), b"2").unwrap();
        fs::write(base.path().join("report_3.pdf"), b"3").unwrap();

        let chosen = unique_destination(&taken, MAX_NAME_ATTEMPTS).unwrap();
        assert_eq!(chosen, base.path().join("report_2.pdf"));
    }

    #[test]
    fn test_unique_destination_without_extension() {
        let base = tempfile::tempdir().unwrap();
        let taken = base.path().join("README");
        fs::write(&taken, b"1").unwrap();
        assert_eq!(
            unique_destination(&taken, 5).unwrap(),
            base.path().join("README_1")
        );
    }

    #[test]
    fn test_unique_destination_gives_up_at_cap() {
        let base = tempfile::tempdir().unwrap();
        let taken = base.path().join("a.txt");
        fs::write(&taken, b"0").unwrap();
        for i in 1..=3 {
            fs::write(base.path().join(format!("a_{i}.txt")), b"x").unwrap();
        }

        let result = unique_destination(&taken, 3);
        assert!(matches!(
            result,
            Err(AppError::NamesExhausted { attempts: 3, .. })
        ));
    }

    #[test]
    fn test_move_into_creates_destination() {
        let base = tempfile::tempdir().unwrap();
        let src = base.path().join("file.txt");
        fs::write(&src, b"data").unwrap();
        let dest_dir = base.path().join("Archive");

        let outcome = move_into(&src, &dest_dir, false).unwrap();

        assert!(!src.exists());
        assert_eq!(outcome, MoveOutcome::Renamed(dest_dir.join("file.txt")));
        assert_eq!(fs::read_to_string(dest_dir.join("file.txt")).unwrap(), "data");
    }

    #[test]
    fn test_move_into_renames_on_collision() {
        let base = tempfile::tempdir().unwrap();
        let dest_dir = base.path().join("target");
        fs::create_dir_all(&dest_dir).unwrap();
        fs::write(dest_dir.join("file.txt"), b"old").unwrap();
        let src = base.path().join("file.txt");
        fs::write(&src, b"new").unwrap();

        let outcome = move_into(&src, &dest_dir, false).unwrap();

        assert_eq!(outcome.destination(), dest_dir.join("file_1.txt"));
        assert_eq!(fs::read_to_string(dest_dir.join("file.txt")).unwrap(), "old");
        assert_eq!(fs::read_to_string(dest_dir.join("file_1.txt")).unwrap(), "new");
    }

    #[test]
    fn test_move_into_overwrites_when_asked() {
        let base = tempfile::tempdir().unwrap();
        let dest_dir = base.path().join("target");
        fs::create_dir_all(&dest_dir).unwrap();
        fs::write(dest_dir.join("file.txt"), b"old").unwrap();
        let src = base.path().join("file.txt");
        fs::write(&src, b"new").unwrap();

        let outcome = move_into(&src, &dest_dir, true).unwrap();

        assert_eq!(outcome.destination(), dest_dir.join("file.txt"));
        assert_eq!(fs::read_to_string(dest_dir.join("file.txt")).unwrap(), "new");
        assert!(!dest_dir.join("file_1.txt").exists());
    }

    fn refuse_rename(_from: &Path, _to: &Path) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, "cross-device link"))
    }

    fn remove_source(path: &Path) -> io::Result<()> {
        if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        }
    }

    #[test]
    fn test_move_into_copies_when_rename_fails() {
        let base = tempfile::tempdir().unwrap();
        let src = base.path().join("photo.jpg");
        fs::write(&src, b"pixels").unwrap();
        let dest_dir = base.path().join("Photos");

        let outcome = move_into_with(&src, &dest_dir, false, refuse_rename, remove_source).unwrap();

        assert_eq!(outcome, MoveOutcome::Copied(dest_dir.join("photo.jpg")));
        assert!(!src.exists());
        assert_eq!(fs::read(dest_dir.join("photo.jpg")).unwrap(), b"pixels");
    }

    #[test]
    fn test_move_into_copies_directories_when_rename_fails() {
        let base = tempfile::tempdir().unwrap();
        let src = base.path().join("album");
        fs::create_dir_all(src.join("2024")).unwrap();
        fs::write(src.join("2024").join("a.jpg"), b"a").unwrap();
        let dest_dir = base.path().join("Photos");

        let outcome = move_into_with(&src, &dest_dir, false, refuse_rename, remove_source).unwrap();

        assert_eq!(outcome, MoveOutcome::Copied(dest_dir.join("album")));
        assert!(!src.exists());
        assert!(dest_dir.join("album").join("2024").join("a.jpg").is_file());
    }

    #[test]
    fn test_move_into_keeps_source_when_removal_fails() {
        let base = tempfile::tempdir().unwrap();
        let src = base.path().join("notes.txt");
        fs::write(&src, b"keep me").unwrap();
        let dest_dir = base.path().join("Docs");

        let outcome = move_into_with(&src, &dest_dir, false, refuse_rename, |_| {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        })
        .unwrap();

        match outcome {
            MoveOutcome::CopiedSourceRetained { destination, reason } => {
                assert_eq!(destination, dest_dir.join("notes.txt"));
                assert!(reason.contains("read-only"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(src.exists());
        assert_eq!(fs::read_to_string(dest_dir.join("notes.txt")).unwrap(), "keep me");
    }

    #[test]
    fn test_move_into_refuses_own_subtree() {
        let base = tempfile::tempdir().unwrap();
        let photos = base.path().join("Photos");
        fs::create_dir_all(&photos).unwrap();
        fs::write(photos.join("a.jpg"), b"a").unwrap();

        let into_self = move_into(&photos, &photos, false);
        let into_child = move_into(&photos, &photos.join("2024").join("best"), false);

        assert!(matches!(into_self, Err(AppError::MoveIntoItself { .. })));
        assert!(matches!(into_child, Err(AppError::MoveIntoItself { .. })));
        assert!(photos.join("a.jpg").is_file());
        assert!(!photos.join("2024").exists());
        assert!(!photos.join("Photos").exists());
    }

    #[test]
    fn test_move_into_allows_sibling_with_shared_prefix() {
        let base = tempfile::tempdir().unwrap();
        let photos = base.path().join("Photos");
        fs::create_dir_all(&photos).unwrap();

        let outcome = move_into(&photos, &base.path().join("Photos Archive"), false).unwrap();
        assert!(outcome.destination().is_dir());
        assert!(!photos.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_counts_as_taken() {
        let base = tempfile::tempdir().unwrap();
        let dest_dir = base.path().join("target");
        fs::create_dir_all(&dest_dir).unwrap();
        std::os::unix::fs::symlink(base.path().join("nowhere"), dest_dir.join("file.txt")).unwrap();
        let src = base.path().join("file.txt");
        fs::write(&src, b"new").unwrap();

        let outcome = move_into(&src, &dest_dir, false).unwrap();

        assert_eq!(outcome.destination(), dest_dir.join("file_1.txt"));
        assert!(fs::symlink_metadata(dest_dir.join("file.txt"))
            .unwrap()
            .file_type()
            .is_symlink());
    }

    #[test]
    fn test_move_into_missing_source_fails() {
        let base = tempfile::tempdir().unwrap();
        let result = move_into(&base.path().join("ghost.txt"), base.path(), false);
        assert!(result.is_err());
    }

    #[test]
    fn test_copy_dir_recursive() {
        let base = tempfile::tempdir().unwrap();
        let src = base.path().join("src");
        fs::create_dir_all(src.join("inner")).unwrap();
        fs::write(src.join("inner").join("f.txt"), b"deep").unwrap();

        let dest = base.path().join("dest");
        copy_dir_recursive(&src, &dest).unwrap();

        assert_eq!(fs::read_to_string(dest.join("inner").join("f.txt")).unwrap(), "deep");
    }

    #[test]
    fn test_remove_permanently_handles_files_and_dirs() {
        let base = tempfile::tempdir().unwrap();
        let file = base.path().join("f.txt");
        let dir = base.path().join("d");
        fs::write(&file, b"x").unwrap();
        fs::create_dir_all(dir.join("x")).unwrap();

        remove_permanently(&file).unwrap();
        remove_permanently(&dir).unwrap();

        assert!(!file.exists());
        assert!(!dir.exists());
        assert!(remove_permanently(&file).is_err());
    }
}
