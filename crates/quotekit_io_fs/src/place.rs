//! Move or copy one finished document into a folder.

use std::fs;
use std::path::{Path, PathBuf};

use crate::spec::{EnumFileConflictStrategy, PlaceError};
use crate::util::{
    copy_file_with_metadata, derive_available_path, sanitize_file_name,
    validate_destination_path_safety,
};

/// Whether the source survives placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumPlaceMode {
    Move,
    Copy,
}

/// Place `path_file_src` into `path_dir_dst` as `name_file`.
///
/// `path_dir_dst` is created when missing and `name_file` is sanitized. A move
/// tries `rename` first and falls back to copy + remove across devices.
///
/// # Returns
/// - `Ok(Some(path))`: final destination path.
/// - `Ok(None)`: destination existed and `rule_conflict` is `Skip`.
pub fn place_file(
    path_file_src: &Path,
    path_dir_dst: &Path,
    name_file: &str,
    enum_mode: EnumPlaceMode,
    rule_conflict: EnumFileConflictStrategy,
) -> Result<Option<PathBuf>, PlaceError> {
    if !path_file_src.is_file() {
        return Err(PlaceError::SourceMissing(path_file_src.to_path_buf()));
    }
    fs::create_dir_all(path_dir_dst).map_err(|e| PlaceError::Io {
        path: path_dir_dst.to_path_buf(),
        message: e.to_string(),
    })?;

    let name_file = sanitize_file_name(name_file);
    let path_dst = match resolve_conflict(path_dir_dst, &name_file, rule_conflict)? {
        Some(v) => v,
        None => {
            tracing::info!(path = %path_dir_dst.join(&name_file).display(), "destination exists; skipped");
            return Ok(None);
        }
    };
    validate_destination_path_safety(&path_dst, path_dir_dst)
        .map_err(PlaceError::UnsafeDestination)?;

    let res_place = match enum_mode {
        EnumPlaceMode::Copy => copy_file_with_metadata(path_file_src, &path_dst),
        EnumPlaceMode::Move => match fs::rename(path_file_src, &path_dst) {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::debug!(error = %e, "rename failed; falling back to copy + remove");
                copy_file_with_metadata(path_file_src, &path_dst)
                    .and_then(|_| fs::remove_file(path_file_src))
            }
        },
    };
    res_place.map_err(|e| PlaceError::Io {
        path: path_dst.clone(),
        message: e.to_string(),
    })?;

    tracing::debug!(
        src = %path_file_src.display(),
        dst = %path_dst.display(),
        mode = ?enum_mode,
        "file placed"
    );
    Ok(Some(path_dst))
}

fn resolve_conflict(
    path_dir_dst: &Path,
    name_file: &str,
    rule_conflict: EnumFileConflictStrategy,
) -> Result<Option<PathBuf>, PlaceError> {
    let path_dst = path_dir_dst.join(name_file);
    if !path_dst.exists() {
        return Ok(Some(path_dst));
    }
    if path_dst.is_dir() {
        return Err(PlaceError::DestinationExists(path_dst));
    }
    match rule_conflict {
        EnumFileConflictStrategy::Skip => Ok(None),
        EnumFileConflictStrategy::Error => Err(PlaceError::DestinationExists(path_dst)),
        EnumFileConflictStrategy::Overwrite => Ok(Some(path_dst)),
        EnumFileConflictStrategy::Rename => Ok(Some(derive_available_path(path_dir_dst, name_file))),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{EnumPlaceMode, place_file};
    use crate::spec::{EnumFileConflictStrategy, PlaceError};

    #[test]
    fn move_creates_folder_and_removes_source() {
        let dir = tempfile::tempdir().unwrap();
        let path_src = dir.path().join("staging.xlsx");
        fs::write(&path_src, b"doc").unwrap();

        let path_dst = place_file(
            &path_src,
            &dir.path().join("請求書"),
            "請求書_ACME_20240401.xlsx",
            EnumPlaceMode::Move,
            EnumFileConflictStrategy::Rename,
        )
        .unwrap()
        .unwrap();

        assert_eq!(path_dst, dir.path().join("請求書").join("請求書_ACME_20240401.xlsx"));
        assert!(!path_src.exists());
        assert_eq!(fs::read(&path_dst).unwrap(), b"doc");
    }

    #[test]
    fn copy_keeps_source_and_renames_on_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let path_src = dir.path().join("a.xlsx");
        fs::write(&path_src, b"new").unwrap();
        let path_dir_dst = dir.path().join("backup");
        fs::create_dir(&path_dir_dst).unwrap();
        fs::write(path_dir_dst.join("a.xlsx"), b"old").unwrap();

        let path_dst = place_file(
            &path_src,
            &path_dir_dst,
            "a.xlsx",
            EnumPlaceMode::Copy,
            EnumFileConflictStrategy::Rename,
        )
        .unwrap()
        .unwrap();

        assert_eq!(path_dst, path_dir_dst.join("a (2).xlsx"));
        assert!(path_src.exists());
        assert_eq!(fs::read(path_dir_dst.join("a.xlsx")).unwrap(), b"old");
    }

    #[test]
    fn conflict_policies_skip_and_error() {
        let dir = tempfile::tempdir().unwrap();
        let path_src = dir.path().join("a.xlsx");
        fs::write(&path_src, b"new").unwrap();
        let path_dir_dst = dir.path().join("out");
        fs::create_dir(&path_dir_dst).unwrap();
        fs::write(path_dir_dst.join("a.xlsx"), b"old").unwrap();

        let res_skip = place_file(
            &path_src,
            &path_dir_dst,
            "a.xlsx",
            EnumPlaceMode::Copy,
            EnumFileConflictStrategy::Skip,
        )
        .unwrap();
        assert!(res_skip.is_none());

        let res_error = place_file(
            &path_src,
            &path_dir_dst,
            "a.xlsx",
            EnumPlaceMode::Copy,
            EnumFileConflictStrategy::Error,
        );
        assert!(matches!(res_error, Err(PlaceError::DestinationExists(_))));

        place_file(
            &path_src,
            &path_dir_dst,
            "a.xlsx",
            EnumPlaceMode::Copy,
            EnumFileConflictStrategy::Overwrite,
        )
        .unwrap();
        assert_eq!(fs::read(path_dir_dst.join("a.xlsx")).unwrap(), b"new");
    }

    #[test]
    fn missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let res = place_file(
            &dir.path().join("nope.xlsx"),
            dir.path(),
            "nope.xlsx",
            EnumPlaceMode::Move,
            EnumFileConflictStrategy::Rename,
        );
        assert!(matches!(res, Err(PlaceError::SourceMissing(_))));
    }

    #[test]
    fn unsafe_name_is_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let path_src = dir.path().join("a.xlsx");
        fs::write(&path_src, b"x").unwrap();
        let path_dst = place_file(
            &path_src,
            &dir.path().join("out"),
            "../escape.xlsx",
            EnumPlaceMode::Copy,
            EnumFileConflictStrategy::Rename,
        )
        .unwrap()
        .unwrap();
        assert_eq!(path_dst, dir.path().join("out").join("_escape.xlsx"));
    }
}
