use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use globset::{Glob, GlobMatcher};
use regex::Regex;

use crate::spec::{BackupError, EnumPatternMode};

////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

#[derive(Debug, Clone)]
pub(crate) enum TypePatternSeq {
    Glob(Vec<GlobMatcher>),
    Regex(Vec<Regex>),
}

impl TypePatternSeq {
    fn is_match(&self, value: &str) -> bool {
        match self {
            TypePatternSeq::Glob(v) => v.iter().any(|p| p.is_match(value)),
            TypePatternSeq::Regex(v) => v.iter().any(|p| p.is_match(value)),
        }
    }
}

/// Compiled include/exclude filters for file basenames.
#[derive(Debug, Clone, Default)]
pub(crate) struct SpecFilePatterns {
    patterns_include: Option<TypePatternSeq>,
    patterns_exclude: Option<TypePatternSeq>,
}

impl SpecFilePatterns {
    pub(crate) fn from_raw(
        patterns_include: Option<&[String]>,
        patterns_exclude: Option<&[String]>,
        rule_pattern: EnumPatternMode,
    ) -> Result<Self, BackupError> {
        Ok(Self {
            patterns_include: compile_patterns(patterns_include, rule_pattern)?,
            patterns_exclude: compile_patterns(patterns_exclude, rule_pattern)?,
        })
    }

    /// Missing include list keeps everything; exclude wins over include.
    pub(crate) fn is_selected(&self, name_file: &str) -> bool {
        let if_included = self
            .patterns_include
            .as_ref()
            .is_none_or(|p| p.is_match(name_file));
        let if_excluded = self
            .patterns_exclude
            .as_ref()
            .is_some_and(|p| p.is_match(name_file));
        if_included && !if_excluded
    }
}

fn compile_patterns(
    patterns: Option<&[String]>,
    rule_pattern: EnumPatternMode,
) -> Result<Option<TypePatternSeq>, BackupError> {
    let Some(patterns) = patterns else {
        return Ok(None);
    };
    if patterns.is_empty() {
        return Ok(None);
    }

    match rule_pattern {
        EnumPatternMode::Glob => {
            let mut l_glob = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let matcher = Glob::new(pattern)
                    .map_err(|e| {
                        BackupError::InvalidPattern(format!(
                            "Invalid pattern in include/exclude: {e}"
                        ))
                    })?
                    .compile_matcher();
                l_glob.push(matcher);
            }
            Ok(Some(TypePatternSeq::Glob(l_glob)))
        }
        EnumPatternMode::Regex => {
            let mut l_regex = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let regex = Regex::new(pattern).map_err(|e| {
                    BackupError::InvalidPattern(format!("Invalid pattern in include/exclude: {e}"))
                })?;
                l_regex.push(regex);
            }
            Ok(Some(TypePatternSeq::Regex(l_regex)))
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FileNames

static RE_FILE_NAME_ILLEGAL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|\x00-\x1f]"#).ok());

const NAME_FILE_FALLBACK: &str = "document";

/// Replace characters that are not allowed in file names on common platforms.
///
/// Leading/trailing dots and whitespace are trimmed. An empty result becomes
/// `document`.
pub fn sanitize_file_name(name: &str) -> String {
    let name_replaced = match RE_FILE_NAME_ILLEGAL.as_ref() {
        Some(re) => re.replace_all(name, "_").into_owned(),
        None => name
            .chars()
            .map(|c| {
                if c.is_control() || "\\/:*?\"<>|".contains(c) {
                    '_'
                } else {
                    c
                }
            })
            .collect(),
    };
    let name_trimmed = name_replaced.trim_matches(|c: char| c.is_whitespace() || c == '.');
    if name_trimmed.is_empty() {
        return NAME_FILE_FALLBACK.to_string();
    }
    name_trimmed.to_string()
}

/// First path in `path_dir` for `name_file` that does not exist yet.
///
/// `report.xlsx` becomes `report (2).xlsx`, `report (3).xlsx`, ...
pub(crate) fn derive_available_path(path_dir: &Path, name_file: &str) -> PathBuf {
    let path_candidate = path_dir.join(name_file);
    if !path_candidate.exists() {
        return path_candidate;
    }

    let path_name = Path::new(name_file);
    let stem = path_name
        .file_stem()
        .map(|v| v.to_string_lossy().into_owned())
        .unwrap_or_else(|| name_file.to_string());
    let ext = path_name
        .extension()
        .map(|v| format!(".{}", v.to_string_lossy()))
        .unwrap_or_default();

    let mut n_suffix = 2_usize;
    loop {
        let path_candidate = path_dir.join(format!("{stem} ({n_suffix}){ext}"));
        if !path_candidate.exists() {
            return path_candidate;
        }
        n_suffix += 1;
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    absolutize_path(path)
}

fn absolutize_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

pub(crate) fn is_overlap(src: &Path, dst: &Path) -> bool {
    let src_resolved = normalize_path(src);
    let dst_resolved = normalize_path(dst);
    dst_resolved.starts_with(&src_resolved) || src_resolved.starts_with(&dst_resolved)
}

/// Reject destinations that leave `path_dir_dst_root` or pass through symlinks.
pub(crate) fn validate_destination_path_safety(
    path_dst_item: &Path,
    path_dir_dst_root: &Path,
) -> Result<(), String> {
    let path_dir_dst_root_abs = absolutize_path(path_dir_dst_root);
    let path_dst_item_abs = absolutize_path(path_dst_item);

    if !path_dst_item_abs.starts_with(&path_dir_dst_root_abs) {
        return Err(format!(
            "Unsafe destination path escapes destination root: {} (root={})",
            path_dst_item.display(),
            path_dir_dst_root.display()
        ));
    }

    let path_parent_dst = path_dst_item_abs.parent().ok_or_else(|| {
        format!(
            "Failed to derive parent directory: {}",
            path_dst_item.display()
        )
    })?;
    let path_parent_rel = path_parent_dst
        .strip_prefix(&path_dir_dst_root_abs)
        .map_err(|_| {
            format!(
                "Unsafe destination parent escapes destination root: {} (root={})",
                path_dst_item.display(),
                path_dir_dst_root.display()
            )
        })?;

    let mut path_cursor = path_dir_dst_root_abs.clone();
    for part_rel in path_parent_rel.components() {
        path_cursor.push(part_rel.as_os_str());
        reject_symlink(&path_cursor, "traverses symlink component")?;
    }
    reject_symlink(&path_dst_item_abs, "is an existing symlink")
}

fn reject_symlink(path: &Path, reason: &str) -> Result<(), String> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => Err(format!(
            "Unsafe destination path {reason}: {}",
            path.display()
        )),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(format!("Failed to inspect {} ({e})", path.display())),
    }
}

pub(crate) fn copy_file_with_metadata(
    path_file_src: &Path,
    path_file_dst: &Path,
) -> Result<(), io::Error> {
    fs::copy(path_file_src, path_file_dst)?;
    #[cfg(target_os = "linux")]
    {
        apply_metadata_linux(path_file_src, path_file_dst)?;
    }
    Ok(())
}

#[cfg(target_os = "linux")]
fn apply_metadata_linux(path_file_src: &Path, path_file_dst: &Path) -> Result<(), io::Error> {
    use filetime::{FileTime, set_file_times};

    let stat_src = fs::metadata(path_file_src)?;
    fs::set_permissions(path_file_dst, stat_src.permissions())?;

    let file_time_access = FileTime::from_last_access_time(&stat_src);
    let file_time_modify = FileTime::from_last_modification_time(&stat_src);
    set_file_times(path_file_dst, file_time_access, file_time_modify)?;

    copy_xattrs_linux(path_file_src, path_file_dst);
    Ok(())
}

#[cfg(target_os = "linux")]
fn copy_xattrs_linux(path_file_src: &Path, path_file_dst: &Path) {
    let Ok(iter_xattr_names) = xattr::list(path_file_src) else {
        return;
    };
    for name in iter_xattr_names {
        let Some(raw_value) = xattr::get(path_file_src, &name).ok().flatten() else {
            continue;
        };
        if let Err(e) = xattr::set(path_file_dst, &name, &raw_value) {
            tracing::debug!(path = %path_file_dst.display(), error = %e, "xattr not copied");
        }
    }
}

pub(crate) fn calculate_worker_limit(num_workers_max: Option<usize>) -> usize {
    let n_cpu = std::thread::available_parallelism()
        .map(|v| v.get())
        .unwrap_or(1);

    match num_workers_max {
        Some(n) => n.clamp(1, n_cpu),
        None => n_cpu.clamp(1, 8),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{
        SpecFilePatterns, calculate_worker_limit, derive_available_path, sanitize_file_name,
        validate_destination_path_safety,
    };
    use crate::spec::EnumPatternMode;

    #[test]
    fn sanitize_file_name_replaces_illegal_characters() {
        assert_eq!(sanitize_file_name("見積書_A/B:C_20240401"), "見積書_A_B_C_20240401");
        assert_eq!(sanitize_file_name("  ..name..  "), "name");
        assert_eq!(sanitize_file_name("???"), "___");
        assert_eq!(sanitize_file_name(" . "), "document");
    }

    #[test]
    fn derive_available_path_appends_counter() {
        let dir = tempfile::tempdir().unwrap();
        let path_first = derive_available_path(dir.path(), "doc.xlsx");
        assert_eq!(path_first, dir.path().join("doc.xlsx"));

        fs::write(&path_first, b"x").unwrap();
        let path_second = derive_available_path(dir.path(), "doc.xlsx");
        assert_eq!(path_second, dir.path().join("doc (2).xlsx"));

        fs::write(&path_second, b"x").unwrap();
        assert_eq!(
            derive_available_path(dir.path(), "doc.xlsx"),
            dir.path().join("doc (3).xlsx")
        );
    }

    #[test]
    fn patterns_glob_include_and_exclude() {
        let patterns = SpecFilePatterns::from_raw(
            Some(&["*.xlsx".to_string()]),
            Some(&["~$*".to_string()]),
            EnumPatternMode::Glob,
        )
        .unwrap();
        assert!(patterns.is_selected("見積書_ACME.xlsx"));
        assert!(!patterns.is_selected("~$見積書_ACME.xlsx"));
        assert!(!patterns.is_selected("notes.txt"));
    }

    #[test]
    fn patterns_regex_and_invalid_pattern() {
        let patterns =
            SpecFilePatterns::from_raw(Some(&[r"^\d+\.csv$".to_string()]), None, EnumPatternMode::Regex)
                .unwrap();
        assert!(patterns.is_selected("2024.csv"));
        assert!(!patterns.is_selected("a2024.csv"));

        assert!(
            SpecFilePatterns::from_raw(Some(&["(".to_string()]), None, EnumPatternMode::Regex)
                .is_err()
        );
    }

    #[test]
    fn empty_pattern_lists_select_everything() {
        let patterns = SpecFilePatterns::from_raw(Some(&[]), None, EnumPatternMode::Glob).unwrap();
        assert!(patterns.is_selected("anything"));
    }

    #[test]
    fn destination_outside_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path_root = dir.path().join("root");
        fs::create_dir(&path_root).unwrap();
        assert!(validate_destination_path_safety(&path_root.join("a.xlsx"), &path_root).is_ok());
        assert!(validate_destination_path_safety(&dir.path().join("a.xlsx"), &path_root).is_err());
    }

    #[test]
    fn worker_limit_is_at_least_one() {
        assert_eq!(calculate_worker_limit(Some(0)), 1);
        assert!(calculate_worker_limit(None) >= 1);
    }
}
