//! Placement/backup options, per-file failures and top-level errors.

use std::path::PathBuf;

use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Existing destination file policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumFileConflictStrategy {
    /// Keep the destination file and skip the source.
    Skip,
    /// Replace the destination file.
    Overwrite,
    /// Fail for this file.
    Error,
    /// Write next to it as `name (2).ext`, `name (3).ext`, ...
    #[default]
    Rename,
}

/// Pattern interpretation for backup include/exclude lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumPatternMode {
    /// Shell-like wildcards (`*`, `?`, character classes).
    #[default]
    Glob,
    /// Regular expression.
    Regex,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// Input options for [`crate::backup_folders`].
#[derive(Debug, Clone)]
pub struct SpecBackupOptions {
    /// Include patterns applied to file basenames; `None` keeps every file.
    pub patterns_include: Option<Vec<String>>,
    /// Exclude patterns applied to file basenames.
    pub patterns_exclude: Option<Vec<String>>,
    pub rule_pattern: EnumPatternMode,
    /// Conflict behavior for files already in the backup folder.
    pub rule_conflict: EnumFileConflictStrategy,
    /// Maximum worker threads for the copy stage.
    pub num_workers_max: Option<usize>,
    /// Plan and count without touching the filesystem.
    pub if_dry_run: bool,
}

impl Default for SpecBackupOptions {
    fn default() -> Self {
        Self {
            patterns_include: None,
            patterns_exclude: None,
            rule_pattern: EnumPatternMode::Glob,
            rule_conflict: EnumFileConflictStrategy::Skip,
            num_workers_max: None,
            if_dry_run: false,
        }
    }
}

/// One per-file failure with path + error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFileError {
    pub path: PathBuf,
    pub exception: String,
}

/// Setup failures of a backup run. Per-file failures go into the report.
// Display/Error are implemented by hand: thiserror treats a field named
// `source` as the error source, which requires it to implement `Error`.
#[derive(Debug)]
pub enum BackupError {
    InvalidPattern(String),
    InvalidFolderName(String),
    SourceBackupOverlap { source: PathBuf, backup: PathBuf },
    BackupInitFailed { path: PathBuf, message: String },
}

impl std::fmt::Display for BackupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackupError::InvalidPattern(s) => write!(f, "{s}"),
            BackupError::InvalidFolderName(s) => write!(f, "invalid folder name `{s}`"),
            BackupError::SourceBackupOverlap { source, backup } => write!(
                f,
                "backup folder {} overlaps source folder {}",
                backup.display(),
                source.display()
            ),
            BackupError::BackupInitFailed { path, message } => write!(
                f,
                "failed to initialize backup folder {}: {message}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for BackupError {}

/// Failure to place one file into a folder.
#[derive(Debug, Error)]
pub enum PlaceError {
    #[error("source file {} does not exist", .0.display())]
    SourceMissing(PathBuf),
    #[error("destination {} already exists", .0.display())]
    DestinationExists(PathBuf),
    #[error("unsafe destination: {0}")]
    UnsafeDestination(String),
    #[error("failed to place {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
