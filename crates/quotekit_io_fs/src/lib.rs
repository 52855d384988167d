//! `quotekit_io_fs` v1:
//! Filesystem placement and backup for generated documents.
//!
//! Modules:
//! - `place`  : move/copy one document into a folder
//! - `backup` : mirror document folders into a backup folder
//! - `spec`   : options, conflict policy, errors
//! - `report` : backup report and builder

pub mod backup;
pub mod place;
pub mod report;
pub mod spec;
mod util;

pub use backup::backup_folders;
pub use place::{EnumPlaceMode, place_file};
pub use report::{ReportBackup, ReportBackupBuilder};
pub use spec::{
    BackupError, EnumFileConflictStrategy, EnumPatternMode, PlaceError, SpecBackupOptions,
    SpecFileError,
};
pub use util::sanitize_file_name;
