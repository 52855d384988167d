//! Workbook errors and document store options.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use quotekit_engine::StoreError;
use quotekit_io_fs::EnumFileConflictStrategy;
use quotekit_schema::EnumDocumentType;
use thiserror::Error;

/// Workbook read/write failures.
#[derive(Debug, Error)]
pub enum XlsxError {
    #[error("failed to open workbook {}: {message}", path.display())]
    Open { path: PathBuf, message: String },
    #[error("workbook {} has no sheet named `{sheet}`", path.display())]
    SheetMissing { path: PathBuf, sheet: String },
    #[error("failed to read sheet `{sheet}` of {}: {message}", path.display())]
    SheetRead {
        path: PathBuf,
        sheet: String,
        message: String,
    },
    #[error("xlsx write error for {}: {message}", path.display())]
    Write { path: PathBuf, message: String },
}

impl XlsxError {
    pub(crate) fn write(path: &Path, err: rust_xlsxwriter::XlsxError) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    /// Map into the engine-facing collaborator error.
    pub fn into_store_error(self, operation: &'static str) -> StoreError {
        StoreError::unavailable(operation, self.to_string())
    }
}

/// Where templates come from and where documents go.
#[derive(Debug, Clone)]
pub struct SpecXlsxStoreOptions {
    /// Root holding the document folders (and the backup folder).
    pub path_dir_root: PathBuf,
    /// Template workbook per document type.
    pub dict_templates: BTreeMap<EnumDocumentType, PathBuf>,
    /// Name of the template sheet inside each template workbook.
    pub template_sheet: String,
    /// Conflict behavior when a document name already exists in a folder.
    pub rule_conflict: EnumFileConflictStrategy,
}
