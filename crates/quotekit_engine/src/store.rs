//! Collaborator capabilities the engine drives.
//!
//! The engine never touches files, sheets or mail directly; adapters
//! implement these traits (`quotekit_io_xlsx`, `quotekit_manifest`, the CLI
//! SMTP notifier, and the in-memory doubles in [`crate::memory`]).

use quotekit_schema::{EnumDocumentType, EnumSheetRole, SpecCellCoordinate, SpecCellRange};
use thiserror::Error;

use crate::spec::{CellGrid, EnumCellValue, NotifyError, SpecDocumentHandle, SpecNotification};

/// Collaborator failure, surfaced unchanged and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("no sheet is available for role {0:?}")]
    SheetUnavailable(EnumSheetRole),
    #[error("no template is available for {0}")]
    TemplateUnavailable(EnumDocumentType),
    #[error("unknown document handle `{0}`")]
    UnknownHandle(SpecDocumentHandle),
    #[error("{operation} failed: {message}")]
    Unavailable {
        operation: &'static str,
        message: String,
    },
}

impl StoreError {
    pub fn unavailable(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            operation,
            message: message.into(),
        }
    }
}

/// Cell read/write primitives addressed by sheet role.
pub trait CellStore {
    fn read_cell(
        &self,
        role: EnumSheetRole,
        coord: SpecCellCoordinate,
    ) -> Result<EnumCellValue, StoreError>;

    fn write_cell(
        &mut self,
        role: EnumSheetRole,
        coord: SpecCellCoordinate,
        value: EnumCellValue,
    ) -> Result<(), StoreError>;

    /// Read a rectangle row by row. Cells outside the stored data are empty.
    fn read_range(
        &self,
        role: EnumSheetRole,
        range: SpecCellRange,
    ) -> Result<CellGrid, StoreError> {
        let mut grid = Vec::with_capacity(range.n_rows() as usize);
        for row in range.start.row..=range.end.row {
            let mut l_row = Vec::with_capacity(range.n_cols() as usize);
            for col in range.start.col..=range.end.col {
                l_row.push(self.read_cell(role, SpecCellCoordinate::new(row, col))?);
            }
            grid.push(l_row);
        }
        Ok(grid)
    }
}

/// Template copies and their persistence.
///
/// Rendered copies are edited through [`DocumentStore::cells_mut`] under the
/// [`EnumSheetRole::Template`] role.
pub trait DocumentStore {
    type Cells: CellStore;

    /// Copy the template of `document_type`; `name_hint` suggests a name.
    fn copy_template(
        &mut self,
        document_type: EnumDocumentType,
        name_hint: &str,
    ) -> Result<SpecDocumentHandle, StoreError>;

    fn cells_mut(&mut self, handle: &SpecDocumentHandle) -> Result<&mut Self::Cells, StoreError>;

    /// Persist the document into `folder`. The handle stays valid.
    fn move_to(&mut self, handle: &SpecDocumentHandle, folder: &str) -> Result<(), StoreError>;

    /// Copy the persisted document to `<backup_folder>/<its folder>/`, keeping
    /// its name. This is the layout a folder backup mirrors.
    fn backup_to(
        &mut self,
        handle: &SpecDocumentHandle,
        backup_folder: &str,
    ) -> Result<(), StoreError>;

    fn name_of(&self, handle: &SpecDocumentHandle) -> Result<String, StoreError>;

    /// Reference a reader can follow to the document (URL or path).
    fn location_ref_of(&self, handle: &SpecDocumentHandle) -> Result<String, StoreError>;

    /// Drop an unfinished copy.
    fn discard(&mut self, handle: &SpecDocumentHandle) -> Result<(), StoreError>;
}

/// Append-only dispatch log.
pub trait HistoryLog {
    /// Append one row; `values` follow the configured header order.
    fn append_row(&mut self, values: &[String]) -> Result<(), StoreError>;
}

/// Outbound message transport.
pub trait Notifier {
    fn send(&mut self, notification: &SpecNotification) -> Result<(), NotifyError>;
}
