//! In-memory collaborators for dry runs and tests.

use std::collections::BTreeMap;

use quotekit_schema::{EnumDocumentType, EnumSheetRole, SpecCellCoordinate};

use crate::spec::{EnumCellValue, NotifyError, SpecDocumentHandle, SpecNotification};
use crate::store::{CellStore, DocumentStore, HistoryLog, Notifier, StoreError};

////////////////////////////////////////////////////////////////////////////////
// #region Cells

/// Sparse cell map keyed by role and coordinate.
///
/// Every write is kept, blanks included, so callers can tell an explicitly
/// cleared cell from one never touched.
#[derive(Debug, Clone, Default)]
pub struct MemoryCellStore {
    dict_cells: BTreeMap<(EnumSheetRole, SpecCellCoordinate), EnumCellValue>,
    coord_fail_write: Option<SpecCellCoordinate>,
}

impl MemoryCellStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without going through [`CellStore::write_cell`].
    pub fn set(&mut self, role: EnumSheetRole, coord: SpecCellCoordinate, value: EnumCellValue) {
        self.dict_cells.insert((role, coord), value);
    }

    /// Value stored at `coord`, or `None` when the cell was never set.
    pub fn written(&self, role: EnumSheetRole, coord: SpecCellCoordinate) -> Option<EnumCellValue> {
        self.dict_cells.get(&(role, coord)).cloned()
    }

    pub fn written_values(&self, role: EnumSheetRole) -> impl Iterator<Item = &EnumCellValue> {
        self.dict_cells
            .iter()
            .filter(move |((r, _), _)| *r == role)
            .map(|(_, v)| v)
    }

    /// Non-blank cells of `role` in row-major order.
    pub fn populated(
        &self,
        role: EnumSheetRole,
    ) -> impl Iterator<Item = (SpecCellCoordinate, &EnumCellValue)> {
        self.dict_cells
            .iter()
            .filter(move |((r, _), v)| *r == role && !v.is_empty())
            .map(|((_, c), v)| (*c, v))
    }

    /// Make writes to `coord` fail, for any role.
    pub fn fail_writes_at(&mut self, coord: SpecCellCoordinate) {
        self.coord_fail_write = Some(coord);
    }
}

impl CellStore for MemoryCellStore {
    fn read_cell(
        &self,
        role: EnumSheetRole,
        coord: SpecCellCoordinate,
    ) -> Result<EnumCellValue, StoreError> {
        Ok(self.written(role, coord).unwrap_or_default())
    }

    fn write_cell(
        &mut self,
        role: EnumSheetRole,
        coord: SpecCellCoordinate,
        value: EnumCellValue,
    ) -> Result<(), StoreError> {
        if self.coord_fail_write == Some(coord) {
            return Err(StoreError::unavailable(
                "write_cell",
                format!("cell {coord} is locked"),
            ));
        }
        self.set(role, coord, value);
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Documents

#[derive(Debug, Clone)]
struct MemoryDocument {
    name: String,
    folder: Option<String>,
    cells: MemoryCellStore,
}

/// Document store keeping every copy in memory.
///
/// Locations are `memory://<folder>/<name>`; unpersisted copies live under
/// `memory://staging/`.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    dict_templates: BTreeMap<EnumDocumentType, MemoryCellStore>,
    dict_documents: BTreeMap<SpecDocumentHandle, MemoryDocument>,
    l_discarded: Vec<SpecDocumentHandle>,
    l_backups: Vec<(String, String)>,
    coord_fail_write: Option<SpecCellCoordinate>,
    if_fail_move: bool,
    n_copies: usize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-filled template cells copied into every new document of that type.
    pub fn with_template(mut self, document_type: EnumDocumentType, cells: MemoryCellStore) -> Self {
        self.dict_templates.insert(document_type, cells);
        self
    }

    /// Make writes to `coord` fail in copies made from now on.
    pub fn fail_writes_at(&mut self, coord: SpecCellCoordinate) {
        self.coord_fail_write = Some(coord);
    }

    pub fn fail_moves(&mut self, value: bool) {
        self.if_fail_move = value;
    }

    /// Number of templates copied so far.
    pub fn n_copies(&self) -> usize {
        self.n_copies
    }

    pub fn discarded(&self) -> &[SpecDocumentHandle] {
        &self.l_discarded
    }

    /// `(folder path, name)` pairs copied by [`DocumentStore::backup_to`].
    pub fn backups(&self) -> &[(String, String)] {
        &self.l_backups
    }

    pub fn cells(&self, handle: &SpecDocumentHandle) -> Option<&MemoryCellStore> {
        self.dict_documents.get(handle).map(|doc| &doc.cells)
    }

    /// Cells of the single live document, if exactly one exists.
    pub fn only_document_cells(&self) -> Option<&MemoryCellStore> {
        let mut iter = self.dict_documents.values();
        match (iter.next(), iter.next()) {
            (Some(doc), None) => Some(&doc.cells),
            _ => None,
        }
    }

    pub fn name_hint_of(&self, handle: &SpecDocumentHandle) -> Option<String> {
        self.dict_documents.get(handle).map(|doc| doc.name.clone())
    }

    pub fn folder_of(&self, handle: &SpecDocumentHandle) -> Option<&str> {
        self.dict_documents
            .get(handle)
            .and_then(|doc| doc.folder.as_deref())
    }

    fn document(&self, handle: &SpecDocumentHandle) -> Result<&MemoryDocument, StoreError> {
        self.dict_documents
            .get(handle)
            .ok_or_else(|| StoreError::UnknownHandle(handle.clone()))
    }
}

impl DocumentStore for MemoryDocumentStore {
    type Cells = MemoryCellStore;

    fn copy_template(
        &mut self,
        document_type: EnumDocumentType,
        name_hint: &str,
    ) -> Result<SpecDocumentHandle, StoreError> {
        self.n_copies += 1;
        let handle = SpecDocumentHandle::new(format!("memory-{}", self.n_copies));
        let mut cells = self
            .dict_templates
            .get(&document_type)
            .cloned()
            .unwrap_or_default();
        cells.coord_fail_write = self.coord_fail_write;
        self.dict_documents.insert(
            handle.clone(),
            MemoryDocument {
                name: name_hint.to_string(),
                folder: None,
                cells,
            },
        );
        Ok(handle)
    }

    fn cells_mut(&mut self, handle: &SpecDocumentHandle) -> Result<&mut Self::Cells, StoreError> {
        self.dict_documents
            .get_mut(handle)
            .map(|doc| &mut doc.cells)
            .ok_or_else(|| StoreError::UnknownHandle(handle.clone()))
    }

    fn move_to(&mut self, handle: &SpecDocumentHandle, folder: &str) -> Result<(), StoreError> {
        if self.if_fail_move {
            return Err(StoreError::unavailable("move_to", "folder is read-only"));
        }
        let doc = self
            .dict_documents
            .get_mut(handle)
            .ok_or_else(|| StoreError::UnknownHandle(handle.clone()))?;
        doc.folder = Some(folder.to_string());
        Ok(())
    }

    fn backup_to(
        &mut self,
        handle: &SpecDocumentHandle,
        backup_folder: &str,
    ) -> Result<(), StoreError> {
        let doc = self.document(handle)?;
        let c_folder = doc.folder.as_deref().ok_or_else(|| {
            StoreError::unavailable("backup_to", format!("document {handle} is not persisted"))
        })?;
        let entry = (format!("{backup_folder}/{c_folder}"), doc.name.clone());
        self.l_backups.push(entry);
        Ok(())
    }

    fn name_of(&self, handle: &SpecDocumentHandle) -> Result<String, StoreError> {
        Ok(self.document(handle)?.name.clone())
    }

    fn location_ref_of(&self, handle: &SpecDocumentHandle) -> Result<String, StoreError> {
        let doc = self.document(handle)?;
        let c_folder = doc.folder.as_deref().unwrap_or("staging");
        Ok(format!("memory://{c_folder}/{}", doc.name))
    }

    fn discard(&mut self, handle: &SpecDocumentHandle) -> Result<(), StoreError> {
        self.dict_documents
            .remove(handle)
            .ok_or_else(|| StoreError::UnknownHandle(handle.clone()))?;
        self.l_discarded.push(handle.clone());
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region HistoryAndNotifier

/// History log collecting rows in a vector.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistoryLog {
    l_rows: Vec<Vec<String>>,
    if_unavailable: bool,
}

impl MemoryHistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.l_rows
    }

    pub fn set_unavailable(&mut self, value: bool) {
        self.if_unavailable = value;
    }
}

impl HistoryLog for MemoryHistoryLog {
    fn append_row(&mut self, values: &[String]) -> Result<(), StoreError> {
        if self.if_unavailable {
            return Err(StoreError::unavailable("append_row", "history log is offline"));
        }
        self.l_rows.push(values.to_vec());
        Ok(())
    }
}

/// Notifier that records messages instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    l_sent: Vec<SpecNotification>,
    err_next: Option<NotifyError>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every following send with `err`.
    pub fn fail_with(mut self, err: NotifyError) -> Self {
        self.err_next = Some(err);
        self
    }

    pub fn sent(&self) -> &[SpecNotification] {
        &self.l_sent
    }
}

impl Notifier for RecordingNotifier {
    fn send(&mut self, notification: &SpecNotification) -> Result<(), NotifyError> {
        if let Some(err) = &self.err_next {
            return Err(err.clone());
        }
        self.l_sent.push(notification.clone());
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
