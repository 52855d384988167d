//! Template copies as workbook files under a documents root.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use quotekit_engine::{DocumentStore, SpecDocumentHandle, StoreError};
use quotekit_io_fs::{EnumFileConflictStrategy, EnumPlaceMode, place_file, sanitize_file_name};
use quotekit_schema::{EnumDocumentType, EnumSheetRole};
use url::Url;

use crate::conf::{EXT_WORKBOOK, NAME_DIR_STAGING};
use crate::spec::SpecXlsxStoreOptions;
use crate::workbook::XlsxWorkbook;

#[derive(Debug, Clone)]
struct XlsxDocument {
    name: String,
    workbook: XlsxWorkbook,
    /// Folder under the root once persisted.
    folder: Option<String>,
    path_file: Option<PathBuf>,
}

/// [`DocumentStore`] writing `<root>/<folder>/<name>.xlsx`.
///
/// Copies stay in memory until [`DocumentStore::move_to`] saves them into the
/// staging folder and moves the file into place. Locations are `file://` URLs.
/// Generated files hold the template's values without its formatting.
#[derive(Debug, Clone)]
pub struct XlsxDocumentStore {
    spec_options: SpecXlsxStoreOptions,
    dict_documents: BTreeMap<SpecDocumentHandle, XlsxDocument>,
    n_copies: usize,
}

impl XlsxDocumentStore {
    pub fn new(spec_options: SpecXlsxStoreOptions) -> Self {
        Self {
            spec_options,
            dict_documents: BTreeMap::new(),
            n_copies: 0,
        }
    }

    pub fn path_dir_root(&self) -> &Path {
        &self.spec_options.path_dir_root
    }

    /// File of a persisted document.
    pub fn path_of(&self, handle: &SpecDocumentHandle) -> Option<&Path> {
        self.dict_documents
            .get(handle)
            .and_then(|doc| doc.path_file.as_deref())
    }

    fn path_dir_staging(&self) -> PathBuf {
        self.spec_options.path_dir_root.join(NAME_DIR_STAGING)
    }

    fn path_staging_of(&self, handle: &SpecDocumentHandle) -> PathBuf {
        self.path_dir_staging()
            .join(format!("{}.{EXT_WORKBOOK}", handle.id()))
    }

    fn document(&self, handle: &SpecDocumentHandle) -> Result<&XlsxDocument, StoreError> {
        self.dict_documents
            .get(handle)
            .ok_or_else(|| StoreError::UnknownHandle(handle.clone()))
    }
}

impl DocumentStore for XlsxDocumentStore {
    type Cells = XlsxWorkbook;

    /// Loads the template's cell values only. Styling, formulas and merged
    /// cells are not carried into the generated workbook.
    fn copy_template(
        &mut self,
        document_type: EnumDocumentType,
        name_hint: &str,
    ) -> Result<SpecDocumentHandle, StoreError> {
        let path_template = self
            .spec_options
            .dict_templates
            .get(&document_type)
            .filter(|p| p.is_file())
            .ok_or(StoreError::TemplateUnavailable(document_type))?;
        let workbook = XlsxWorkbook::open(
            path_template,
            BTreeMap::from([(
                EnumSheetRole::Template,
                self.spec_options.template_sheet.clone(),
            )]),
        )
        .map_err(|e| e.into_store_error("copy_template"))?;

        self.n_copies += 1;
        let handle = SpecDocumentHandle::new(format!("xlsx-{}", self.n_copies));
        self.dict_documents.insert(
            handle.clone(),
            XlsxDocument {
                name: sanitize_file_name(name_hint),
                workbook,
                folder: None,
                path_file: None,
            },
        );
        tracing::debug!(%handle, template = %path_template.display(), "template copied");
        Ok(handle)
    }

    fn cells_mut(&mut self, handle: &SpecDocumentHandle) -> Result<&mut Self::Cells, StoreError> {
        self.dict_documents
            .get_mut(handle)
            .map(|doc| &mut doc.workbook)
            .ok_or_else(|| StoreError::UnknownHandle(handle.clone()))
    }

    fn move_to(&mut self, handle: &SpecDocumentHandle, folder: &str) -> Result<(), StoreError> {
        let path_staging = self.path_staging_of(handle);
        let path_dir_dst = self.spec_options.path_dir_root.join(folder);
        let rule_conflict = self.spec_options.rule_conflict;
        let doc = self.document(handle)?;

        fs::create_dir_all(self.path_dir_staging())
            .map_err(|e| StoreError::unavailable("move_to", e.to_string()))?;
        doc.workbook
            .save(&path_staging)
            .map_err(|e| e.into_store_error("move_to"))?;

        let name_file = format!("{}.{EXT_WORKBOOK}", doc.name);
        let res_place = place_file(
            &path_staging,
            &path_dir_dst,
            &name_file,
            EnumPlaceMode::Move,
            rule_conflict,
        );
        let path_file = match res_place {
            Ok(Some(v)) => v,
            Ok(None) => {
                remove_file_if_exists(&path_staging);
                return Err(StoreError::unavailable(
                    "move_to",
                    format!("{name_file} already exists in {folder}"),
                ));
            }
            Err(e) => {
                remove_file_if_exists(&path_staging);
                return Err(StoreError::unavailable("move_to", e.to_string()));
            }
        };

        let doc = self
            .dict_documents
            .get_mut(handle)
            .ok_or_else(|| StoreError::UnknownHandle(handle.clone()))?;
        if let Some(path_previous) = doc.path_file.replace(path_file.clone())
            && path_previous != path_file
        {
            remove_file_if_exists(&path_previous);
        }
        if let Some(stem) = path_file.file_stem() {
            doc.name = stem.to_string_lossy().into_owned();
        }
        doc.folder = Some(folder.to_string());
        tracing::info!(%handle, path = %path_file.display(), "document persisted");
        Ok(())
    }

    /// Overwrites an earlier copy at the same path, so the result matches
    /// what a folder backup of `<root>/<folder>/` produces.
    fn backup_to(
        &mut self,
        handle: &SpecDocumentHandle,
        backup_folder: &str,
    ) -> Result<(), StoreError> {
        let doc = self.document(handle)?;
        let (Some(path_file), Some(folder)) = (doc.path_file.as_deref(), doc.folder.as_deref())
        else {
            return Err(StoreError::unavailable(
                "backup_to",
                format!("document {handle} is not persisted"),
            ));
        };
        let name_file = format!("{}.{EXT_WORKBOOK}", doc.name);
        let path_dir_dst = self
            .spec_options
            .path_dir_root
            .join(backup_folder)
            .join(folder);

        let path_copy = place_file(
            path_file,
            &path_dir_dst,
            &name_file,
            EnumPlaceMode::Copy,
            EnumFileConflictStrategy::Overwrite,
        )
        .map_err(|e| StoreError::unavailable("backup_to", e.to_string()))?;
        if let Some(path_copy) = path_copy {
            tracing::info!(%handle, path = %path_copy.display(), "document backed up");
        }
        Ok(())
    }

    fn name_of(&self, handle: &SpecDocumentHandle) -> Result<String, StoreError> {
        Ok(self.document(handle)?.name.clone())
    }

    fn location_ref_of(&self, handle: &SpecDocumentHandle) -> Result<String, StoreError> {
        let doc = self.document(handle)?;
        let path_file = match &doc.path_file {
            Some(v) => v.clone(),
            None => self.path_staging_of(handle),
        };
        Ok(derive_file_url(&path_file))
    }

    fn discard(&mut self, handle: &SpecDocumentHandle) -> Result<(), StoreError> {
        let doc = self
            .dict_documents
            .remove(handle)
            .ok_or_else(|| StoreError::UnknownHandle(handle.clone()))?;
        remove_file_if_exists(&self.path_staging_of(handle));
        if let Some(path_file) = &doc.path_file {
            remove_file_if_exists(path_file);
        }
        tracing::debug!(%handle, "document discarded");
        Ok(())
    }
}

/// `file://` URL of `path`, or its display form when no URL can be built.
pub fn derive_file_url(path: &Path) -> String {
    let path_abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    Url::from_file_path(&path_abs)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| path_abs.display().to_string())
}

fn remove_file_if_exists(path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(e) = fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove file");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::Path;

    use quotekit_engine::memory::{MemoryCellStore, MemoryHistoryLog, RecordingNotifier};
    use quotekit_engine::{
        CellStore, DocumentGenerator, DocumentStore, EnumBackupStatus, EnumCellValue,
        SpecGenerateRequest, StoreError,
    };
    use quotekit_io_fs::{EnumFileConflictStrategy, SpecBackupOptions, backup_folders};
    use quotekit_schema::{
        EnumDocumentType, EnumSheetRole, SchemaRegistry, SpecCellCoordinate,
        derive_default_schema_raw,
    };
    use rust_decimal::Decimal;

    use super::{XlsxDocumentStore, derive_file_url};
    use crate::spec::SpecXlsxStoreOptions;
    use crate::workbook::XlsxWorkbook;

    const NAME_SHEET: &str = "テンプレート";

    fn coord(a1: &str) -> SpecCellCoordinate {
        SpecCellCoordinate::from_a1(a1).unwrap()
    }

    fn make_store(path_root: &Path) -> XlsxDocumentStore {
        let path_template = path_root.join("estimate_template.xlsx");
        let mut template = XlsxWorkbook::new().with_sheet(EnumSheetRole::Template, NAME_SHEET);
        template
            .write_cell(EnumSheetRole::Template, coord("H1"), "株式会社サンプル".into())
            .unwrap();
        template.save(&path_template).unwrap();

        XlsxDocumentStore::new(SpecXlsxStoreOptions {
            path_dir_root: path_root.join("docs"),
            dict_templates: BTreeMap::from([(EnumDocumentType::Estimate, path_template)]),
            template_sheet: NAME_SHEET.to_string(),
            rule_conflict: EnumFileConflictStrategy::Rename,
        })
    }

    #[test]
    fn copy_write_move_and_backup() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = make_store(dir.path());

        let handle = store
            .copy_template(EnumDocumentType::Estimate, "見積書_ACME_20240401")
            .unwrap();
        store
            .cells_mut(&handle)
            .unwrap()
            .write_cell(EnumSheetRole::Template, coord("B3"), "ACME".into())
            .unwrap();
        store.move_to(&handle, "見積書").unwrap();

        let path_file = dir.path().join("docs").join("見積書").join("見積書_ACME_20240401.xlsx");
        assert_eq!(store.path_of(&handle), Some(path_file.as_path()));
        assert_eq!(store.name_of(&handle).unwrap(), "見積書_ACME_20240401");
        assert!(store.location_ref_of(&handle).unwrap().starts_with("file:///"));

        let loaded = XlsxWorkbook::open(
            &path_file,
            BTreeMap::from([(EnumSheetRole::Template, NAME_SHEET.to_string())]),
        )
        .unwrap();
        assert_eq!(
            loaded.read_cell(EnumSheetRole::Template, coord("B3")).unwrap(),
            EnumCellValue::Text("ACME".to_string())
        );
        assert_eq!(
            loaded.read_cell(EnumSheetRole::Template, coord("H1")).unwrap(),
            EnumCellValue::Text("株式会社サンプル".to_string())
        );

        store.backup_to(&handle, "backup").unwrap();
        store.backup_to(&handle, "backup").unwrap();
        let path_dir_backup = dir.path().join("docs").join("backup").join("見積書");
        assert!(path_dir_backup.join("見積書_ACME_20240401.xlsx").is_file());
        assert_eq!(fs::read_dir(&path_dir_backup).unwrap().count(), 1);
        assert!(!dir.path().join("docs").join(".staging").join("xlsx-1.xlsx").exists());
    }

    #[test]
    fn generated_backup_matches_folder_backup_layout() {
        let dir = tempfile::tempdir().unwrap();
        let mut raw = derive_default_schema_raw();
        raw.tax.rate = Some(Decimal::new(10, 2));
        raw.dispatch.keep_backup = true;
        let registry = SchemaRegistry::from_raw(&raw).unwrap();

        let mut cells = MemoryCellStore::new();
        let l_values: [(&str, EnumCellValue); 6] = [
            ("B2", "見積書".into()),
            ("B3", "2024-04-01".into()),
            ("B4", "ACME".into()),
            ("A10", "Widget".into()),
            ("B10", Decimal::ONE.into()),
            ("C10", Decimal::new(500, 0).into()),
        ];
        for (a1, value) in l_values {
            cells.set(EnumSheetRole::Input, coord(a1), value);
        }

        let mut generator = DocumentGenerator::new(
            &registry,
            make_store(dir.path()),
            MemoryHistoryLog::new(),
            None::<RecordingNotifier>,
        );
        let report = generator
            .generate(&cells, &SpecGenerateRequest::default())
            .unwrap();
        assert_eq!(
            report.backup,
            EnumBackupStatus::Copied {
                folder: "バックアップ/見積書".to_string()
            }
        );
        let path_dir_backup = dir.path().join("docs").join("バックアップ").join("見積書");
        assert!(path_dir_backup.join("見積書_ACME_20240401.xlsx").is_file());

        let report_backup = backup_folders(
            &dir.path().join("docs"),
            &["見積書"],
            "バックアップ",
            &SpecBackupOptions::default(),
        )
        .unwrap();
        assert_eq!(report_backup.cnt_matched, 1);
        assert_eq!(report_backup.cnt_copied, 0);
        assert_eq!(report_backup.cnt_skipped, 1);
        assert_eq!(fs::read_dir(&path_dir_backup).unwrap().count(), 1);
        assert!(
            !dir.path()
                .join("docs")
                .join("バックアップ")
                .join("見積書_ACME_20240401.xlsx")
                .exists()
        );
    }

    #[test]
    fn same_name_twice_is_renamed() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = make_store(dir.path());
        for _ in 0..2 {
            let handle = store.copy_template(EnumDocumentType::Estimate, "doc").unwrap();
            store.move_to(&handle, "見積書").unwrap();
        }
        let handle_last = store.copy_template(EnumDocumentType::Estimate, "doc").unwrap();
        store.move_to(&handle_last, "見積書").unwrap();
        assert_eq!(store.name_of(&handle_last).unwrap(), "doc (3)");
    }

    #[test]
    fn missing_template_and_unknown_handle() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = make_store(dir.path());
        assert_eq!(
            store.copy_template(EnumDocumentType::Invoice, "x"),
            Err(StoreError::TemplateUnavailable(EnumDocumentType::Invoice))
        );

        let handle = store.copy_template(EnumDocumentType::Estimate, "x").unwrap();
        assert!(store.backup_to(&handle, "backup").is_err());
        store.discard(&handle).unwrap();
        assert!(matches!(
            store.name_of(&handle),
            Err(StoreError::UnknownHandle(_))
        ));
    }

    #[test]
    fn file_url_is_absolute() {
        let url = derive_file_url(Path::new("/tmp/見積書/a b.xlsx"));
        assert!(url.starts_with("file:///tmp/"));
        assert!(url.ends_with("a%20b.xlsx"));
    }
}
