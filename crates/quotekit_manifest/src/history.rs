//! CSV-backed dispatch history log.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use quotekit_engine::{HistoryLog, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("history file {} has headers {found:?}, expected {expected:?}", path.display())]
    HeaderMismatch {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("history file {} is unreadable: {message}", path.display())]
    Read { path: PathBuf, message: String },
    #[error("history file {} is not writable: {message}", path.display())]
    Write { path: PathBuf, message: String },
}

/// Header row plus data rows of a history file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecHistoryTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// CSV file that only ever grows by one row per dispatch.
///
/// The header row is written when the file is created. Opening a file whose
/// header row differs from the configured labels fails.
#[derive(Debug, Clone)]
pub struct CsvHistoryLog {
    path_file: PathBuf,
    l_headers: Vec<String>,
}

impl CsvHistoryLog {
    pub fn open(path_file: &Path, l_headers: Vec<String>) -> Result<Self, ManifestError> {
        let if_has_content = fs::metadata(path_file).is_ok_and(|m| m.len() > 0);
        if if_has_content {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(true)
                .flexible(true)
                .from_path(path_file)
                .map_err(|e| read_error(path_file, e))?;
            let l_found = reader
                .headers()
                .map_err(|e| read_error(path_file, e))?
                .iter()
                .map(str::to_string)
                .collect::<Vec<_>>();
            if l_found != l_headers {
                return Err(ManifestError::HeaderMismatch {
                    path: path_file.to_path_buf(),
                    expected: l_headers,
                    found: l_found,
                });
            }
        } else {
            if let Some(path_parent) = path_file.parent()
                && !path_parent.as_os_str().is_empty()
            {
                fs::create_dir_all(path_parent).map_err(|e| ManifestError::Write {
                    path: path_file.to_path_buf(),
                    message: e.to_string(),
                })?;
            }
            let mut writer = csv::Writer::from_path(path_file).map_err(|e| ManifestError::Write {
                path: path_file.to_path_buf(),
                message: e.to_string(),
            })?;
            writer
                .write_record(&l_headers)
                .and_then(|_| writer.flush().map_err(csv::Error::from))
                .map_err(|e| ManifestError::Write {
                    path: path_file.to_path_buf(),
                    message: e.to_string(),
                })?;
            tracing::info!(path = %path_file.display(), "history file created");
        }

        Ok(Self {
            path_file: path_file.to_path_buf(),
            l_headers,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path_file
    }

    pub fn headers(&self) -> &[String] {
        &self.l_headers
    }
}

impl HistoryLog for CsvHistoryLog {
    fn append_row(&mut self, values: &[String]) -> Result<(), StoreError> {
        if values.len() != self.l_headers.len() {
            return Err(StoreError::unavailable(
                "append_row",
                format!(
                    "row has {} values, history has {} columns",
                    values.len(),
                    self.l_headers.len()
                ),
            ));
        }
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path_file)
            .map_err(|e| StoreError::unavailable("append_row", e.to_string()))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .write_record(values)
            .map_err(|e| StoreError::unavailable("append_row", e.to_string()))?;
        writer
            .flush()
            .map_err(|e| StoreError::unavailable("append_row", e.to_string()))?;
        tracing::debug!(path = %self.path_file.display(), "history row appended");
        Ok(())
    }
}

/// Read every row of a history file.
pub fn read_history(path_file: &Path) -> Result<SpecHistoryTable, ManifestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path_file)
        .map_err(|e| read_error(path_file, e))?;
    let headers = reader
        .headers()
        .map_err(|e| read_error(path_file, e))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| read_error(path_file, e))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(SpecHistoryTable { headers, rows })
}

fn read_error(path_file: &Path, err: csv::Error) -> ManifestError {
    ManifestError::Read {
        path: path_file.to_path_buf(),
        message: err.to_string(),
    }
}
