//! Backup report model and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::spec::SpecFileError;

/// Aggregate counters and diagnostics for one backup run.
#[derive(Debug, Default, Clone)]
pub struct ReportBackup {
    /// Files found in the source folders.
    pub cnt_scanned: u64,
    /// Files that passed the include/exclude filters.
    pub cnt_matched: u64,
    /// Files written into the backup folder.
    pub cnt_copied: u64,
    /// Files skipped by conflict policy or dry run.
    pub cnt_skipped: u64,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
    /// Per-file failures.
    pub errors: Vec<SpecFileError>,
}

impl ReportBackup {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        BTreeMap::from([
            ("cnt_scanned".to_string(), self.cnt_scanned),
            ("cnt_matched".to_string(), self.cnt_matched),
            ("cnt_copied".to_string(), self.cnt_copied),
            ("cnt_skipped".to_string(), self.cnt_skipped),
            ("cnt_errors".to_string(), self.error_count() as u64),
            ("cnt_warnings".to_string(), self.warning_count() as u64),
        ])
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} scanned={} matched={} copied={} skipped={} errors={} warnings={}",
            self.cnt_scanned,
            self.cnt_matched,
            self.cnt_copied,
            self.cnt_skipped,
            self.error_count(),
            self.warning_count()
        )
    }
}

impl fmt::Display for ReportBackup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[BACKUP]"))
    }
}

/// Mutable accumulator for backup statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportBackupBuilder {
    report: ReportBackup,
}

impl ReportBackupBuilder {
    pub fn add_scanned(&mut self) {
        self.report.cnt_scanned += 1;
    }

    pub fn add_matched(&mut self) {
        self.report.cnt_matched += 1;
    }

    pub fn add_copied(&mut self) {
        self.report.cnt_copied += 1;
    }

    pub fn add_skipped(&mut self) {
        self.report.cnt_skipped += 1;
    }

    pub fn add_warning(&mut self, warning: String) {
        tracing::warn!(%warning, "backup warning");
        self.report.warnings.push(warning);
    }

    pub fn add_error(&mut self, path: PathBuf, exception: String) {
        tracing::warn!(path = %path.display(), %exception, "backup error");
        self.report.errors.push(SpecFileError { path, exception });
    }

    pub fn build(self) -> ReportBackup {
        self.report
    }
}
