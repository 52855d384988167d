//! Generation report model.

use std::fmt;

use quotekit_schema::EnumDocumentType;

use crate::spec::{
    EnumWarning, NotifyError, SpecHistoryEntry, SpecRenderOutcome, SpecTotals,
};
use crate::store::StoreError;

/// What happened to the optional backup copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumBackupStatus {
    /// Backups are switched off in the dispatch policy.
    Disabled,
    Copied { folder: String },
    Failed { folder: String, error: StoreError },
}

impl EnumBackupStatus {
    pub fn key(&self) -> &'static str {
        match self {
            EnumBackupStatus::Disabled => "disabled",
            EnumBackupStatus::Copied { .. } => "copied",
            EnumBackupStatus::Failed { .. } => "failed",
        }
    }
}

/// What happened to the optional notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumNotificationStatus {
    /// The request did not ask for one.
    NotRequested,
    /// The input carries no email address.
    NoRecipient,
    /// Requested, but no notifier is configured.
    NoNotifier,
    /// Flagged outcome and the policy does not notify flagged documents.
    Held { reasons: Vec<String> },
    Sent { recipient: String },
    Failed { recipient: String, error: NotifyError },
}

impl EnumNotificationStatus {
    pub fn key(&self) -> &'static str {
        match self {
            EnumNotificationStatus::NotRequested => "not_requested",
            EnumNotificationStatus::NoRecipient => "no_recipient",
            EnumNotificationStatus::NoNotifier => "no_notifier",
            EnumNotificationStatus::Held { .. } => "held",
            EnumNotificationStatus::Sent { .. } => "sent",
            EnumNotificationStatus::Failed { .. } => "failed",
        }
    }
}

/// Everything one successful generation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportGeneration {
    pub document_type: EnumDocumentType,
    pub document_name: String,
    /// Location reference after persisting.
    pub document_location: String,
    pub outcome: SpecRenderOutcome,
    pub totals: SpecTotals,
    /// Mismatch and overflow warnings, in detection order.
    pub warnings: Vec<EnumWarning>,
    pub history: SpecHistoryEntry,
    pub backup: EnumBackupStatus,
    pub notification: EnumNotificationStatus,
}

impl ReportGeneration {
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} type={} name={} rows={}/{} overflow={} mismatch={} total={} tax={} grand_total={} warnings={} backup={} notify={}",
            self.document_type,
            self.document_name,
            self.outcome.rows_written,
            self.outcome.items_total,
            self.outcome.overflowed,
            self.outcome.totals_mismatch,
            self.totals.subtotal,
            self.totals.tax,
            self.totals.grand_total,
            self.warning_count(),
            self.backup.key(),
            self.notification.key(),
        )
    }
}

impl fmt::Display for ReportGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[GENERATE]"))
    }
}
