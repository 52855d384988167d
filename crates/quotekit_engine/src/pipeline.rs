//! End-to-end generation: extract, reconcile, render, persist, record,
//! notify.

use chrono::{Local, NaiveDateTime};
use quotekit_schema::SchemaRegistry;

use crate::extract::extract;
use crate::notify::compose_notification;
use crate::reconcile::reconcile;
use crate::record::record;
use crate::render::render;
use crate::report::{EnumBackupStatus, EnumNotificationStatus, ReportGeneration};
use crate::spec::{GenerateError, SpecDocumentHandle};
use crate::store::{CellStore, DocumentStore, HistoryLog, Notifier, StoreError};

/// Per-request switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecGenerateRequest {
    /// Send a notification after recording.
    pub if_notify: bool,
    /// History timestamp; local time when `None`.
    pub timestamp: Option<NaiveDateTime>,
}

/// Runs one request at a time against owned collaborators.
pub struct DocumentGenerator<'a, D, H, N> {
    registry: &'a SchemaRegistry,
    documents: D,
    history: H,
    notifier: Option<N>,
}

impl<'a, D, H, N> DocumentGenerator<'a, D, H, N>
where
    D: DocumentStore,
    H: HistoryLog,
    N: Notifier,
{
    pub fn new(registry: &'a SchemaRegistry, documents: D, history: H, notifier: Option<N>) -> Self {
        Self {
            registry,
            documents,
            history,
            notifier,
        }
    }

    pub fn documents(&self) -> &D {
        &self.documents
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn notifier(&self) -> Option<&N> {
        self.notifier.as_ref()
    }

    /// Generate, persist and record one document from the input form.
    ///
    /// Warnings, backup and notification problems land in the report; only
    /// extraction, rendering, persistence and recording failures are errors.
    pub fn generate<C: CellStore + ?Sized>(
        &mut self,
        cells: &C,
        request: &SpecGenerateRequest,
    ) -> Result<ReportGeneration, GenerateError> {
        let registry = self.registry;

        let input = extract(registry, cells)?;
        let reconciliation = reconcile(&input, registry.tax_policy());
        let rendered = render(registry, &mut self.documents, &input, &reconciliation)?;
        let handle = &rendered.handle;

        let c_folder = registry.folder(input.document_type);
        let (c_name, c_location) = self.persist(handle, c_folder)?;
        let backup = self.backup(handle, c_folder);

        let timestamp = request
            .timestamp
            .unwrap_or_else(|| Local::now().naive_local());
        let history = record(
            registry,
            &self.documents,
            &mut self.history,
            &input,
            handle,
            timestamp,
        )
        .map_err(|source| GenerateError::Record {
            document_name: c_name.clone(),
            source,
        })?;

        let notification = if !request.if_notify {
            EnumNotificationStatus::NotRequested
        } else if rendered.outcome.is_flagged() && !registry.dispatch_policy().notify_flagged {
            EnumNotificationStatus::Held {
                reasons: rendered.warnings.iter().map(ToString::to_string).collect(),
            }
        } else {
            match compose_notification(registry, &input, &c_name, &c_location) {
                None => EnumNotificationStatus::NoRecipient,
                Some(message) => match self.notifier.as_mut() {
                    None => EnumNotificationStatus::NoNotifier,
                    Some(notifier) => match notifier.send(&message) {
                        Ok(()) => EnumNotificationStatus::Sent {
                            recipient: message.recipient,
                        },
                        Err(error) => {
                            tracing::warn!(recipient = %message.recipient, %error, "notification failed");
                            EnumNotificationStatus::Failed {
                                recipient: message.recipient,
                                error,
                            }
                        }
                    },
                },
            }
        };

        let report = ReportGeneration {
            document_type: input.document_type,
            document_name: c_name,
            document_location: c_location,
            outcome: rendered.outcome,
            totals: rendered.totals,
            warnings: rendered.warnings,
            history,
            backup,
            notification,
        };
        tracing::info!(
            document = %report.document_name,
            location = %report.document_location,
            flagged = report.outcome.is_flagged(),
            notify = report.notification.key(),
            "document generated"
        );
        Ok(report)
    }

    /// Move the rendered copy into its folder, discarding it on failure.
    fn persist(
        &mut self,
        handle: &SpecDocumentHandle,
        folder: &str,
    ) -> Result<(String, String), GenerateError> {
        let result = self.documents.move_to(handle, folder).and_then(|()| {
            let c_name = self.documents.name_of(handle)?;
            let c_location = self.documents.location_ref_of(handle)?;
            Ok((c_name, c_location))
        });
        result.map_err(|source: StoreError| {
            if let Err(e_discard) = self.documents.discard(handle) {
                tracing::warn!(%handle, error = %e_discard, "failed to discard unpersisted copy");
            }
            GenerateError::Persist {
                folder: folder.to_string(),
                source,
            }
        })
    }

    /// Mirror the persisted document under the backup folder.
    fn backup(&mut self, handle: &SpecDocumentHandle, folder: &str) -> EnumBackupStatus {
        let registry = self.registry;
        if !registry.dispatch_policy().keep_backup {
            return EnumBackupStatus::Disabled;
        }
        let c_backup = registry.backup_folder();
        let c_folder = format!("{c_backup}/{folder}");
        match self.documents.backup_to(handle, c_backup) {
            Ok(()) => EnumBackupStatus::Copied { folder: c_folder },
            Err(error) => {
                tracing::warn!(%handle, %error, "backup copy failed");
                EnumBackupStatus::Failed {
                    folder: c_folder,
                    error,
                }
            }
        }
    }
}
