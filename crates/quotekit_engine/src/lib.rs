//! `quotekit_engine` v1:
//! Document rendering and totals reconciliation over abstract stores.
//!
//! Modules:
//! - `extract`   : input form -> `SpecInputData`
//! - `reconcile` : recomputed totals and mismatch warnings
//! - `render`    : template copy with a fixed item window
//! - `record`    : history log row
//! - `notify`    : notification composition
//! - `pipeline`  : `DocumentGenerator` orchestration
//! - `store`     : collaborator traits
//! - `memory`    : in-memory collaborators
//! - `spec`      : models, warnings, errors
//! - `report`    : generation report

pub mod conf;
pub mod extract;
pub mod memory;
pub mod notify;
pub mod pipeline;
pub mod reconcile;
pub mod record;
pub mod render;
pub mod report;
pub mod spec;
pub mod store;
mod util;

pub use extract::extract;
pub use notify::compose_notification;
pub use pipeline::{DocumentGenerator, SpecGenerateRequest};
pub use reconcile::{derive_totals, reconcile};
pub use record::record;
pub use render::{derive_document_name_hint, render};
pub use report::{EnumBackupStatus, EnumNotificationStatus, ReportGeneration};
pub use spec::{
    CellCoerceError, CellGrid, EnumCellValue, EnumItemColumn, EnumWarning, ExtractError,
    GenerateError, NotifyError, RecordError, RenderError, SpecClaimedTotals, SpecDocumentHandle,
    SpecHistoryEntry, SpecInputData, SpecItemData, SpecNotification, SpecReconciliation,
    SpecRenderOutcome, SpecRendered, SpecTotals,
};
pub use store::{CellStore, DocumentStore, HistoryLog, Notifier, StoreError};
