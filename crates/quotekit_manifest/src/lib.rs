//! `quotekit_manifest` v1:
//! Append-only CSV dispatch history.
//!
//! Modules:
//! - `history` : `CsvHistoryLog` (a `HistoryLog`) and `read_history`

pub mod history;

pub use history::{CsvHistoryLog, ManifestError, SpecHistoryTable, read_history};
