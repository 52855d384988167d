//! Dispatch history recording.

use chrono::NaiveDateTime;
use quotekit_schema::{EnumHistoryColumn, SchemaRegistry};

use crate::conf::FMT_HISTORY_TIMESTAMP;
use crate::spec::{RecordError, SpecDocumentHandle, SpecHistoryEntry, SpecInputData};
use crate::store::{DocumentStore, HistoryLog};

/// Append one history row describing a persisted document.
///
/// Values follow the configured header order. Nothing is read back or
/// rewritten.
pub fn record<D, H>(
    registry: &SchemaRegistry,
    documents: &D,
    history: &mut H,
    input: &SpecInputData,
    handle: &SpecDocumentHandle,
    timestamp: NaiveDateTime,
) -> Result<SpecHistoryEntry, RecordError>
where
    D: DocumentStore + ?Sized,
    H: HistoryLog + ?Sized,
{
    let c_name = documents.name_of(handle)?;
    let c_location = documents.location_ref_of(handle)?;

    let l_values: Vec<String> = registry
        .history_headers()
        .iter()
        .map(|header| match header.column {
            EnumHistoryColumn::Timestamp => timestamp.format(FMT_HISTORY_TIMESTAMP).to_string(),
            EnumHistoryColumn::DocumentType => {
                registry.document_label(input.document_type).to_string()
            }
            EnumHistoryColumn::CompanyName => input.company_name.clone(),
            EnumHistoryColumn::Email => input.email.clone().unwrap_or_default(),
            EnumHistoryColumn::DocumentName => c_name.clone(),
            EnumHistoryColumn::DocumentLocation => c_location.clone(),
        })
        .collect();

    history.append_row(&l_values)?;
    tracing::debug!(document = %c_name, columns = l_values.len(), "history row appended");

    Ok(SpecHistoryEntry {
        timestamp,
        values: l_values,
    })
}
