//! Request models, outcomes, warnings and error types.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use quotekit_schema::{EnumDocumentType, EnumField, SpecCellCoordinate};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::store::StoreError;

////////////////////////////////////////////////////////////////////////////////
// #region CellValues

/// Value read from or written to one cell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EnumCellValue {
    /// Blank cell. Writing it clears the target.
    #[default]
    Empty,
    Text(String),
    Number(Decimal),
    Date(NaiveDate),
}

impl EnumCellValue {
    /// Blank, or text made only of whitespace.
    pub fn is_empty(&self) -> bool {
        match self {
            EnumCellValue::Empty => true,
            EnumCellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Display text of the value, trimmed. Blank cells yield `""`.
    pub fn to_text(&self) -> String {
        match self {
            EnumCellValue::Empty => String::new(),
            EnumCellValue::Text(s) => s.trim().to_string(),
            EnumCellValue::Number(n) => n.normalize().to_string(),
            EnumCellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

impl From<&str> for EnumCellValue {
    fn from(value: &str) -> Self {
        EnumCellValue::Text(value.to_string())
    }
}

impl From<String> for EnumCellValue {
    fn from(value: String) -> Self {
        EnumCellValue::Text(value)
    }
}

impl From<Decimal> for EnumCellValue {
    fn from(value: Decimal) -> Self {
        EnumCellValue::Number(value)
    }
}

impl From<NaiveDate> for EnumCellValue {
    fn from(value: NaiveDate) -> Self {
        EnumCellValue::Date(value)
    }
}

/// Row-major block of values; every row has the range's column count.
pub type CellGrid = Vec<Vec<EnumCellValue>>;

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region InputData

/// Item columns in sheet order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumItemColumn {
    Name,
    Quantity,
    UnitPrice,
    Subtotal,
}

impl EnumItemColumn {
    pub const ALL: [EnumItemColumn; 4] = [
        EnumItemColumn::Name,
        EnumItemColumn::Quantity,
        EnumItemColumn::UnitPrice,
        EnumItemColumn::Subtotal,
    ];

    /// Offset from the first item column.
    pub fn offset(self) -> u32 {
        match self {
            EnumItemColumn::Name => 0,
            EnumItemColumn::Quantity => 1,
            EnumItemColumn::UnitPrice => 2,
            EnumItemColumn::Subtotal => 3,
        }
    }
}

impl fmt::Display for EnumItemColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let txt = match self {
            EnumItemColumn::Name => "name",
            EnumItemColumn::Quantity => "quantity",
            EnumItemColumn::UnitPrice => "unit_price",
            EnumItemColumn::Subtotal => "subtotal",
        };
        f.write_str(txt)
    }
}

/// One line item as read from the input form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecItemData {
    pub name: String,
    /// Non-negative quantity.
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Subtotal stored on the sheet; never trusted.
    pub claimed_subtotal: Option<Decimal>,
}

impl SpecItemData {
    pub fn new(name: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit_price,
            claimed_subtotal: None,
        }
    }

    /// Recomputed `quantity * unit_price`.
    pub fn subtotal(&self) -> Decimal {
        self.quantity * self.unit_price
    }
}

/// Totals as claimed by the input form. Blank cells are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpecClaimedTotals {
    pub total_amount: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub grand_total: Option<Decimal>,
}

/// Normalized request record extracted from the input form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecInputData {
    pub document_type: EnumDocumentType,
    pub issue_date: NaiveDate,
    pub company_name: String,
    pub contact_name: String,
    pub address: String,
    /// Syntactically valid address, or `None` when the cell is blank.
    pub email: Option<String>,
    pub remarks: String,
    /// Items in sheet order.
    pub items: Vec<SpecItemData>,
    pub claimed: SpecClaimedTotals,
}

impl SpecInputData {
    /// Copy whose claimed values are the reconciled ones.
    ///
    /// Reconciling the projection again yields the same totals and no
    /// mismatch.
    pub fn reconciled_projection(&self, reconciliation: &SpecReconciliation) -> Self {
        let mut projection = self.clone();
        for item in &mut projection.items {
            item.claimed_subtotal = Some(item.subtotal());
        }
        projection.claimed = SpecClaimedTotals {
            total_amount: Some(reconciliation.totals.subtotal),
            tax: Some(reconciliation.totals.tax),
            grand_total: Some(reconciliation.totals.grand_total),
        };
        projection
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Outcomes

/// Authoritative totals computed from the items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpecTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub grand_total: Decimal,
}

/// Non-fatal conditions carried in outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumWarning {
    /// A claimed total differs from the recomputed one beyond tolerance.
    TotalsMismatch {
        field: EnumField,
        claimed: Decimal,
        computed: Decimal,
    },
    /// A stored item subtotal differs from `quantity * unit_price`.
    ItemSubtotalMismatch {
        idx_item: usize,
        name: String,
        claimed: Decimal,
        computed: Decimal,
    },
    /// More items than template rows; only the first `max_rows` were written
    /// and the rendered totals leave out `amount_dropped`.
    ItemOverflow {
        items_total: usize,
        max_rows: usize,
        amount_dropped: Decimal,
    },
}

impl EnumWarning {
    pub fn is_mismatch(&self) -> bool {
        matches!(
            self,
            EnumWarning::TotalsMismatch { .. } | EnumWarning::ItemSubtotalMismatch { .. }
        )
    }
}

impl fmt::Display for EnumWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumWarning::TotalsMismatch {
                field,
                claimed,
                computed,
            } => write!(
                f,
                "claimed {field} {claimed} differs from computed {computed}"
            ),
            EnumWarning::ItemSubtotalMismatch {
                idx_item,
                name,
                claimed,
                computed,
            } => write!(
                f,
                "item #{} `{name}` claims subtotal {claimed}, computed {computed}",
                idx_item + 1
            ),
            EnumWarning::ItemOverflow {
                items_total,
                max_rows,
                amount_dropped,
            } => write!(
                f,
                "{items_total} items exceed the {max_rows} template rows; \
                 extra items worth {amount_dropped} dropped"
            ),
        }
    }
}

/// Result of reconciling one request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecReconciliation {
    pub totals: SpecTotals,
    /// Recomputed subtotal per item, in item order.
    pub item_subtotals: Vec<Decimal>,
    /// Mismatch warnings only.
    pub warnings: Vec<EnumWarning>,
}

impl SpecReconciliation {
    pub fn has_mismatch(&self) -> bool {
        self.warnings.iter().any(EnumWarning::is_mismatch)
    }
}

/// Opaque reference to a document owned by a [`crate::DocumentStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecDocumentHandle(String);

impl SpecDocumentHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpecDocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structural summary of one render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpecRenderOutcome {
    /// Item rows populated on the template.
    pub rows_written: usize,
    /// Items present in the input.
    pub items_total: usize,
    pub overflowed: bool,
    pub totals_mismatch: bool,
}

impl SpecRenderOutcome {
    /// Whether any warning-level condition was raised.
    pub fn is_flagged(&self) -> bool {
        self.overflowed || self.totals_mismatch
    }
}

/// Rendered document still held by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRendered {
    pub handle: SpecDocumentHandle,
    pub outcome: SpecRenderOutcome,
    /// Totals written on the document, over the rendered rows only.
    pub totals: SpecTotals,
    pub warnings: Vec<EnumWarning>,
}

/// One appended history row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecHistoryEntry {
    pub timestamp: NaiveDateTime,
    /// Values in history header order.
    pub values: Vec<String>,
}

/// Composed outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecNotification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    /// Location reference of the rendered document to attach.
    pub attachment_ref: String,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Cell content that cannot be read as the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellCoerceError {
    #[error("`{0}` is not a number")]
    NotANumber(String),
    #[error("`{0}` is not a date")]
    NotADate(String),
}

/// Request-fatal extraction failures.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("required field `{field}` at {coordinate} is empty")]
    MissingRequiredField {
        field: EnumField,
        coordinate: SpecCellCoordinate,
    },
    #[error("field `{field}` at {coordinate} is invalid: {message}")]
    InvalidField {
        field: EnumField,
        coordinate: SpecCellCoordinate,
        message: String,
    },
    #[error("item row {sheet_row}, column {column} ({coordinate}): {message}")]
    InvalidItemRow {
        /// One-based sheet row.
        sheet_row: u32,
        column: EnumItemColumn,
        coordinate: SpecCellCoordinate,
        message: String,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Rendering failures. Any copy made before the failure is discarded.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{items_total} items exceed the {max_rows} template rows")]
    ItemOverflow { items_total: usize, max_rows: usize },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to append history row: {0}")]
    Store(#[from] StoreError),
}

/// Outbound notification failure, reported by [`crate::Notifier`] adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("invalid recipient `{0}`")]
    InvalidRecipient(String),
    #[error("attachment {location} unavailable: {message}")]
    Attachment { location: String, message: String },
    #[error("transport failed: {0}")]
    Transport(String),
}

/// Pipeline failure. Non-fatal conditions never surface here.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("failed to persist document into `{folder}`: {source}")]
    Persist {
        folder: String,
        #[source]
        source: StoreError,
    },
    #[error("document `{document_name}` was saved but not recorded: {source}")]
    Record {
        document_name: String,
        #[source]
        source: RecordError,
    },
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
