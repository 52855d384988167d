//! Schema enums, raw configuration models, validated models and errors.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::{SpecCellCoordinate, SpecCellRange};
use crate::conf::N_ITEM_COLUMNS;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Logical sheet roles; physical names come from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumSheetRole {
    /// Hand-edited input form.
    Input,
    /// Document template (also the sheet inside a rendered copy).
    Template,
    /// Dispatch history log.
    History,
}

/// Which of the two spatial layouts a lookup addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EnumLayout {
    /// Input form layout.
    Input,
    /// Template layout.
    Template,
}

/// Logical single-cell fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumField {
    DocumentType,
    IssueDate,
    CompanyName,
    ContactName,
    Address,
    Email,
    Remarks,
    TotalAmount,
    Tax,
    GrandTotal,
}

impl EnumField {
    pub const ALL: [EnumField; 10] = [
        EnumField::DocumentType,
        EnumField::IssueDate,
        EnumField::CompanyName,
        EnumField::ContactName,
        EnumField::Address,
        EnumField::Email,
        EnumField::Remarks,
        EnumField::TotalAmount,
        EnumField::Tax,
        EnumField::GrandTotal,
    ];

    /// Configuration key of this field.
    pub fn key(self) -> &'static str {
        match self {
            EnumField::DocumentType => "document_type",
            EnumField::IssueDate => "issue_date",
            EnumField::CompanyName => "company_name",
            EnumField::ContactName => "contact_name",
            EnumField::Address => "address",
            EnumField::Email => "email",
            EnumField::Remarks => "remarks",
            EnumField::TotalAmount => "total_amount",
            EnumField::Tax => "tax",
            EnumField::GrandTotal => "grand_total",
        }
    }
}

impl fmt::Display for EnumField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl fmt::Display for EnumLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumLayout::Input => f.write_str("input"),
            EnumLayout::Template => f.write_str("template"),
        }
    }
}

/// Closed set of generated document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumDocumentType {
    Estimate,
    Invoice,
}

impl EnumDocumentType {
    pub const ALL: [EnumDocumentType; 2] = [EnumDocumentType::Estimate, EnumDocumentType::Invoice];

    /// Canonical English name, accepted as input alongside the label.
    pub fn key(self) -> &'static str {
        match self {
            EnumDocumentType::Estimate => "estimate",
            EnumDocumentType::Invoice => "invoice",
        }
    }
}

impl fmt::Display for EnumDocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Columns a history row can carry. Declaration order is the positional order
/// used for plain-label header lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumHistoryColumn {
    Timestamp,
    DocumentType,
    CompanyName,
    Email,
    DocumentName,
    DocumentLocation,
}

impl EnumHistoryColumn {
    pub const ALL: [EnumHistoryColumn; 6] = [
        EnumHistoryColumn::Timestamp,
        EnumHistoryColumn::DocumentType,
        EnumHistoryColumn::CompanyName,
        EnumHistoryColumn::Email,
        EnumHistoryColumn::DocumentName,
        EnumHistoryColumn::DocumentLocation,
    ];
}

/// Tax rounding rule applied at the configured currency scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumTaxRounding {
    /// Round half away from zero.
    #[default]
    HalfUp,
    /// Truncate toward zero.
    Down,
    /// Round away from zero.
    Up,
    /// Banker's rounding.
    HalfEven,
}

impl EnumTaxRounding {
    pub fn strategy(self) -> RoundingStrategy {
        match self {
            EnumTaxRounding::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            EnumTaxRounding::Down => RoundingStrategy::ToZero,
            EnumTaxRounding::Up => RoundingStrategy::AwayFromZero,
            EnumTaxRounding::HalfEven => RoundingStrategy::MidpointNearestEven,
        }
    }
}

/// What the renderer does with more items than template rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumOverflowPolicy {
    /// Keep the first `max_rows` items and flag the outcome.
    #[default]
    Truncate,
    /// Fail the request before the template is copied.
    Strict,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RawConfiguration

/// Physical sheet names per role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecSheetsRaw {
    pub input: String,
    pub template: String,
    /// Only needed by history logs kept inside a workbook.
    #[serde(default)]
    pub history: Option<String>,
}

/// Field -> A1 reference table as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpecFieldMapRaw {
    pub document_type: Option<String>,
    pub issue_date: Option<String>,
    pub company_name: Option<String>,
    pub contact_name: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub remarks: Option<String>,
    pub total_amount: Option<String>,
    pub tax: Option<String>,
    pub grand_total: Option<String>,
}

impl SpecFieldMapRaw {
    pub fn get(&self, field: EnumField) -> Option<&str> {
        let value = match field {
            EnumField::DocumentType => &self.document_type,
            EnumField::IssueDate => &self.issue_date,
            EnumField::CompanyName => &self.company_name,
            EnumField::ContactName => &self.contact_name,
            EnumField::Address => &self.address,
            EnumField::Email => &self.email,
            EnumField::Remarks => &self.remarks,
            EnumField::TotalAmount => &self.total_amount,
            EnumField::Tax => &self.tax,
            EnumField::GrandTotal => &self.grand_total,
        };
        value.as_deref()
    }
}

/// Input-side item range (`A10:D14`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecInputRangesRaw {
    pub items: String,
}

/// Template-side item window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecTemplateRangesRaw {
    /// One-based first item row.
    pub items_start_row: u32,
    /// Maximum number of item rows.
    pub items_max_rows: u32,
    /// First item column letter; `A` when omitted.
    #[serde(default)]
    pub items_start_column: Option<String>,
}

/// Destination folders per document type plus backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecFoldersRaw {
    pub estimates: String,
    pub invoices: String,
    pub backup: String,
}

/// Sender identity for outbound notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecEmailIdentity {
    pub sender_company: String,
    #[serde(default)]
    pub sender_department: String,
    pub sender_name: String,
}

/// Literal document labels, written into templates and accepted as input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecDocumentLabels {
    pub estimate: String,
    pub invoice: String,
}

impl SpecDocumentLabels {
    pub fn get(&self, document_type: EnumDocumentType) -> &str {
        match document_type {
            EnumDocumentType::Estimate => &self.estimate,
            EnumDocumentType::Invoice => &self.invoice,
        }
    }
}

/// One history header entry: a positional label or an explicit mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumHistoryHeaderRaw {
    Label(String),
    Column {
        column: EnumHistoryColumn,
        label: String,
    },
}

/// Tax settings; `rate` has no default and must be supplied.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpecTaxPolicyRaw {
    pub rate: Option<Decimal>,
    pub rounding: EnumTaxRounding,
    pub scale: Option<u32>,
    pub tolerance: Option<Decimal>,
}

/// Dispatch gating policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpecDispatchPolicy {
    /// Overflow handling in the renderer.
    pub on_item_overflow: EnumOverflowPolicy,
    /// Send notifications even when the outcome carries warnings.
    pub notify_flagged: bool,
    /// Copy each persisted document into the backup folder.
    pub keep_backup: bool,
}

/// Whole schema section as deserialized from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecSchemaRaw {
    pub sheets: SpecSheetsRaw,
    pub cells: SpecFieldMapRaw,
    pub ranges: SpecInputRangesRaw,
    pub template_cells: SpecFieldMapRaw,
    pub template_ranges: SpecTemplateRangesRaw,
    pub folders: SpecFoldersRaw,
    pub email: SpecEmailIdentity,
    pub history_headers: Vec<EnumHistoryHeaderRaw>,
    #[serde(default = "crate::conf::derive_default_document_labels")]
    pub labels: SpecDocumentLabels,
    #[serde(default)]
    pub tax: SpecTaxPolicyRaw,
    #[serde(default)]
    pub dispatch: SpecDispatchPolicy,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ValidatedModels

/// Validated field -> coordinate table for one layout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecFieldMap {
    pub(crate) dict_coords: BTreeMap<EnumField, SpecCellCoordinate>,
}

impl SpecFieldMap {
    pub fn get(&self, field: EnumField) -> Option<SpecCellCoordinate> {
        self.dict_coords.get(&field).copied()
    }

    /// Fields in declaration order with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (EnumField, SpecCellCoordinate)> + '_ {
        self.dict_coords.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.dict_coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict_coords.is_empty()
    }
}

/// Fixed-capacity window of template item rows addressed by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecItemWindow {
    /// Name cell of the first item row.
    pub start: SpecCellCoordinate,
    /// Row capacity, always >= 1.
    pub max_rows: u32,
}

impl SpecItemWindow {
    /// Name cell of row `idx`, or `None` outside the window.
    pub fn row(&self, idx: usize) -> Option<SpecCellCoordinate> {
        let n_idx = u32::try_from(idx).ok()?;
        if n_idx >= self.max_rows {
            return None;
        }
        self.start.offset_rows(n_idx)
    }

    /// Capacity as `usize` for slice arithmetic.
    pub fn capacity(&self) -> usize {
        self.max_rows as usize
    }

    /// Full rectangle covered by the window.
    pub fn area(&self) -> SpecCellRange {
        SpecCellRange::new(
            self.start,
            SpecCellCoordinate::new(
                self.start.row + self.max_rows - 1,
                self.start.col + N_ITEM_COLUMNS - 1,
            ),
        )
    }
}

/// Item region descriptor returned by [`crate::SchemaRegistry::item_range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumItemRange {
    /// Fixed rectangle on the input form.
    Input(SpecCellRange),
    /// Start row + capacity on the template.
    Template(SpecItemWindow),
}

/// One resolved history column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecHistoryHeader {
    pub column: EnumHistoryColumn,
    pub label: String,
}

/// Validated tax policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecTaxPolicy {
    /// Tax rate in `[0, 1]`.
    pub rate: Decimal,
    pub rounding: EnumTaxRounding,
    /// Currency decimal places kept after rounding.
    pub scale: u32,
    /// Largest claimed/computed difference not reported as a mismatch.
    pub tolerance: Decimal,
}

impl SpecTaxPolicy {
    /// Round an amount with the configured rule and scale.
    pub fn round(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.scale, self.rounding.strategy())
    }

    /// Whether `claimed` is within tolerance of `computed`.
    pub fn is_within_tolerance(&self, claimed: Decimal, computed: Decimal) -> bool {
        (claimed - computed).abs() <= self.tolerance
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Registry construction failure. Always fatal; raised before any request.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to read schema configuration {}: {message}", path.display())]
    Read { path: PathBuf, message: String },
    #[error("failed to parse schema configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("missing required configuration key `{0}`")]
    MissingKey(String),
    #[error("malformed configuration key `{key}`: {message}")]
    Malformed { key: String, message: String },
    #[error("fields `{first}` and `{second}` share cell {coordinate} in the {layout} layout")]
    DuplicateCoordinate {
        layout: EnumLayout,
        first: EnumField,
        second: EnumField,
        coordinate: SpecCellCoordinate,
    },
    #[error("field `{field}` at {coordinate} lies inside the {layout} item area {area}")]
    FieldInsideItemArea {
        layout: EnumLayout,
        field: EnumField,
        coordinate: SpecCellCoordinate,
        area: SpecCellRange,
    },
}

impl ConfigurationError {
    pub(crate) fn malformed(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed {
            key: key.into(),
            message: message.into(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{EnumTaxRounding, SpecItemWindow, SpecTaxPolicy};
    use crate::address::SpecCellCoordinate;

    fn policy(rounding: EnumTaxRounding) -> SpecTaxPolicy {
        SpecTaxPolicy {
            rate: Decimal::new(10, 2),
            rounding,
            scale: 0,
            tolerance: Decimal::ZERO,
        }
    }

    #[test]
    fn tax_rounding_modes_differ_on_midpoints() {
        let x = Decimal::new(2205, 1); // 220.5
        assert_eq!(policy(EnumTaxRounding::HalfUp).round(x), Decimal::new(221, 0));
        assert_eq!(policy(EnumTaxRounding::Down).round(x), Decimal::new(220, 0));
        assert_eq!(policy(EnumTaxRounding::Up).round(x), Decimal::new(221, 0));
        assert_eq!(
            policy(EnumTaxRounding::HalfEven).round(x),
            Decimal::new(220, 0)
        );
    }

    #[test]
    fn item_window_addresses_rows_by_index() {
        let window = SpecItemWindow {
            start: SpecCellCoordinate::from_a1("A10").unwrap(),
            max_rows: 5,
        };
        assert_eq!(window.row(0).unwrap().to_a1(), "A10");
        assert_eq!(window.row(4).unwrap().to_a1(), "A14");
        assert!(window.row(5).is_none());
        assert_eq!(window.area().to_string(), "A10:D14");
    }
}
