//! Validation helpers used while building the registry.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;

use crate::address::{SpecCellCoordinate, SpecCellRange};
use crate::conf::{N_CURRENCY_SCALE_MAX, N_LEN_SHEET_NAME_MAX, TUP_SHEET_NAME_ILLEGAL};
use crate::spec::{
    ConfigurationError, EnumField, EnumHistoryColumn, EnumHistoryHeaderRaw, EnumLayout,
    SpecFieldMap, SpecFieldMapRaw, SpecHistoryHeader, SpecTaxPolicy, SpecTaxPolicyRaw,
};

////////////////////////////////////////////////////////////////////////////////
// #region Names

pub(crate) fn validate_non_empty(key: &str, value: &str) -> Result<(), ConfigurationError> {
    if value.trim().is_empty() {
        return Err(ConfigurationError::MissingKey(key.to_string()));
    }
    Ok(())
}

pub(crate) fn validate_sheet_name(key: &str, name: &str) -> Result<(), ConfigurationError> {
    validate_non_empty(key, name)?;
    if name.chars().count() > N_LEN_SHEET_NAME_MAX {
        return Err(ConfigurationError::malformed(
            key,
            format!("sheet name longer than {N_LEN_SHEET_NAME_MAX} characters"),
        ));
    }
    if let Some(c) = name.chars().find(|c| TUP_SHEET_NAME_ILLEGAL.contains(c)) {
        return Err(ConfigurationError::malformed(
            key,
            format!("sheet name contains illegal character `{c}`"),
        ));
    }
    Ok(())
}

pub(crate) fn validate_folder_name(key: &str, name: &str) -> Result<(), ConfigurationError> {
    validate_non_empty(key, name)?;
    if name.contains('/') || name.contains('\\') {
        return Err(ConfigurationError::malformed(
            key,
            "folder name must not contain path separators",
        ));
    }
    if name.trim() == "." || name.trim() == ".." {
        return Err(ConfigurationError::malformed(
            key,
            "folder name must not be `.` or `..`",
        ));
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Layout

pub(crate) fn parse_coordinate(
    key: &str,
    value: &str,
) -> Result<SpecCellCoordinate, ConfigurationError> {
    SpecCellCoordinate::from_a1(value)
        .map_err(|e| ConfigurationError::malformed(key, format!("`{value}`: {e}")))
}

pub(crate) fn parse_range(key: &str, value: &str) -> Result<SpecCellRange, ConfigurationError> {
    SpecCellRange::from_a1(value)
        .map_err(|e| ConfigurationError::malformed(key, format!("`{value}`: {e}")))
}

/// Resolve one layout's field table.
///
/// Every field in `fields_required` must be present; all present fields must
/// be distinct and stay clear of `item_area`.
pub(crate) fn derive_field_map(
    layout: EnumLayout,
    section: &str,
    raw: &SpecFieldMapRaw,
    fields_required: &[EnumField],
    item_area: SpecCellRange,
) -> Result<SpecFieldMap, ConfigurationError> {
    let mut dict_coords = BTreeMap::new();
    let mut dict_seen: BTreeMap<SpecCellCoordinate, EnumField> = BTreeMap::new();

    for field in EnumField::ALL {
        let key = format!("{section}.{}", field.key());
        let Some(value) = raw.get(field) else {
            if fields_required.contains(&field) {
                return Err(ConfigurationError::MissingKey(key));
            }
            continue;
        };

        let coord = parse_coordinate(&key, value)?;
        if let Some(first) = dict_seen.insert(coord, field) {
            return Err(ConfigurationError::DuplicateCoordinate {
                layout,
                first,
                second: field,
                coordinate: coord,
            });
        }
        if item_area.contains(coord) {
            return Err(ConfigurationError::FieldInsideItemArea {
                layout,
                field,
                coordinate: coord,
                area: item_area,
            });
        }
        dict_coords.insert(field, coord);
    }

    Ok(SpecFieldMap { dict_coords })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region HistoryAndTax

pub(crate) fn derive_history_headers(
    l_raw: &[EnumHistoryHeaderRaw],
) -> Result<Vec<SpecHistoryHeader>, ConfigurationError> {
    const KEY: &str = "history_headers";
    if l_raw.is_empty() {
        return Err(ConfigurationError::MissingKey(KEY.to_string()));
    }
    if l_raw.len() > EnumHistoryColumn::ALL.len() {
        return Err(ConfigurationError::malformed(
            KEY,
            format!(
                "at most {} columns are supported, got {}",
                EnumHistoryColumn::ALL.len(),
                l_raw.len()
            ),
        ));
    }

    let mut l_headers = Vec::with_capacity(l_raw.len());
    let mut set_columns = BTreeSet::new();
    let mut set_labels = BTreeSet::new();
    for (n_idx, entry) in l_raw.iter().enumerate() {
        let (column, label) = match entry {
            EnumHistoryHeaderRaw::Label(label) => (EnumHistoryColumn::ALL[n_idx], label.clone()),
            EnumHistoryHeaderRaw::Column { column, label } => (*column, label.clone()),
        };
        validate_non_empty(&format!("{KEY}[{n_idx}]"), &label)?;
        if !set_columns.insert(column) {
            return Err(ConfigurationError::malformed(
                format!("{KEY}[{n_idx}]"),
                format!("column {column:?} listed twice"),
            ));
        }
        if !set_labels.insert(label.clone()) {
            return Err(ConfigurationError::malformed(
                format!("{KEY}[{n_idx}]"),
                format!("label `{label}` listed twice"),
            ));
        }
        l_headers.push(SpecHistoryHeader { column, label });
    }
    Ok(l_headers)
}

pub(crate) fn derive_tax_policy(raw: &SpecTaxPolicyRaw) -> Result<SpecTaxPolicy, ConfigurationError> {
    let rate = raw
        .rate
        .ok_or_else(|| ConfigurationError::MissingKey("tax.rate".to_string()))?;
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(ConfigurationError::malformed(
            "tax.rate",
            format!("{rate} is outside [0, 1]"),
        ));
    }

    let scale = raw.scale.unwrap_or(0);
    if scale > N_CURRENCY_SCALE_MAX {
        return Err(ConfigurationError::malformed(
            "tax.scale",
            format!("{scale} exceeds {N_CURRENCY_SCALE_MAX}"),
        ));
    }

    let tolerance = raw.tolerance.unwrap_or(Decimal::ZERO);
    if tolerance < Decimal::ZERO {
        return Err(ConfigurationError::malformed(
            "tax.tolerance",
            "tolerance must not be negative",
        ));
    }

    Ok(SpecTaxPolicy {
        rate,
        rounding: raw.rounding,
        scale,
        tolerance,
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
