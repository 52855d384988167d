//! Immutable, validated schema registry.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::address::{SpecCellCoordinate, SpecCellRange};
use crate::conf::{N_ITEM_COLUMNS, N_NCOLS_SHEET_MAX, N_NROWS_SHEET_MAX};
use crate::spec::{
    ConfigurationError, EnumDocumentType, EnumField, EnumItemRange, EnumLayout, EnumSheetRole,
    SpecDispatchPolicy, SpecDocumentLabels, SpecEmailIdentity, SpecFieldMap, SpecHistoryHeader,
    SpecItemWindow, SpecSchemaRaw, SpecSheetsRaw, SpecTaxPolicy,
};
use crate::util::{
    derive_field_map, derive_history_headers, derive_tax_policy, parse_coordinate, parse_range,
    validate_folder_name, validate_non_empty, validate_sheet_name,
};

/// Every field the input form must declare.
const FIELDS_REQUIRED_INPUT: [EnumField; 10] = EnumField::ALL;

/// Fields the template must declare; `email` stays optional.
const FIELDS_REQUIRED_TEMPLATE: [EnumField; 9] = [
    EnumField::DocumentType,
    EnumField::IssueDate,
    EnumField::CompanyName,
    EnumField::ContactName,
    EnumField::Address,
    EnumField::Remarks,
    EnumField::TotalAmount,
    EnumField::Tax,
    EnumField::GrandTotal,
];

/// Validated description of both layouts, destinations and policies.
///
/// Built once through [`SchemaRegistry::from_raw`] (or the YAML helpers) and
/// then only read. Share it by reference or `Arc`; it exposes no mutation.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    sheet_input: String,
    sheet_template: String,
    sheet_history: Option<String>,
    field_map_input: SpecFieldMap,
    field_map_template: SpecFieldMap,
    range_items_input: SpecCellRange,
    window_items_template: SpecItemWindow,
    dict_folders: BTreeMap<EnumDocumentType, String>,
    folder_backup: String,
    email_identity: SpecEmailIdentity,
    l_history_headers: Vec<SpecHistoryHeader>,
    labels: SpecDocumentLabels,
    tax_policy: SpecTaxPolicy,
    dispatch_policy: SpecDispatchPolicy,
}

impl SchemaRegistry {
    /// Validate `raw` and build the registry.
    pub fn from_raw(raw: &SpecSchemaRaw) -> Result<Self, ConfigurationError> {
        validate_sheet_names(&raw.sheets)?;

        let range_items_input = parse_range("ranges.items", &raw.ranges.items)?;
        if range_items_input.n_cols() != N_ITEM_COLUMNS {
            return Err(ConfigurationError::malformed(
                "ranges.items",
                format!(
                    "item range {range_items_input} must span exactly {N_ITEM_COLUMNS} columns"
                ),
            ));
        }
        let window_items_template = derive_item_window(raw)?;

        let field_map_input = derive_field_map(
            EnumLayout::Input,
            "cells",
            &raw.cells,
            &FIELDS_REQUIRED_INPUT,
            range_items_input,
        )?;
        let field_map_template = derive_field_map(
            EnumLayout::Template,
            "template_cells",
            &raw.template_cells,
            &FIELDS_REQUIRED_TEMPLATE,
            window_items_template.area(),
        )?;

        validate_folder_name("folders.estimates", &raw.folders.estimates)?;
        validate_folder_name("folders.invoices", &raw.folders.invoices)?;
        validate_folder_name("folders.backup", &raw.folders.backup)?;
        if raw.folders.backup == raw.folders.estimates || raw.folders.backup == raw.folders.invoices
        {
            return Err(ConfigurationError::malformed(
                "folders.backup",
                "backup folder must differ from the document folders",
            ));
        }
        let dict_folders = BTreeMap::from([
            (EnumDocumentType::Estimate, raw.folders.estimates.clone()),
            (EnumDocumentType::Invoice, raw.folders.invoices.clone()),
        ]);

        validate_non_empty("email.sender_company", &raw.email.sender_company)?;
        validate_non_empty("email.sender_name", &raw.email.sender_name)?;

        validate_labels(&raw.labels)?;
        let l_history_headers = derive_history_headers(&raw.history_headers)?;
        let tax_policy = derive_tax_policy(&raw.tax)?;

        tracing::debug!(
            input_fields = field_map_input.len(),
            template_fields = field_map_template.len(),
            input_items = %range_items_input,
            template_items = %window_items_template.area(),
            "schema registry validated"
        );

        Ok(Self {
            sheet_input: raw.sheets.input.clone(),
            sheet_template: raw.sheets.template.clone(),
            sheet_history: raw.sheets.history.clone(),
            field_map_input,
            field_map_template,
            range_items_input,
            window_items_template,
            dict_folders,
            folder_backup: raw.folders.backup.clone(),
            email_identity: raw.email.clone(),
            l_history_headers,
            labels: raw.labels.clone(),
            tax_policy,
            dispatch_policy: raw.dispatch,
        })
    }

    /// Parse a YAML schema document and validate it.
    pub fn from_yaml_str(txt: &str) -> Result<Self, ConfigurationError> {
        let raw: SpecSchemaRaw = serde_yaml::from_str(txt)?;
        Self::from_raw(&raw)
    }

    /// Read a YAML schema document from disk and validate it.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let txt = fs::read_to_string(path).map_err(|e| ConfigurationError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_yaml_str(&txt)
    }

    /// Coordinate of `field` in `layout`, or `None` when that layout does not
    /// carry the field.
    pub fn field_coordinate(&self, layout: EnumLayout, field: EnumField) -> Option<SpecCellCoordinate> {
        self.field_map(layout).get(field)
    }

    pub fn field_map(&self, layout: EnumLayout) -> &SpecFieldMap {
        match layout {
            EnumLayout::Input => &self.field_map_input,
            EnumLayout::Template => &self.field_map_template,
        }
    }

    pub fn item_range(&self, layout: EnumLayout) -> EnumItemRange {
        match layout {
            EnumLayout::Input => EnumItemRange::Input(self.range_items_input),
            EnumLayout::Template => EnumItemRange::Template(self.window_items_template),
        }
    }

    pub fn input_item_range(&self) -> SpecCellRange {
        self.range_items_input
    }

    pub fn template_item_window(&self) -> SpecItemWindow {
        self.window_items_template
    }

    pub fn folder(&self, document_type: EnumDocumentType) -> &str {
        // Both keys are inserted in `from_raw`.
        self.dict_folders
            .get(&document_type)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn backup_folder(&self) -> &str {
        &self.folder_backup
    }

    pub fn history_headers(&self) -> &[SpecHistoryHeader] {
        &self.l_history_headers
    }

    /// Header labels in column order.
    pub fn history_labels(&self) -> Vec<String> {
        self.l_history_headers
            .iter()
            .map(|h| h.label.clone())
            .collect()
    }

    /// Physical sheet for `role`; `None` only for an unconfigured history role.
    pub fn sheet_name(&self, role: EnumSheetRole) -> Option<&str> {
        match role {
            EnumSheetRole::Input => Some(&self.sheet_input),
            EnumSheetRole::Template => Some(&self.sheet_template),
            EnumSheetRole::History => self.sheet_history.as_deref(),
        }
    }

    pub fn input_sheet(&self) -> &str {
        &self.sheet_input
    }

    pub fn template_sheet(&self) -> &str {
        &self.sheet_template
    }

    pub fn document_label(&self, document_type: EnumDocumentType) -> &str {
        self.labels.get(document_type)
    }

    /// Resolve a document type from its label or canonical English name.
    pub fn parse_document_type(&self, value: &str) -> Option<EnumDocumentType> {
        let value = value.trim();
        EnumDocumentType::ALL.into_iter().find(|t| {
            self.labels.get(*t) == value || t.key().eq_ignore_ascii_case(value)
        })
    }

    pub fn email_identity(&self) -> &SpecEmailIdentity {
        &self.email_identity
    }

    pub fn tax_policy(&self) -> &SpecTaxPolicy {
        &self.tax_policy
    }

    pub fn dispatch_policy(&self) -> &SpecDispatchPolicy {
        &self.dispatch_policy
    }
}

fn validate_sheet_names(sheets: &SpecSheetsRaw) -> Result<(), ConfigurationError> {
    let l_sheets = [
        ("sheets.input", Some(&sheets.input)),
        ("sheets.template", Some(&sheets.template)),
        ("sheets.history", sheets.history.as_ref()),
    ];

    let mut l_seen: Vec<&String> = Vec::new();
    for (key, name) in l_sheets {
        let Some(name) = name else {
            continue;
        };
        validate_sheet_name(key, name)?;
        if l_seen.contains(&name) {
            return Err(ConfigurationError::malformed(
                key,
                format!("sheet name `{name}` is used by another role"),
            ));
        }
        l_seen.push(name);
    }
    Ok(())
}

fn derive_item_window(raw: &SpecSchemaRaw) -> Result<SpecItemWindow, ConfigurationError> {
    let cfg_ranges = &raw.template_ranges;
    if cfg_ranges.items_max_rows == 0 {
        return Err(ConfigurationError::malformed(
            "template_ranges.items_max_rows",
            "must be >= 1",
        ));
    }

    let c_col = cfg_ranges.items_start_column.as_deref().unwrap_or("A").trim();
    let start = parse_coordinate(
        "template_ranges.items_start_row",
        &format!("{c_col}{}", cfg_ranges.items_start_row),
    )?;

    let b_fits_rows = start
        .row
        .checked_add(cfg_ranges.items_max_rows)
        .is_some_and(|n| n <= N_NROWS_SHEET_MAX);
    let b_fits_cols = start.col + N_ITEM_COLUMNS <= N_NCOLS_SHEET_MAX;
    if !b_fits_rows || !b_fits_cols {
        return Err(ConfigurationError::malformed(
            "template_ranges",
            "item window extends past the sheet boundary",
        ));
    }

    Ok(SpecItemWindow {
        start,
        max_rows: cfg_ranges.items_max_rows,
    })
}

fn validate_labels(labels: &SpecDocumentLabels) -> Result<(), ConfigurationError> {
    validate_non_empty("labels.estimate", &labels.estimate)?;
    validate_non_empty("labels.invoice", &labels.invoice)?;
    let b_clash = labels.estimate.trim() == labels.invoice.trim()
        || labels.estimate.trim().eq_ignore_ascii_case(EnumDocumentType::Invoice.key())
        || labels.invoice.trim().eq_ignore_ascii_case(EnumDocumentType::Estimate.key());
    if b_clash {
        return Err(ConfigurationError::malformed(
            "labels",
            "document labels must identify exactly one document type",
        ));
    }
    Ok(())
}
