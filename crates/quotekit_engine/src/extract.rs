//! Input form extraction into a normalized [`SpecInputData`].

use quotekit_schema::{EnumField, EnumLayout, EnumSheetRole, SchemaRegistry, SpecCellCoordinate};
use rust_decimal::Decimal;

use crate::spec::{
    EnumCellValue, EnumItemColumn, ExtractError, SpecClaimedTotals, SpecInputData, SpecItemData,
};
use crate::store::CellStore;
use crate::util::{coerce_date, coerce_decimal, is_valid_email};

/// Read and validate the input form.
///
/// Items are read top to bottom and stop at the first row whose name cell is
/// blank. Claimed totals are carried through unverified.
pub fn extract<C: CellStore + ?Sized>(
    registry: &SchemaRegistry,
    cells: &C,
) -> Result<SpecInputData, ExtractError> {
    let reader = FieldReader { registry, cells };

    let (coord_type, value_type) = reader.read(EnumField::DocumentType)?;
    if value_type.is_empty() {
        return Err(ExtractError::MissingRequiredField {
            field: EnumField::DocumentType,
            coordinate: coord_type,
        });
    }
    let document_type = registry
        .parse_document_type(&value_type.to_text())
        .ok_or_else(|| ExtractError::InvalidField {
            field: EnumField::DocumentType,
            coordinate: coord_type,
            message: format!("unknown document type `{}`", value_type.to_text()),
        })?;

    let (coord_date, value_date) = reader.read(EnumField::IssueDate)?;
    let issue_date = match coerce_date(&value_date) {
        Ok(Some(d)) => d,
        Ok(None) => {
            return Err(ExtractError::MissingRequiredField {
                field: EnumField::IssueDate,
                coordinate: coord_date,
            });
        }
        Err(e) => {
            return Err(ExtractError::InvalidField {
                field: EnumField::IssueDate,
                coordinate: coord_date,
                message: e.to_string(),
            });
        }
    };

    let (coord_email, value_email) = reader.read(EnumField::Email)?;
    let email = match value_email.to_text() {
        s if s.is_empty() => None,
        s if is_valid_email(&s) => Some(s),
        s => {
            return Err(ExtractError::InvalidField {
                field: EnumField::Email,
                coordinate: coord_email,
                message: format!("`{s}` is not a valid email address"),
            });
        }
    };

    let claimed = SpecClaimedTotals {
        total_amount: reader.read_amount(EnumField::TotalAmount)?,
        tax: reader.read_amount(EnumField::Tax)?,
        grand_total: reader.read_amount(EnumField::GrandTotal)?,
    };

    let input = SpecInputData {
        document_type,
        issue_date,
        company_name: reader.read_text(EnumField::CompanyName)?,
        contact_name: reader.read_text(EnumField::ContactName)?,
        address: reader.read_text(EnumField::Address)?,
        email,
        remarks: reader.read_text(EnumField::Remarks)?,
        items: extract_items(registry, cells)?,
        claimed,
    };

    tracing::debug!(
        document_type = %input.document_type,
        company = %input.company_name,
        items = input.items.len(),
        "input extracted"
    );
    Ok(input)
}

struct FieldReader<'a, C: ?Sized> {
    registry: &'a SchemaRegistry,
    cells: &'a C,
}

impl<C: CellStore + ?Sized> FieldReader<'_, C> {
    fn read(&self, field: EnumField) -> Result<(SpecCellCoordinate, EnumCellValue), ExtractError> {
        // The input layout carries every field once the registry is built.
        let coord = self
            .registry
            .field_coordinate(EnumLayout::Input, field)
            .ok_or_else(|| ExtractError::InvalidField {
                field,
                coordinate: SpecCellCoordinate::new(0, 0),
                message: "field is not mapped on the input form".to_string(),
            })?;
        let value = self.cells.read_cell(EnumSheetRole::Input, coord)?;
        Ok((coord, value))
    }

    fn read_text(&self, field: EnumField) -> Result<String, ExtractError> {
        Ok(self.read(field)?.1.to_text())
    }

    fn read_amount(&self, field: EnumField) -> Result<Option<Decimal>, ExtractError> {
        let (coord, value) = self.read(field)?;
        coerce_decimal(&value).map_err(|e| ExtractError::InvalidField {
            field,
            coordinate: coord,
            message: e.to_string(),
        })
    }
}

fn extract_items<C: CellStore + ?Sized>(
    registry: &SchemaRegistry,
    cells: &C,
) -> Result<Vec<SpecItemData>, ExtractError> {
    let range = registry.input_item_range();
    let grid = cells.read_range(EnumSheetRole::Input, range)?;

    let mut l_items = Vec::new();
    for (n_idx, l_row) in grid.iter().enumerate() {
        let n_row = range.start.row + n_idx as u32;
        let cell = |column: EnumItemColumn| {
            l_row
                .get(column.offset() as usize)
                .cloned()
                .unwrap_or_default()
        };

        let name = cell(EnumItemColumn::Name);
        if name.is_empty() {
            let n_ignored = grid[n_idx + 1..]
                .iter()
                .filter(|r| r.iter().any(|v| !v.is_empty()))
                .count();
            if n_ignored > 0 {
                tracing::warn!(
                    row = n_row + 1,
                    ignored_rows = n_ignored,
                    "item list ends at a blank name; rows below it are ignored"
                );
            }
            break;
        }

        let invalid = |column: EnumItemColumn, message: String| {
            let coordinate = SpecCellCoordinate::new(n_row, range.start.col + column.offset());
            ExtractError::InvalidItemRow {
                sheet_row: coordinate.row_number(),
                column,
                coordinate,
                message,
            }
        };
        let amount = |column: EnumItemColumn| -> Result<Option<Decimal>, ExtractError> {
            let value = cell(column);
            coerce_decimal(&value).map_err(|e| invalid(column, e.to_string()))
        };

        let quantity = amount(EnumItemColumn::Quantity)?
            .ok_or_else(|| invalid(EnumItemColumn::Quantity, "quantity is empty".to_string()))?;
        if quantity < Decimal::ZERO {
            return Err(invalid(
                EnumItemColumn::Quantity,
                format!("quantity {quantity} is negative"),
            ));
        }
        let unit_price = amount(EnumItemColumn::UnitPrice)?
            .ok_or_else(|| invalid(EnumItemColumn::UnitPrice, "unit price is empty".to_string()))?;

        l_items.push(SpecItemData {
            name: name.to_text(),
            quantity,
            unit_price,
            claimed_subtotal: amount(EnumItemColumn::Subtotal)?,
        });
    }
    Ok(l_items)
}
