//! Template rendering with a fixed-capacity item window.

use quotekit_schema::{
    EnumField, EnumLayout, EnumOverflowPolicy, EnumSheetRole, SchemaRegistry, SpecCellCoordinate,
};

use crate::conf::FMT_NAME_DATE;
use crate::reconcile::derive_totals;
use crate::spec::{
    EnumCellValue, EnumItemColumn, EnumWarning, RenderError, SpecInputData, SpecReconciliation,
    SpecRenderOutcome, SpecRendered, SpecTotals,
};
use crate::store::{CellStore, DocumentStore, StoreError};

/// Suggested document name: `<label>_<company>_<yyyymmdd>`.
pub fn derive_document_name_hint(registry: &SchemaRegistry, input: &SpecInputData) -> String {
    let label = registry.document_label(input.document_type);
    let c_date = input.issue_date.format(FMT_NAME_DATE);
    if input.company_name.is_empty() {
        format!("{label}_{c_date}")
    } else {
        format!("{label}_{}_{c_date}", input.company_name)
    }
}

/// Copy the template and write `input` into it.
///
/// Under the strict overflow policy an oversized item list fails before any
/// copy is made. Under truncation the written totals cover the rendered rows
/// only, and the overflow warning carries the amount left out. Every later
/// failure discards the copy before returning.
pub fn render<D: DocumentStore + ?Sized>(
    registry: &SchemaRegistry,
    documents: &mut D,
    input: &SpecInputData,
    reconciliation: &SpecReconciliation,
) -> Result<SpecRendered, RenderError> {
    let window = registry.template_item_window();
    let n_items = input.items.len();
    let n_capacity = window.capacity();
    let if_overflow = n_items > n_capacity;

    if if_overflow && registry.dispatch_policy().on_item_overflow == EnumOverflowPolicy::Strict {
        return Err(RenderError::ItemOverflow {
            items_total: n_items,
            max_rows: n_capacity,
        });
    }

    let l_items_written = &input.items[..n_items.min(n_capacity)];
    let totals = if if_overflow {
        derive_totals(l_items_written, registry.tax_policy())
    } else {
        reconciliation.totals
    };

    let handle = documents.copy_template(
        input.document_type,
        &derive_document_name_hint(registry, input),
    )?;

    let result_write = documents
        .cells_mut(&handle)
        .and_then(|cells| write_document(registry, cells, input, &totals));
    let n_rows_written = match result_write {
        Ok(n) => n,
        Err(e) => {
            if let Err(e_discard) = documents.discard(&handle) {
                tracing::warn!(%handle, error = %e_discard, "failed to discard partial copy");
            }
            return Err(e.into());
        }
    };

    let mut l_warnings = reconciliation.warnings.clone();
    if if_overflow {
        let warning = EnumWarning::ItemOverflow {
            items_total: n_items,
            max_rows: n_capacity,
            amount_dropped: reconciliation.totals.subtotal - totals.subtotal,
        };
        tracing::warn!(%warning, "item list truncated");
        l_warnings.push(warning);
    }

    let outcome = SpecRenderOutcome {
        rows_written: n_rows_written,
        items_total: n_items,
        overflowed: if_overflow,
        totals_mismatch: reconciliation.has_mismatch(),
    };
    tracing::debug!(
        %handle,
        rows_written = outcome.rows_written,
        items_total = outcome.items_total,
        "template rendered"
    );

    Ok(SpecRendered {
        handle,
        outcome,
        totals,
        warnings: l_warnings,
    })
}

/// Write fixed fields, the item window and totals; return populated rows.
fn write_document<C: CellStore + ?Sized>(
    registry: &SchemaRegistry,
    cells: &mut C,
    input: &SpecInputData,
    totals: &SpecTotals,
) -> Result<usize, StoreError> {
    for (field, coord) in registry.field_map(EnumLayout::Template).iter() {
        let value: EnumCellValue = match field {
            EnumField::DocumentType => registry.document_label(input.document_type).into(),
            EnumField::IssueDate => input.issue_date.into(),
            EnumField::CompanyName => input.company_name.as_str().into(),
            EnumField::ContactName => input.contact_name.as_str().into(),
            EnumField::Address => input.address.as_str().into(),
            EnumField::Email => input
                .email
                .as_deref()
                .map(EnumCellValue::from)
                .unwrap_or_default(),
            EnumField::Remarks => input.remarks.as_str().into(),
            EnumField::TotalAmount => totals.subtotal.into(),
            EnumField::Tax => totals.tax.into(),
            EnumField::GrandTotal => totals.grand_total.into(),
        };
        cells.write_cell(EnumSheetRole::Template, coord, value)?;
    }

    let window = registry.template_item_window();
    let mut n_rows_written = 0usize;
    for idx in 0..window.capacity() {
        let Some(coord_row) = window.row(idx) else {
            break;
        };
        let l_values: [EnumCellValue; 4] = match input.items.get(idx) {
            Some(item) => {
                n_rows_written += 1;
                [
                    item.name.as_str().into(),
                    item.quantity.into(),
                    item.unit_price.into(),
                    item.subtotal().into(),
                ]
            }
            None => Default::default(),
        };
        for (column, value) in EnumItemColumn::ALL.into_iter().zip(l_values) {
            let coord = SpecCellCoordinate::new(coord_row.row, coord_row.col + column.offset());
            cells.write_cell(EnumSheetRole::Template, coord, value)?;
        }
    }

    Ok(n_rows_written)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use quotekit_schema::{
        EnumDocumentType, EnumOverflowPolicy, EnumSheetRole, SchemaRegistry, SpecCellCoordinate,
        derive_default_schema_raw,
    };
    use rust_decimal::Decimal;

    use super::{derive_document_name_hint, render};
    use crate::memory::MemoryDocumentStore;
    use crate::reconcile::reconcile;
    use crate::spec::{
        EnumCellValue, EnumWarning, RenderError, SpecClaimedTotals, SpecInputData, SpecItemData,
    };

    fn registry(max_rows: u32, policy: EnumOverflowPolicy) -> SchemaRegistry {
        let mut raw = derive_default_schema_raw();
        raw.tax.rate = Some(Decimal::new(10, 2));
        raw.template_ranges.items_max_rows = max_rows;
        raw.dispatch.on_item_overflow = policy;
        SchemaRegistry::from_raw(&raw).unwrap()
    }

    fn input(n_items: usize) -> SpecInputData {
        SpecInputData {
            document_type: EnumDocumentType::Invoice,
            issue_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            company_name: "ACME Corp".to_string(),
            contact_name: "Hanako Sato".to_string(),
            address: "1-2-3 Chiyoda".to_string(),
            email: Some("hanako@acme.example".to_string()),
            remarks: "Net 30".to_string(),
            items: (0..n_items)
                .map(|n| {
                    SpecItemData::new(format!("item-{n}"), Decimal::ONE, Decimal::new(100, 0))
                })
                .collect(),
            claimed: SpecClaimedTotals::default(),
        }
    }

    fn cell(store: &MemoryDocumentStore, a1: &str) -> Option<EnumCellValue> {
        store.only_document_cells().and_then(|cells| {
            cells.written(EnumSheetRole::Template, SpecCellCoordinate::from_a1(a1).unwrap())
        })
    }

    #[test]
    fn writes_fields_items_and_reconciled_totals() {
        let registry = registry(5, EnumOverflowPolicy::Truncate);
        let mut data = input(2);
        data.claimed.grand_total = Some(Decimal::new(1, 0));
        let reconciliation = reconcile(&data, registry.tax_policy());
        let mut store = MemoryDocumentStore::new();

        let rendered = render(&registry, &mut store, &data, &reconciliation).unwrap();
        assert_eq!(rendered.outcome.rows_written, 2);
        assert!(!rendered.outcome.overflowed);
        assert!(rendered.outcome.totals_mismatch);
        assert_eq!(rendered.warnings.len(), 1);

        assert_eq!(cell(&store, "A1"), Some("請求書".into()));
        assert_eq!(
            cell(&store, "F2"),
            Some(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap().into())
        );
        assert_eq!(cell(&store, "A20"), Some("Net 30".into()));
        assert_eq!(cell(&store, "A11"), Some("item-1".into()));
        assert_eq!(cell(&store, "D11"), Some(Decimal::new(100, 0).into()));
        assert_eq!(cell(&store, "A12"), Some(EnumCellValue::Empty));
        assert_eq!(cell(&store, "D14"), Some(EnumCellValue::Empty));
        assert_eq!(cell(&store, "A15"), None);
        assert_eq!(cell(&store, "F15"), Some(Decimal::new(200, 0).into()));
        assert_eq!(cell(&store, "F16"), Some(Decimal::new(20, 0).into()));
        assert_eq!(cell(&store, "F17"), Some(Decimal::new(220, 0).into()));
        // The default template has no email cell.
        assert!(
            store
                .only_document_cells()
                .unwrap()
                .written_values(EnumSheetRole::Template)
                .all(|v| v != &EnumCellValue::from("hanako@acme.example"))
        );
        assert_eq!(
            store.name_hint_of(&rendered.handle).as_deref(),
            Some("請求書_ACME Corp_20240401")
        );
    }

    #[test]
    fn truncates_and_flags_overflow_by_default() {
        let registry = registry(5, EnumOverflowPolicy::Truncate);
        let data = input(7);
        let reconciliation = reconcile(&data, registry.tax_policy());
        let mut store = MemoryDocumentStore::new();

        let rendered = render(&registry, &mut store, &data, &reconciliation).unwrap();
        assert_eq!(rendered.outcome.rows_written, 5);
        assert_eq!(rendered.outcome.items_total, 7);
        assert!(rendered.outcome.overflowed);
        assert!(rendered.outcome.is_flagged());
        assert!(rendered.warnings.contains(&EnumWarning::ItemOverflow {
            items_total: 7,
            max_rows: 5,
            amount_dropped: Decimal::new(200, 0),
        }));
        assert_eq!(cell(&store, "A14"), Some("item-4".into()));
        assert_eq!(cell(&store, "A15"), None);
    }

    #[test]
    fn truncated_totals_match_the_rendered_rows() {
        let registry = registry(5, EnumOverflowPolicy::Truncate);
        let data = input(7);
        let reconciliation = reconcile(&data, registry.tax_policy());
        let mut store = MemoryDocumentStore::new();

        let rendered = render(&registry, &mut store, &data, &reconciliation).unwrap();
        let n_visible_sum: Decimal = (10..15)
            .map(|row| match cell(&store, &format!("D{row}")) {
                Some(EnumCellValue::Number(value)) => value,
                other => panic!("unexpected subtotal cell {other:?}"),
            })
            .sum();
        assert_eq!(n_visible_sum, Decimal::new(500, 0));
        assert_eq!(cell(&store, "F15"), Some(n_visible_sum.into()));
        assert_eq!(cell(&store, "F16"), Some(Decimal::new(50, 0).into()));
        assert_eq!(cell(&store, "F17"), Some(Decimal::new(550, 0).into()));
        assert_eq!(rendered.totals.grand_total, Decimal::new(550, 0));
        assert_eq!(reconciliation.totals.subtotal, Decimal::new(700, 0));
    }

    #[test]
    fn strict_overflow_fails_before_copy() {
        let registry = registry(5, EnumOverflowPolicy::Strict);
        let data = input(6);
        let reconciliation = reconcile(&data, registry.tax_policy());
        let mut store = MemoryDocumentStore::new();

        let err = render(&registry, &mut store, &data, &reconciliation).unwrap_err();
        assert!(matches!(
            err,
            RenderError::ItemOverflow {
                items_total: 6,
                max_rows: 5
            }
        ));
        assert_eq!(store.n_copies(), 0);
    }

    #[test]
    fn write_failure_discards_the_copy() {
        let registry = registry(5, EnumOverflowPolicy::Truncate);
        let data = input(1);
        let reconciliation = reconcile(&data, registry.tax_policy());
        let mut store = MemoryDocumentStore::new();
        store.fail_writes_at(SpecCellCoordinate::from_a1("C12").unwrap());

        let err = render(&registry, &mut store, &data, &reconciliation).unwrap_err();
        assert!(matches!(err, RenderError::Store(_)));
        assert_eq!(store.n_copies(), 1);
        assert_eq!(store.discarded().len(), 1);
        assert!(store.only_document_cells().is_none());
    }

    #[test]
    fn name_hint_without_company() {
        let registry = registry(5, EnumOverflowPolicy::Truncate);
        let mut data = input(0);
        data.document_type = EnumDocumentType::Estimate;
        data.company_name.clear();
        assert_eq!(derive_document_name_hint(&registry, &data), "見積書_20240401");
    }

    proptest! {
        #[test]
        fn item_window_never_exceeds_capacity(max_rows in 1u32..=10, n_items in 0usize..15) {
            let registry = registry(max_rows, EnumOverflowPolicy::Truncate);
            let data = input(n_items);
            let reconciliation = reconcile(&data, registry.tax_policy());
            let mut store = MemoryDocumentStore::new();

            let rendered = render(&registry, &mut store, &data, &reconciliation).unwrap();
            let n_expected = n_items.min(max_rows as usize);
            prop_assert_eq!(rendered.outcome.rows_written, n_expected);
            prop_assert_eq!(rendered.outcome.overflowed, n_items > max_rows as usize);

            let cells = store.only_document_cells().unwrap();
            for idx in 0..max_rows {
                let coord = SpecCellCoordinate::new(9 + idx, 0);
                let value = cells.written(EnumSheetRole::Template, coord);
                if (idx as usize) < n_expected {
                    prop_assert_eq!(value, Some(EnumCellValue::from(format!("item-{idx}"))));
                } else {
                    prop_assert_eq!(value, Some(EnumCellValue::Empty));
                }
            }
            let below = SpecCellCoordinate::new(9 + max_rows, 0);
            prop_assert_eq!(cells.written(EnumSheetRole::Template, below), None);
        }
    }
}
