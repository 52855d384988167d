//! Totals recomputation and claimed-value cross-checks.

use quotekit_schema::{EnumField, SpecTaxPolicy};
use rust_decimal::Decimal;

use crate::spec::{EnumWarning, SpecInputData, SpecItemData, SpecReconciliation, SpecTotals};

/// Subtotal, rounded tax and grand total over `items`.
pub fn derive_totals(items: &[SpecItemData], tax_policy: &SpecTaxPolicy) -> SpecTotals {
    let subtotal: Decimal = items.iter().map(SpecItemData::subtotal).sum();
    let tax = tax_policy.round(subtotal * tax_policy.rate);
    SpecTotals {
        subtotal,
        tax,
        grand_total: subtotal + tax,
    }
}

/// Recompute item subtotals, subtotal, tax and grand total.
///
/// Claimed values outside the policy tolerance become warnings; blank claims
/// are never mismatches. The recomputed values are authoritative.
pub fn reconcile(input: &SpecInputData, tax_policy: &SpecTaxPolicy) -> SpecReconciliation {
    let mut l_warnings = Vec::new();

    let item_subtotals: Vec<Decimal> = input.items.iter().map(|item| item.subtotal()).collect();
    for (idx_item, (item, computed)) in input.items.iter().zip(&item_subtotals).enumerate() {
        if let Some(claimed) = item.claimed_subtotal
            && !tax_policy.is_within_tolerance(claimed, *computed)
        {
            l_warnings.push(EnumWarning::ItemSubtotalMismatch {
                idx_item,
                name: item.name.clone(),
                claimed,
                computed: *computed,
            });
        }
    }

    let totals = derive_totals(&input.items, tax_policy);

    let l_checks = [
        (EnumField::TotalAmount, input.claimed.total_amount, totals.subtotal),
        (EnumField::Tax, input.claimed.tax, totals.tax),
        (EnumField::GrandTotal, input.claimed.grand_total, totals.grand_total),
    ];
    for (field, claimed, computed) in l_checks {
        if let Some(claimed) = claimed
            && !tax_policy.is_within_tolerance(claimed, computed)
        {
            l_warnings.push(EnumWarning::TotalsMismatch {
                field,
                claimed,
                computed,
            });
        }
    }

    for warning in &l_warnings {
        tracing::warn!(%warning, "totals mismatch");
    }

    SpecReconciliation {
        totals,
        item_subtotals,
        warnings: l_warnings,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use quotekit_schema::{EnumDocumentType, EnumField, EnumTaxRounding, SpecTaxPolicy};
    use rust_decimal::Decimal;

    use super::reconcile;
    use crate::spec::{EnumWarning, SpecClaimedTotals, SpecInputData, SpecItemData};

    fn policy() -> SpecTaxPolicy {
        SpecTaxPolicy {
            rate: Decimal::new(10, 2),
            rounding: EnumTaxRounding::HalfUp,
            scale: 0,
            tolerance: Decimal::ZERO,
        }
    }

    fn input(items: Vec<SpecItemData>, claimed: SpecClaimedTotals) -> SpecInputData {
        SpecInputData {
            document_type: EnumDocumentType::Estimate,
            issue_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            company_name: "ACME Corp".to_string(),
            contact_name: String::new(),
            address: String::new(),
            email: None,
            remarks: String::new(),
            items,
            claimed,
        }
    }

    fn widget_and_gadget() -> Vec<SpecItemData> {
        vec![
            SpecItemData::new("Widget", Decimal::TWO, Decimal::new(500, 0)),
            SpecItemData::new("Gadget", Decimal::ONE, Decimal::new(1200, 0)),
        ]
    }

    #[test]
    fn computes_subtotal_tax_and_grand_total() {
        let result = reconcile(&input(widget_and_gadget(), Default::default()), &policy());
        assert_eq!(result.totals.subtotal, Decimal::new(2200, 0));
        assert_eq!(result.totals.tax, Decimal::new(220, 0));
        assert_eq!(result.totals.grand_total, Decimal::new(2420, 0));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn wrong_claimed_total_is_flagged_not_used() {
        let claimed = SpecClaimedTotals {
            total_amount: Some(Decimal::new(9999, 0)),
            ..Default::default()
        };
        let result = reconcile(&input(widget_and_gadget(), claimed), &policy());
        assert_eq!(result.totals.subtotal, Decimal::new(2200, 0));
        assert_eq!(
            result.warnings,
            vec![EnumWarning::TotalsMismatch {
                field: EnumField::TotalAmount,
                claimed: Decimal::new(9999, 0),
                computed: Decimal::new(2200, 0),
            }]
        );
        assert!(result.has_mismatch());
    }

    #[test]
    fn stale_item_subtotal_is_reported() {
        let mut items = widget_and_gadget();
        items[1].claimed_subtotal = Some(Decimal::new(1100, 0));
        let result = reconcile(&input(items, Default::default()), &policy());
        assert!(matches!(
            result.warnings.as_slice(),
            [EnumWarning::ItemSubtotalMismatch { idx_item: 1, .. }]
        ));
    }

    #[test]
    fn empty_items_yield_zero_totals() {
        let result = reconcile(&input(vec![], Default::default()), &policy());
        assert_eq!(result.totals.subtotal, Decimal::ZERO);
        assert_eq!(result.totals.tax, Decimal::ZERO);
        assert_eq!(result.totals.grand_total, Decimal::ZERO);
        assert!(result.item_subtotals.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn tolerance_absorbs_small_differences() {
        let mut policy = policy();
        policy.tolerance = Decimal::ONE;
        let claimed = SpecClaimedTotals {
            tax: Some(Decimal::new(221, 0)),
            ..Default::default()
        };
        let result = reconcile(&input(widget_and_gadget(), claimed), &policy);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn tax_rounding_follows_policy() {
        let items = vec![SpecItemData::new("Bolt", Decimal::new(3, 0), Decimal::new(335, 0))];
        let mut policy = policy();
        policy.rate = Decimal::new(8, 2); // 1005 * 0.08 = 80.4
        policy.rounding = EnumTaxRounding::Up;
        let result = reconcile(&input(items, Default::default()), &policy);
        assert_eq!(result.totals.tax, Decimal::new(81, 0));
        assert_eq!(result.totals.grand_total, Decimal::new(1086, 0));
    }

    proptest! {
        #[test]
        fn reconciliation_is_idempotent_over_its_projection(
            rows in prop::collection::vec((0u32..1_000, 0i64..1_000_000, 0u32..3), 0..12),
            claimed in prop::option::of(0i64..10_000_000),
        ) {
            let items = rows
                .iter()
                .enumerate()
                .map(|(n, (qty, price, scale))| {
                    SpecItemData::new(format!("item-{n}"), Decimal::from(*qty), Decimal::new(*price, *scale))
                })
                .collect();
            let claimed = SpecClaimedTotals {
                grand_total: claimed.map(|v| Decimal::new(v, 0)),
                ..Default::default()
            };
            let data = input(items, claimed);
            let first = reconcile(&data, &policy());
            let second = reconcile(&data.reconciled_projection(&first), &policy());

            prop_assert_eq!(first.totals, second.totals);
            prop_assert_eq!(&first.item_subtotals, &second.item_subtotals);
            prop_assert!(second.warnings.is_empty());
            prop_assert_eq!(first.totals.grand_total, first.totals.subtotal + first.totals.tax);
        }
    }
}
