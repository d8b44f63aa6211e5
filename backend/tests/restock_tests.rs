//! Restock evaluation and list generation tests
//!
//! Tests for the derived stock state and the generator's suggestion rules:
//! - needs_restock is true iff total == 0 or total < threshold
//! - Out of stock suggests the full threshold at urgent priority
//! - Below threshold suggests the deficit, high priority under the 30% band

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{
    priority_high_band, suggest_restock_item, ItemPriority, ItemReason, RestockState,
};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn product_id() -> Uuid {
    Uuid::from_u128(42)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn at_threshold_is_not_below() {
        // The comparison is strict
        let state = RestockState::evaluate(product_id(), dec("2"), dec("2"));
        assert!(!state.is_below_threshold);
        assert!(!state.needs_restock);
    }

    #[test]
    fn below_threshold_needs_restock() {
        let state = RestockState::evaluate(product_id(), dec("1"), dec("2"));
        assert!(state.is_below_threshold);
        assert!(state.needs_restock);
    }

    #[test]
    fn zero_stock_needs_restock_even_with_zero_threshold() {
        let state = RestockState::evaluate(product_id(), dec("0"), dec("0"));
        assert!(!state.is_below_threshold);
        assert!(state.needs_restock);
    }

    #[test]
    fn positive_stock_with_zero_threshold_is_fine() {
        let state = RestockState::evaluate(product_id(), dec("0.5"), dec("0"));
        assert!(!state.needs_restock);
    }

    /// Scenario: one product at zero stock with threshold 3 yields one item,
    /// urgent, out of stock, suggesting the full threshold.
    #[test]
    fn out_of_stock_suggests_threshold_at_urgent() {
        let suggestion = suggest_restock_item(dec("0"), dec("3")).unwrap();

        assert_eq!(suggestion.quantity, dec("3"));
        assert_eq!(suggestion.priority, ItemPriority::Urgent);
        assert_eq!(suggestion.reason, ItemReason::OutOfStock);
    }

    #[test]
    fn below_threshold_suggests_the_deficit() {
        let suggestion = suggest_restock_item(dec("1.5"), dec("4")).unwrap();

        assert_eq!(suggestion.quantity, dec("2.5"));
        assert_eq!(suggestion.reason, ItemReason::BelowThreshold);
    }

    #[test]
    fn deep_deficit_is_high_priority() {
        // 0.5 < 4 * 0.3 = 1.2
        let suggestion = suggest_restock_item(dec("0.5"), dec("4")).unwrap();
        assert_eq!(suggestion.priority, ItemPriority::High);
    }

    #[test]
    fn shallow_deficit_is_normal_priority() {
        // 2 >= 4 * 0.3
        let suggestion = suggest_restock_item(dec("2"), dec("4")).unwrap();
        assert_eq!(suggestion.priority, ItemPriority::Normal);
    }

    #[test]
    fn band_boundary_is_strict() {
        // Exactly 30% of the threshold is not "under" the band
        let threshold = dec("10");
        let at_band = threshold * priority_high_band();
        let suggestion = suggest_restock_item(at_band, threshold).unwrap();
        assert_eq!(suggestion.priority, ItemPriority::Normal);
    }

    #[test]
    fn stocked_products_are_skipped() {
        assert!(suggest_restock_item(dec("5"), dec("2")).is_none());
        assert!(suggest_restock_item(dec("2"), dec("2")).is_none());
    }

    /// A generation run over only well-stocked products produces zero items,
    /// which makes the generator discard the list.
    #[test]
    fn no_suggestions_means_no_list() {
        let products = [
            (dec("10"), dec("2")),
            (dec("3"), dec("3")),
            (dec("0.5"), dec("0.5")),
        ];

        let items: Vec<_> = products
            .iter()
            .filter_map(|(total, threshold)| suggest_restock_item(*total, *threshold))
            .collect();

        assert!(items.is_empty());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for non-negative stock totals
    fn stock_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..=10000i64).prop_map(|n| Decimal::new(n, 1))
    }

    /// Strategy for non-negative thresholds
    fn threshold_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..=10000i64).prop_map(|n| Decimal::new(n, 1))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// needs_restock iff total == 0 or total < threshold, for all
        /// thresholds >= 0
        #[test]
        fn prop_needs_restock_iff_zero_or_below(
            total in stock_strategy(),
            threshold in threshold_strategy()
        ) {
            let state = RestockState::evaluate(product_id(), total, threshold);

            let expected = total == Decimal::ZERO || total < threshold;
            prop_assert_eq!(state.needs_restock, expected);
            prop_assert_eq!(state.is_below_threshold, total < threshold);
        }

        /// A suggestion exists exactly when the product needs restocking
        #[test]
        fn prop_suggestion_iff_needs_restock(
            total in stock_strategy(),
            threshold in threshold_strategy()
        ) {
            let state = RestockState::evaluate(product_id(), total, threshold);
            let suggestion = suggest_restock_item(total, threshold);

            prop_assert_eq!(suggestion.is_some(), state.needs_restock);
        }

        /// Buying the suggested quantity brings a below-threshold product
        /// exactly back to its threshold
        #[test]
        fn prop_below_threshold_suggestion_fills_the_gap(
            total in stock_strategy(),
            threshold in threshold_strategy()
        ) {
            prop_assume!(total > Decimal::ZERO && total < threshold);

            let suggestion = suggest_restock_item(total, threshold).unwrap();
            prop_assert_eq!(suggestion.reason, ItemReason::BelowThreshold);
            prop_assert_eq!(total + suggestion.quantity, threshold);
        }

        /// Out-of-stock suggestions always carry the urgent priority
        #[test]
        fn prop_out_of_stock_is_always_urgent(threshold in threshold_strategy()) {
            let suggestion = suggest_restock_item(Decimal::ZERO, threshold).unwrap();

            prop_assert_eq!(suggestion.priority, ItemPriority::Urgent);
            prop_assert_eq!(suggestion.reason, ItemReason::OutOfStock);
            prop_assert_eq!(suggestion.quantity, threshold);
        }

        /// The high/normal split follows the 30% band strictly
        #[test]
        fn prop_priority_band_is_strict(
            total in stock_strategy(),
            threshold in threshold_strategy()
        ) {
            prop_assume!(total > Decimal::ZERO && total < threshold);

            let suggestion = suggest_restock_item(total, threshold).unwrap();
            let expected = if total < threshold * priority_high_band() {
                ItemPriority::High
            } else {
                ItemPriority::Normal
            };
            prop_assert_eq!(suggestion.priority, expected);
        }
    }
}
