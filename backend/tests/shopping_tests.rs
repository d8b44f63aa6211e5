//! Shopping list tests
//!
//! Tests for the list state machine, completion figures, and the
//! completion-to-stock bridge quantities.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{
    completion_percentage, ItemPriority, ItemReason, ListStatus, MovementType, ShoppingListItem,
};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn item(suggested: &str, actual: Option<&str>, checked: bool) -> ShoppingListItem {
    ShoppingListItem {
        id: Uuid::from_u128(1),
        shopping_list_id: Uuid::from_u128(2),
        product_id: Uuid::from_u128(3),
        suggested_quantity: dec(suggested),
        actual_quantity: actual.map(dec),
        priority: ItemPriority::Normal,
        reason: ItemReason::Manual,
        estimated_cost: None,
        actual_cost: None,
        is_checked: checked,
        notes: None,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    const ALL_STATUSES: [ListStatus; 4] = [
        ListStatus::Draft,
        ListStatus::Active,
        ListStatus::Completed,
        ListStatus::Archived,
    ];

    #[test]
    fn allowed_transitions() {
        assert!(ListStatus::Draft.can_transition(ListStatus::Active));
        assert!(ListStatus::Active.can_transition(ListStatus::Completed));
        assert!(ListStatus::Active.can_transition(ListStatus::Archived));
        assert!(ListStatus::Completed.can_transition(ListStatus::Archived));
    }

    #[test]
    fn draft_cannot_complete_directly() {
        assert!(!ListStatus::Draft.can_transition(ListStatus::Completed));
    }

    #[test]
    fn archived_is_terminal() {
        for to in ALL_STATUSES {
            assert!(!ListStatus::Archived.can_transition(to));
        }
    }

    #[test]
    fn no_backward_transitions() {
        assert!(!ListStatus::Active.can_transition(ListStatus::Draft));
        assert!(!ListStatus::Completed.can_transition(ListStatus::Active));
        assert!(!ListStatus::Completed.can_transition(ListStatus::Draft));
    }

    #[test]
    fn no_self_transitions() {
        for status in ALL_STATUSES {
            assert!(!status.can_transition(status));
        }
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in ALL_STATUSES {
            assert_eq!(ListStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(ListStatus::from_str("pending"), None);
    }

    #[test]
    fn completion_percentage_of_empty_list_is_zero() {
        assert_eq!(completion_percentage(0, 0), 0);
    }

    #[test]
    fn completion_percentage_rounds_down() {
        assert_eq!(completion_percentage(3, 1), 33);
        assert_eq!(completion_percentage(3, 2), 66);
        assert_eq!(completion_percentage(3, 3), 100);
    }

    #[test]
    fn quantity_to_add_prefers_actual() {
        assert_eq!(item("2", Some("3.5"), true).quantity_to_add(), dec("3.5"));
    }

    #[test]
    fn quantity_to_add_falls_back_to_suggested() {
        assert_eq!(item("2", None, true).quantity_to_add(), dec("2"));
    }

    /// Scenario: completing a list with one checked item (suggested 2, no
    /// actual) opens one batch of quantity 2 with one IN movement of 2.
    #[test]
    fn completion_opens_batch_with_suggested_quantity() {
        let checked = item("2", None, true);

        let quantity = checked.quantity_to_add();
        assert_eq!(quantity, dec("2"));

        // New batches start at zero and receive the paired IN movement
        let batch_quantity = MovementType::In.apply(Decimal::ZERO, quantity);
        assert_eq!(batch_quantity, dec("2"));
    }

    #[test]
    fn unchecked_items_are_ignored_at_completion() {
        let items = [
            item("2", None, true),
            item("4", Some("1"), false),
            item("3", None, false),
        ];

        let total_added: Decimal = items
            .iter()
            .filter(|i| i.is_checked)
            .map(|i| i.quantity_to_add())
            .sum();

        assert_eq!(total_added, dec("2"));
    }

    #[test]
    fn priority_ranks_are_ordered() {
        assert!(ItemPriority::Urgent.rank() > ItemPriority::High.rank());
        assert!(ItemPriority::High.rank() > ItemPriority::Normal.rank());
        assert!(ItemPriority::Normal.rank() > ItemPriority::Low.rank());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn status_strategy() -> impl Strategy<Value = ListStatus> {
        prop_oneof![
            Just(ListStatus::Draft),
            Just(ListStatus::Active),
            Just(ListStatus::Completed),
            Just(ListStatus::Archived),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The lifecycle only ever moves forward: draft(0) → active(1) →
        /// completed(2) → archived(3), never back and never skipping from
        /// draft past active
        #[test]
        fn prop_transitions_only_move_forward(
            from in status_strategy(),
            to in status_strategy()
        ) {
            fn stage(s: ListStatus) -> u8 {
                match s {
                    ListStatus::Draft => 0,
                    ListStatus::Active => 1,
                    ListStatus::Completed => 2,
                    ListStatus::Archived => 3,
                }
            }

            if from.can_transition(to) {
                prop_assert!(stage(to) > stage(from));
                // Draft may only reach active
                if from == ListStatus::Draft {
                    prop_assert_eq!(to, ListStatus::Active);
                }
            }
        }

        /// Completion percentage stays within 0..=100 and hits the bounds
        /// exactly
        #[test]
        fn prop_completion_percentage_bounded(
            total in 0i64..500,
            checked_excess in 0i64..500
        ) {
            let checked = checked_excess.min(total);
            let percentage = completion_percentage(total, checked);

            prop_assert!((0..=100).contains(&percentage));
            if total > 0 && checked == total {
                prop_assert_eq!(percentage, 100);
            }
            if checked == 0 {
                prop_assert_eq!(percentage, 0);
            }
        }

        /// The stock bridge uses the actual quantity exactly when one was
        /// recorded
        #[test]
        fn prop_quantity_to_add_selection(
            suggested in 1i64..=10000,
            actual in prop::option::of(1i64..=10000)
        ) {
            let suggested = Decimal::new(suggested, 1);
            let actual = actual.map(|a| Decimal::new(a, 1));

            let item = ShoppingListItem {
                suggested_quantity: suggested,
                actual_quantity: actual,
                ..item("1", None, true)
            };

            prop_assert_eq!(item.quantity_to_add(), actual.unwrap_or(suggested));
        }
    }
}
