//! Stock ledger tests
//!
//! Tests for the batch/movement accounting model:
//! - Movement effects (IN add, OUT subtract, ADJUST absolute set)
//! - Replay invariant: batch quantity equals the last ADJUST reset plus
//!   subsequent IN/OUT deltas
//! - Consumption ordering (nearest expiry first, oldest purchase fallback)
//! - Allocation plan correctness
//! - Quantity parsing with both fractional separators

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{consume_order, plan_allocation, MovementType, RestockState, StockBatch};
use shared::validation::parse_quantity;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Build a test batch with deterministic identity
fn batch(id: u128, quantity: &str, expiry: Option<NaiveDate>, purchase: NaiveDate) -> StockBatch {
    StockBatch {
        id: Uuid::from_u128(id),
        product_id: Uuid::from_u128(1),
        quantity: dec(quantity),
        location_id: None,
        expiry_date: expiry,
        purchase_date: purchase,
        purchase_price: None,
        supplier: None,
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

    #[test]
    fn movement_in_adds() {
        assert_eq!(MovementType::In.apply(dec("2.5"), dec("1.5")), dec("4.0"));
    }

    #[test]
    fn movement_out_subtracts() {
        assert_eq!(MovementType::Out.apply(dec("5"), dec("4")), dec("1"));
    }

    #[test]
    fn movement_adjust_sets_absolute_quantity() {
        // ADJUST is a correction, not a delta
        assert_eq!(MovementType::Adjust.apply(dec("99"), dec("3")), dec("3"));
        assert_eq!(MovementType::Adjust.apply(dec("0"), dec("7.25")), dec("7.25"));
    }

    #[test]
    fn movement_type_round_trips_through_strings() {
        for t in [MovementType::In, MovementType::Out, MovementType::Adjust] {
            assert_eq!(MovementType::from_str(t.as_str()), Some(t));
        }
        assert_eq!(MovementType::from_str("SIDEWAYS"), None);
    }

    #[test]
    fn consume_order_prefers_nearest_expiry() {
        let near = batch(1, "1", Some(date(2024, 6, 10)), date(2024, 6, 1));
        let far = batch(2, "1", Some(date(2024, 8, 1)), date(2024, 5, 1));

        assert_eq!(consume_order(&near, &far), std::cmp::Ordering::Less);
    }

    #[test]
    fn consume_order_puts_non_perishables_last() {
        // A batch without expiry comes after any dated batch, even a far one
        let dated = batch(1, "1", Some(date(2030, 1, 1)), date(2024, 6, 1));
        let undated = batch(2, "1", None, date(2020, 1, 1));

        assert_eq!(consume_order(&dated, &undated), std::cmp::Ordering::Less);
        assert_eq!(consume_order(&undated, &dated), std::cmp::Ordering::Greater);
    }

    #[test]
    fn consume_order_breaks_ties_on_purchase_date_then_id() {
        let expiry = Some(date(2024, 7, 1));
        let older = batch(5, "1", expiry, date(2024, 5, 1));
        let newer = batch(3, "1", expiry, date(2024, 6, 1));
        assert_eq!(consume_order(&older, &newer), std::cmp::Ordering::Less);

        let a = batch(1, "1", expiry, date(2024, 5, 1));
        let b = batch(2, "1", expiry, date(2024, 5, 1));
        assert_eq!(consume_order(&a, &b), std::cmp::Ordering::Less);
    }

    #[test]
    fn allocation_drains_in_order() {
        let mut batches = vec![
            batch(1, "2", None, date(2024, 1, 1)),
            batch(2, "3", Some(date(2024, 7, 1)), date(2024, 2, 1)),
            batch(3, "4", Some(date(2024, 6, 15)), date(2024, 3, 1)),
        ];
        batches.sort_by(consume_order);

        let plan = plan_allocation(&batches, dec("6"));

        // Nearest expiry first: batch 3 fully, then batch 2 partially
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].batch_id, Uuid::from_u128(3));
        assert_eq!(plan[0].quantity, dec("4"));
        assert_eq!(plan[1].batch_id, Uuid::from_u128(2));
        assert_eq!(plan[1].quantity, dec("2"));
    }

    #[test]
    fn allocation_for_full_total_empties_every_batch() {
        let mut batches = vec![
            batch(1, "1.5", Some(date(2024, 6, 20)), date(2024, 1, 1)),
            batch(2, "2.5", None, date(2024, 2, 1)),
            batch(3, "1", Some(date(2024, 9, 1)), date(2024, 3, 1)),
        ];
        batches.sort_by(consume_order);

        let total: Decimal = batches.iter().map(|b| b.quantity).sum();
        let plan = plan_allocation(&batches, total);

        // One movement per batch with nonzero quantity, each taken in full
        assert_eq!(plan.len(), 3);
        for step in &plan {
            let source = batches.iter().find(|b| b.id == step.batch_id).unwrap();
            assert_eq!(step.quantity, source.quantity);
        }
    }

    #[test]
    fn allocation_skips_empty_batches() {
        let mut batches = vec![
            batch(1, "0", Some(date(2024, 6, 10)), date(2024, 1, 1)),
            batch(2, "5", Some(date(2024, 7, 1)), date(2024, 2, 1)),
        ];
        batches.sort_by(consume_order);

        let plan = plan_allocation(&batches, dec("2"));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].batch_id, Uuid::from_u128(2));
    }

    #[test]
    fn parse_quantity_treats_comma_and_dot_identically() {
        assert_eq!(parse_quantity("0,5").unwrap(), parse_quantity("0.5").unwrap());
        assert_eq!(parse_quantity("12,75").unwrap(), dec("12.75"));
    }

    /// Replay a movement sequence over a batch quantity
    fn replay(movements: &[(MovementType, Decimal)]) -> Decimal {
        movements
            .iter()
            .fold(Decimal::ZERO, |quantity, (movement_type, amount)| {
                movement_type.apply(quantity, *amount)
            })
    }

    #[test]
    fn replay_matches_adjust_reset_plus_deltas() {
        let movements = [
            (MovementType::In, dec("10")),
            (MovementType::Out, dec("3")),
            (MovementType::Adjust, dec("5")),
            (MovementType::In, dec("2")),
            (MovementType::Out, dec("1.5")),
        ];

        // After the ADJUST the history before it is irrelevant
        assert_eq!(replay(&movements), dec("5.5"));
        assert_eq!(replay(&movements[2..]), dec("5.5"));
    }

    /// Scenario: product threshold 2, one batch of 5 expiring in 3 days.
    /// Consuming 4 leaves quantity 1 with a single OUT movement, and the
    /// product then needs restocking (1 < 2).
    #[test]
    fn consume_expiring_batch_scenario() {
        let today = date(2024, 6, 1);
        let batch = batch(1, "5", Some(date(2024, 6, 4)), date(2024, 5, 28));

        // With a 7-day window the batch is flagged expiring soon beforehand
        assert!(batch.is_expiring_soon(today, 7));

        let batches = vec![batch.clone()];
        let plan = plan_allocation(&batches, dec("4"));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].quantity, dec("4"));

        let remaining = MovementType::Out.apply(batch.quantity, plan[0].quantity);
        assert_eq!(remaining, dec("1"));

        let state = RestockState::evaluate(batch.product_id, remaining, dec("2"));
        assert!(state.needs_restock);
    }

    /// Requesting more than the total leaves nothing to execute: the caller
    /// rejects before planning, reporting the available total.
    #[test]
    fn over_consumption_is_detected_before_allocation() {
        let batches = vec![
            batch(1, "2", Some(date(2024, 6, 10)), date(2024, 1, 1)),
            batch(2, "1.5", None, date(2024, 2, 1)),
        ];

        let available: Decimal = batches.iter().map(|b| b.quantity).sum();
        let requested = dec("4");
        assert!(requested > available);
        assert_eq!(available, dec("3.5"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating valid quantities (positive decimals)
    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000i64).prop_map(|n| Decimal::new(n, 1)) // 0.1 to 1000.0
    }

    /// Strategy for generating movement sequences
    fn movement_strategy() -> impl Strategy<Value = (MovementType, Decimal)> {
        (
            prop_oneof![
                Just(MovementType::In),
                Just(MovementType::Out),
                Just(MovementType::Adjust),
            ],
            quantity_strategy(),
        )
    }

    /// Strategy for generating batch sets with mixed expiry dates; ids are
    /// assigned by position so they stay unique within a set
    fn batch_set_strategy() -> impl Strategy<Value = Vec<StockBatch>> {
        prop::collection::vec(
            (1i64..=500, prop::option::of(0i64..120), 0i64..120),
            1..12,
        )
        .prop_map(|specs| {
            let base = date(2024, 1, 1);
            specs
                .into_iter()
                .enumerate()
                .map(|(index, (quantity, expiry_offset, purchase_offset))| {
                    batch(
                        index as u128 + 1,
                        &Decimal::new(quantity, 1).to_string(),
                        expiry_offset.map(|o| base + chrono::Duration::days(o)),
                        base + chrono::Duration::days(purchase_offset),
                    )
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Batch quantity always equals the replay of movements since the
        /// last ADJUST (or since creation)
        #[test]
        fn prop_quantity_equals_replay_since_last_adjust(
            movements in prop::collection::vec(movement_strategy(), 1..20)
        ) {
            let full_replay = movements
                .iter()
                .fold(Decimal::ZERO, |q, (t, a)| t.apply(q, *a));

            let tail_start = movements
                .iter()
                .rposition(|(t, _)| *t == MovementType::Adjust)
                .unwrap_or(0);
            let tail_replay = movements[tail_start..]
                .iter()
                .fold(Decimal::ZERO, |q, (t, a)| t.apply(q, *a));

            prop_assert_eq!(full_replay, tail_replay);
        }

        /// An allocation plan for an affordable request consumes exactly the
        /// requested amount and never overdraws a batch
        #[test]
        fn prop_allocation_conserves_quantity(
            mut batches in batch_set_strategy(),
            numerator in 1u32..=100
        ) {
            batches.sort_by(consume_order);
            let total: Decimal = batches.iter().map(|b| b.quantity).sum();
            let requested = total * Decimal::from(numerator) / Decimal::from(100);
            prop_assume!(requested > Decimal::ZERO);

            let plan = plan_allocation(&batches, requested);

            let allocated: Decimal = plan.iter().map(|a| a.quantity).sum();
            prop_assert_eq!(allocated, requested);

            for step in &plan {
                let source = batches.iter().find(|b| b.id == step.batch_id).unwrap();
                prop_assert!(step.quantity > Decimal::ZERO);
                prop_assert!(step.quantity <= source.quantity);
            }
        }

        /// No batch without an expiry date is touched while a dated batch
        /// still has stock left over
        #[test]
        fn prop_expiry_dated_batches_drain_first(
            mut batches in batch_set_strategy(),
            numerator in 1u32..=100
        ) {
            batches.sort_by(consume_order);
            let total: Decimal = batches.iter().map(|b| b.quantity).sum();
            let requested = total * Decimal::from(numerator) / Decimal::from(100);
            prop_assume!(requested > Decimal::ZERO);

            let plan = plan_allocation(&batches, requested);
            let touched_undated = plan.iter().any(|step| {
                batches
                    .iter()
                    .find(|b| b.id == step.batch_id)
                    .unwrap()
                    .expiry_date
                    .is_none()
            });

            if touched_undated {
                // Every dated batch must have been fully allocated
                for b in batches.iter().filter(|b| b.expiry_date.is_some()) {
                    let taken: Decimal = plan
                        .iter()
                        .filter(|s| s.batch_id == b.id)
                        .map(|s| s.quantity)
                        .sum();
                    prop_assert_eq!(taken, b.quantity);
                }
            }
        }

        /// Each batch appears at most once in a plan
        #[test]
        fn prop_one_movement_per_batch(
            mut batches in batch_set_strategy(),
        ) {
            batches.sort_by(consume_order);
            let total: Decimal = batches.iter().map(|b| b.quantity).sum();
            prop_assume!(total > Decimal::ZERO);

            let plan = plan_allocation(&batches, total);

            let mut seen = std::collections::HashSet::new();
            for step in &plan {
                prop_assert!(seen.insert(step.batch_id));
            }
        }

        /// Comma and dot inputs parse to the same quantity
        #[test]
        fn prop_comma_and_dot_parse_identically(
            integral in 0u32..100000,
            fractional in 0u32..100
        ) {
            let with_dot = format!("{}.{:02}", integral, fractional);
            let with_comma = format!("{},{:02}", integral, fractional);

            prop_assert_eq!(
                parse_quantity(&with_dot).unwrap(),
                parse_quantity(&with_comma).unwrap()
            );
        }
    }
}
