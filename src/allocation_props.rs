//! Property-based tests for proration and coverage.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::{
    calendar::{self, date},
    options::{EngineOptions, EvidencePolicy},
    period::BillingPeriod,
    report::compute_allocation_with,
};

const YEAR: i32 = 2024;

fn options() -> EngineOptions {
    let mut options = EngineOptions::default();
    options.with_evidence(EvidencePolicy::Ignore);
    options
}

fn epsilon() -> Decimal {
    Decimal::new(1, 9)
}

/// Strategy to generate a positive quantity from 0.01 to 1,000,000.00
fn quantity() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a (start offset, length) pair relative to 1 January.
fn offsets(min_start: i64, max_start: i64) -> impl Strategy<Value = (i64, i64)> {
    (min_start..max_start, 1i64..400)
}

fn make_period(id: usize, start: NaiveDate, days: i64, quantity: Decimal) -> BillingPeriod {
    BillingPeriod::new(
        format!("p{}", id),
        start,
        start + Duration::days(days - 1),
        quantity,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A period entirely inside the year is allocated in full.
    #[test]
    fn prop_conservation(start in 0i64..366, len in 1i64..366, qty in quantity()) {
        let first = date(YEAR, 1, 1) + Duration::days(start);
        let last = std::cmp::min(first + Duration::days(len - 1), date(YEAR, 12, 31));
        let days = calendar::days_inclusive(first, last).unwrap();
        let p = make_period(0, first, days, qty);

        let result = compute_allocation_with(&[p], YEAR, &options()).unwrap();

        prop_assert!((result.year_total - qty).abs() < epsilon());
    }

    /// Days outside the year are dropped in proportion to their share of the period.
    #[test]
    fn prop_clipping((start, len) in offsets(-400, 366), qty in quantity()) {
        let first = date(YEAR, 1, 1) + Duration::days(start);
        let p = make_period(0, first, len, qty);
        let range = p.range().unwrap();
        prop_assume!(range.from < date(YEAR, 1, 1) || range.to > date(YEAR, 12, 31));

        let result = compute_allocation_with(&[p], YEAR, &options()).unwrap();

        let inside = range
            .intersect(&calendar::year_bounds(YEAR).unwrap())
            .map_or(0, |r| r.days());
        let expected = qty * Decimal::from(inside) / Decimal::from(range.days());

        prop_assert!(result.year_total < qty);
        prop_assert!((result.year_total - expected).abs() < epsilon());
    }

    /// No contribution is ever negative, and each bucket's total is its contributions.
    #[test]
    fn prop_non_negative(
        periods in prop::collection::vec((offsets(-60, 366), quantity()), 0..12),
    ) {
        let periods: Vec<BillingPeriod> = periods
            .into_iter()
            .enumerate()
            .map(|(i, ((start, len), qty))| {
                make_period(i, date(YEAR, 1, 1) + Duration::days(start), len, qty)
            })
            .collect();

        let result = compute_allocation_with(&periods, YEAR, &options()).unwrap();

        for m in &result.months {
            let sum: Decimal = m.contributions.iter().map(|c| c.allocated_quantity).sum();
            prop_assert_eq!(sum, m.total_allocated);

            for c in &m.contributions {
                prop_assert!(c.overlap_days > 0);
                prop_assert!(c.overlap_days <= i64::from(m.days_in_month));
                prop_assert!(c.allocated_quantity >= Decimal::ZERO);
            }
        }
    }

    /// The same input always produces the same result, and coverage agrees with gaps.
    #[test]
    fn prop_idempotent(
        periods in prop::collection::vec((offsets(-60, 366), quantity()), 0..12),
    ) {
        let periods: Vec<BillingPeriod> = periods
            .into_iter()
            .enumerate()
            .map(|(i, ((start, len), qty))| {
                make_period(i, date(YEAR, 1, 1) + Duration::days(start), len, qty)
            })
            .collect();

        let first = compute_allocation_with(&periods, YEAR, &options()).unwrap();
        let second = compute_allocation_with(&periods, YEAR, &options()).unwrap();

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(
            first.coverage.is_complete,
            first.coverage.gaps.is_empty() && first.coverage.overlaps.is_empty()
        );
    }
}
