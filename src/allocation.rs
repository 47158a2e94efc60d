use crate::{
    calendar::{self, CalendarError, DateRange},
    period::BillingPeriod,
};
use log::{debug, trace};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The share of one billing period that lands in one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub period_id: String,
    pub overlap_days: i64,
    pub allocated_quantity: Decimal,
    // Kept so the month can describe which bills it was built from
    pub period_range: DateRange,
}

/// Usage for a single calendar month of the target year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthBucket {
    pub month: u32,
    pub days_in_month: u32,
    pub contributions: Vec<Contribution>,
    pub total_allocated: Decimal,
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum AllocationError {
    #[error("{0} is not a four digit year")]
    InvalidYear(i32),
    #[error("period '{0}' has no duration")]
    ZeroDuration(String),
    #[error("allocating period '{0}' overflowed the quantity range")]
    Overflow(String),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

impl MonthBucket {
    fn new(month: u32, days_in_month: u32) -> Self {
        MonthBucket {
            month,
            days_in_month,
            contributions: Vec::new(),
            total_allocated: Decimal::ZERO,
        }
    }

    fn push(&mut self, contribution: Contribution) -> Result<(), AllocationError> {
        self.total_allocated = self
            .total_allocated
            .checked_add(contribution.allocated_quantity)
            .ok_or_else(|| AllocationError::Overflow(contribution.period_id.clone()))?;
        self.contributions.push(contribution);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.contributions.is_empty()
    }

    /// Lists the billing periods feeding this month, e.g. for a table column.
    ///
    /// Every contributing period is listed, so a month straddled by two bills shows
    /// both of them.
    pub fn billing_period_label(&self) -> String {
        self.contributions
            .iter()
            .map(|c| c.period_range.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Spreads each period's quantity over the months of `year` that it touches.
///
/// A period's quantity is split in proportion to the number of its days that fall in
/// each month. Any days outside of `year` are clipped, so their share of the quantity
/// is dropped rather than squeezed into January or December. Overlapping periods are
/// not deduplicated here; they simply accumulate in the same bucket.
///
/// The periods are expected to have passed validation already.
pub fn allocate(periods: &[BillingPeriod], year: i32) -> Result<Vec<MonthBucket>, AllocationError> {
    debug!("allocating {} periods across {}", periods.len(), year);

    let mut months = Vec::with_capacity(12);

    for month in 1..=12 {
        let bounds = calendar::month_bounds(year, month)?;
        let mut bucket = MonthBucket::new(month, calendar::days_in_month(year, month)?);

        for p in periods {
            let overlap = calendar::overlap_days(p.start_date, p.end_date, bounds.from, bounds.to);
            if overlap == 0 {
                continue;
            }

            let total_days = calendar::days_inclusive(p.start_date, p.end_date)?;
            // Validation guarantees at least one day, but never divide by zero
            if total_days <= 0 {
                return Err(AllocationError::ZeroDuration(p.id.clone()));
            }

            // Multiply before dividing so that whole-number splits stay exact
            let allocated = p
                .quantity
                .checked_mul(Decimal::from(overlap))
                .and_then(|v| v.checked_div(Decimal::from(total_days)))
                .ok_or_else(|| AllocationError::Overflow(p.id.clone()))?;

            trace!(
                "[{}-{:02}] period '{}': {} * {}/{} days = {}",
                year,
                month,
                p.id,
                p.quantity,
                overlap,
                total_days,
                allocated
            );

            bucket.push(Contribution {
                period_id: p.id.clone(),
                overlap_days: overlap,
                allocated_quantity: allocated,
                period_range: DateRange {
                    from: p.start_date,
                    to: p.end_date,
                },
            })?;
        }

        debug!(
            "[{}-{:02}] {} contributions totalling {}",
            year,
            month,
            bucket.contributions.len(),
            bucket.total_allocated
        );

        months.push(bucket);
    }

    Ok(months)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::date;
    use rust_decimal_macros::dec;

    fn period(id: &str, start: (i32, u32, u32), end: (i32, u32, u32), qty: Decimal) -> BillingPeriod {
        BillingPeriod::new(
            id,
            date(start.0, start.1, start.2),
            date(end.0, end.1, end.2),
            qty,
        )
    }

    fn total(months: &[MonthBucket]) -> Decimal {
        months.iter().map(|m| m.total_allocated).sum()
    }

    #[test]
    fn allocate_no_periods() {
        let months = allocate(&[], 2023).unwrap();

        assert_eq!(months.len(), 12);
        assert!(months.iter().all(|m| m.is_empty()));
        assert_eq!(total(&months), Decimal::ZERO);
        assert_eq!(months[1].days_in_month, 28);
    }

    #[test]
    fn allocate_single_month() {
        let months = allocate(&[period("a", (2024, 3, 1), (2024, 3, 31), dec!(42))], 2024).unwrap();

        assert_eq!(months[2].total_allocated, dec!(42));
        assert_eq!(months[2].contributions[0].overlap_days, 31);
        assert_eq!(total(&months), dec!(42));
    }

    #[test]
    fn allocate_straddling_months() {
        let months =
            allocate(&[period("a", (2023, 1, 22), (2023, 2, 20), dec!(300))], 2023).unwrap();

        // 10 days in January, 20 in February
        assert_eq!(months[0].total_allocated, dec!(100));
        assert_eq!(months[1].total_allocated, dec!(200));
        assert_eq!(months[0].contributions[0].overlap_days, 10);
        assert_eq!(months[1].contributions[0].overlap_days, 20);
    }

    #[test]
    fn allocate_clips_to_year() {
        // 17 days in December 2023, 14 days in January 2024
        let months =
            allocate(&[period("a", (2023, 12, 15), (2024, 1, 14), dec!(310))], 2024).unwrap();

        assert_eq!(months[0].total_allocated, dec!(140));
        assert_eq!(total(&months), dec!(140));
    }

    #[test]
    fn allocate_outside_year() {
        let months =
            allocate(&[period("a", (2022, 1, 1), (2022, 12, 31), dec!(365))], 2024).unwrap();
        assert_eq!(total(&months), Decimal::ZERO);
    }

    #[test]
    fn allocate_accumulates_contributions() {
        let periods = vec![
            period("a", (2023, 12, 15), (2024, 1, 14), dec!(310)),
            period("b", (2024, 1, 15), (2024, 2, 14), dec!(310)),
        ];
        let months = allocate(&periods, 2024).unwrap();
        let january = &months[0];

        let ids: Vec<(&str, i64)> = january
            .contributions
            .iter()
            .map(|c| (c.period_id.as_str(), c.overlap_days))
            .collect();
        assert_eq!(ids, vec![("a", 14), ("b", 17)]);
        assert_eq!(january.total_allocated, dec!(310));
        assert_eq!(months[1].total_allocated, dec!(140));
        assert_eq!(
            january.billing_period_label(),
            "2023-12-15 - 2024-01-14, 2024-01-15 - 2024-02-14"
        );
    }

    #[test]
    fn allocate_does_not_merge_overlaps() {
        let periods = vec![
            period("a", (2024, 1, 1), (2024, 1, 31), dec!(31)),
            period("b", (2024, 1, 27), (2024, 2, 25), dec!(30)),
        ];
        let months = allocate(&periods, 2024).unwrap();

        assert_eq!(months[0].contributions.len(), 2);
        assert_eq!(months[0].total_allocated, dec!(36));
        assert_eq!(total(&months), dec!(61));
    }

    #[test]
    fn allocate_leap_february() {
        let months =
            allocate(&[period("a", (2024, 2, 1), (2024, 2, 29), dec!(29))], 2024).unwrap();
        assert_eq!(months[1].days_in_month, 29);
        assert_eq!(months[1].contributions[0].overlap_days, 29);
        assert_eq!(months[1].total_allocated, dec!(29));
    }

    #[test]
    fn allocate_accumulation_overflow() {
        let periods = vec![
            period("a", (2024, 1, 1), (2024, 1, 1), Decimal::MAX),
            period("b", (2024, 1, 2), (2024, 1, 2), Decimal::MAX),
        ];
        assert_eq!(
            allocate(&periods, 2024),
            Err(AllocationError::Overflow("b".into()))
        );
    }

    #[test]
    fn allocation_error_includes_calendar_detail() {
        let err = AllocationError::from(CalendarError::InvalidMonth(13));
        assert_eq!(err.to_string(), "month 13 is not between 1 and 12");
    }
}
