//! Converts utility billing periods, which rarely line up with calendar months, into
//! calendar-month usage figures for a reporting year, and checks that the periods
//! cover that year without gaps or overlaps.
//!
//! ```
//! use chrono::NaiveDate;
//! use rust_decimal::Decimal;
//! use usage_proration::{compute_allocation, BillingPeriod};
//!
//! let bill = BillingPeriod::new(
//!     "2023-q1",
//!     NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2023, 3, 31).unwrap(),
//!     Decimal::from(900),
//! )
//! .with_source_ref("uploads/2023-q1.pdf");
//!
//! let result = compute_allocation(&[bill], 2023).unwrap();
//! assert_eq!(result.month(2).unwrap().total_allocated, Decimal::from(280));
//! assert!(!result.coverage.is_complete);
//! ```

mod allocation;
mod calendar;
mod coverage;
mod options;
mod period;
mod report;

#[cfg(test)]
mod allocation_props;

pub use allocation::{allocate, AllocationError, Contribution, MonthBucket};
pub use calendar::{
    days_in_month, days_inclusive, is_leap_year, month_bounds, overlap_days, year_bounds,
    CalendarError, DateRange,
};
pub use coverage::{check_coverage, CoverageReport, OverlapAnomaly};
pub use options::{EngineOptions, EvidencePolicy};
pub use period::{
    partition_periods, validate_period, BillingPeriod, Partition, PeriodError, PeriodWarning,
    RejectedPeriod,
};
pub use report::{compute_allocation, compute_allocation_with, AllocationResult};
