use crate::{
    allocation::{allocate, AllocationError, MonthBucket},
    calendar,
    coverage::{check_coverage, CoverageReport},
    options::EngineOptions,
    period::{partition_periods, BillingPeriod, PeriodWarning, RejectedPeriod},
};
use log::{debug, error};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

// Accounting years must be written with exactly four digits
const VALID_YEARS: RangeInclusive<i32> = 1000..=9999;

/// Everything the engine knows about a submission set for one accounting year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub year: i32,
    pub months: Vec<MonthBucket>,
    pub year_total: Decimal,
    pub coverage: CoverageReport,
    pub rejected_periods: Vec<RejectedPeriod>,
    pub warnings: Vec<PeriodWarning>,
}

impl AllocationResult {
    /// Looks up a month by its calendar number (January = 1)
    pub fn month(&self, month: u32) -> Option<&MonthBucket> {
        self.months.iter().find(|m| m.month == month)
    }

    /// True when the year is fully covered and no period was rejected or flagged
    pub fn is_clean(&self) -> bool {
        self.coverage.is_complete && self.rejected_periods.is_empty() && self.warnings.is_empty()
    }
}

/// Prorates `periods` into the calendar months of `year` using the default options.
pub fn compute_allocation(
    periods: &[BillingPeriod],
    year: i32,
) -> Result<AllocationResult, AllocationError> {
    compute_allocation_with(periods, year, &EngineOptions::default())
}

/// Prorates `periods` into the calendar months of `year`.
///
/// Malformed periods don't fail the call. They are left out of the allocation and
/// coverage checks and returned in `rejected_periods` instead. The only errors are
/// contract violations by the caller, such as a year that isn't four digits long.
pub fn compute_allocation_with(
    periods: &[BillingPeriod],
    year: i32,
    options: &EngineOptions,
) -> Result<AllocationResult, AllocationError> {
    if !VALID_YEARS.contains(&year) {
        error!("refusing to allocate for year {}", year);
        return Err(AllocationError::InvalidYear(year));
    }

    let partition = partition_periods(periods, options);
    debug!(
        "{} of {} periods accepted for {}",
        partition.accepted.len(),
        periods.len(),
        year
    );

    let months = allocate(&partition.accepted, year)?;
    let coverage = check_coverage(&partition.accepted, &calendar::year_bounds(year)?);

    assemble(
        year,
        months,
        coverage,
        partition.rejected,
        partition.warnings,
    )
}

// Pure aggregation. Nothing computed upstream is recalculated here, so the year total
// always agrees with the months it was built from.
fn assemble(
    year: i32,
    months: Vec<MonthBucket>,
    coverage: CoverageReport,
    rejected_periods: Vec<RejectedPeriod>,
    warnings: Vec<PeriodWarning>,
) -> Result<AllocationResult, AllocationError> {
    let mut year_total = Decimal::ZERO;
    for m in &months {
        year_total = year_total.checked_add(m.total_allocated).ok_or_else(|| {
            let id = m.contributions.last().map_or_else(String::new, |c| c.period_id.clone());
            AllocationError::Overflow(id)
        })?;
    }

    Ok(AllocationResult {
        year,
        months,
        year_total,
        coverage,
        rejected_periods,
        warnings,
    })
}
