use crate::{calendar::DateRange, period::BillingPeriod};
use chrono::{Datelike, Duration, NaiveDate};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::cmp;

/// Two billing periods claiming the same days
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapAnomaly {
    pub first_period_id: String,
    pub second_period_id: String,
    pub range: DateRange,
}

/// Whether a set of billing periods accounts for every day of the target year.
///
/// An incomplete report is a normal state while bills are still being collected, not
/// an error. Gaps and overlaps are reported separately as they need opposite fixes:
/// a gap needs a missing bill, an overlap needs a duplicate reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub is_complete: bool,
    pub message: String,
    pub gaps: Vec<DateRange>,
    pub overlaps: Vec<OverlapAnomaly>,
    pub uncovered_months: Vec<u32>,
}

/// Inspects the (already validated) periods for gaps and overlaps within `year`.
///
/// Taking the year as a ready-made range means this can't fail: an incomplete
/// year is reported, never raised.
pub fn check_coverage(periods: &[BillingPeriod], year: &DateRange) -> CoverageReport {
    if periods.is_empty() {
        debug!("no periods supplied for {}", year.from.year());

        return CoverageReport {
            is_complete: false,
            message: "no periods supplied".into(),
            gaps: vec![*year],
            overlaps: Vec::new(),
            uncovered_months: (1..=12).collect(),
        };
    }

    // `sort_by` is stable, so periods with identical ranges stay in input order
    let mut sorted: Vec<&BillingPeriod> = periods.iter().collect();
    sorted.sort_by(|a, b| (a.start_date, a.end_date).cmp(&(b.start_date, b.end_date)));

    let mut gaps = Vec::new();
    let mut overlaps = Vec::new();

    // The period reaching furthest into the future so far. Comparing against this
    // rather than the previous period means a long bill that encloses shorter ones
    // doesn't produce phantom gaps between them.
    let mut reach = sorted[0];

    // Earlier periods that haven't ended by the current period's start. Every one of
    // them shares days with it, including enclosed periods that overlap each other.
    let mut active: Vec<&BillingPeriod> = Vec::new();

    if reach.start_date > year.from {
        push_clipped(&mut gaps, year, year.from, reach.start_date - Duration::days(1));
    }

    for &p in &sorted {
        if (p.start_date - reach.end_date).num_days() > 1 {
            trace!("gap between '{}' and '{}'", reach.id, p.id);
            push_clipped(
                &mut gaps,
                year,
                reach.end_date + Duration::days(1),
                p.start_date - Duration::days(1),
            );
        }

        active.retain(|q| q.end_date >= p.start_date);
        for q in &active {
            trace!("'{}' overlaps '{}'", p.id, q.id);
            let shared = DateRange {
                from: p.start_date,
                to: cmp::min(p.end_date, q.end_date),
            };

            if let Some(range) = shared.intersect(year) {
                overlaps.push(OverlapAnomaly {
                    first_period_id: q.id.clone(),
                    second_period_id: p.id.clone(),
                    range,
                });
            }
        }
        active.push(p);

        if p.end_date > reach.end_date {
            reach = p;
        }
    }

    if reach.end_date < year.to {
        push_clipped(&mut gaps, year, reach.end_date + Duration::days(1), year.to);
    }

    let uncovered_months = uncovered_months(&gaps);
    let is_complete = gaps.is_empty() && overlaps.is_empty();
    let message = summarise(year.from.year(), &gaps, &overlaps, &uncovered_months);

    debug!("coverage for {}: {}", year.from.year(), message);

    CoverageReport {
        is_complete,
        message,
        gaps,
        overlaps,
        uncovered_months,
    }
}

// Records a gap, discarding whatever part of it lies outside the target year
fn push_clipped(
    gaps: &mut Vec<DateRange>,
    bounds: &DateRange,
    from: NaiveDate,
    to: NaiveDate,
) {
    if let Some(gap) = (DateRange { from, to }).intersect(bounds) {
        gaps.push(gap);
    }
}

// Every month containing at least one uncovered day. Gaps are ordered and disjoint,
// so the output is sorted without duplicates.
fn uncovered_months(gaps: &[DateRange]) -> Vec<u32> {
    let mut months: Vec<u32> = Vec::new();

    for gap in gaps {
        for m in gap.from.month()..=gap.to.month() {
            if months.last() != Some(&m) {
                months.push(m);
            }
        }
    }

    months
}

fn summarise(
    year: i32,
    gaps: &[DateRange],
    overlaps: &[OverlapAnomaly],
    uncovered_months: &[u32],
) -> String {
    if gaps.is_empty() && overlaps.is_empty() {
        return format!("billing periods cover all of {}", year);
    }

    let mut parts = Vec::new();

    if !gaps.is_empty() {
        let ranges: Vec<String> = gaps.iter().map(|g| g.to_string()).collect();
        let months: Vec<String> = uncovered_months.iter().map(|m| m.to_string()).collect();
        parts.push(format!(
            "{} gap(s) in {} ({}) affecting month(s) {}",
            gaps.len(),
            year,
            ranges.join(", "),
            months.join(", ")
        ));
    }

    if !overlaps.is_empty() {
        let ranges: Vec<String> = overlaps
            .iter()
            .map(|o| format!("'{}' and '{}' on {}", o.first_period_id, o.second_period_id, o.range))
            .collect();
        parts.push(format!(
            "{} overlap(s): {}",
            overlaps.len(),
            ranges.join(", ")
        ));
    }

    parts.join("; ")
}
