use crate::{
    calendar::DateRange,
    options::{EngineOptions, EvidencePolicy},
};
use chrono::NaiveDate;
use log::{trace, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// A real-world billing period, e.g. one utility invoice cycle.
///
/// Periods are built straight from caller input and are deliberately not checked on
/// construction. A malformed period must still make it into the result so that it
/// can be traced back to the bill it came from, so validation happens in
/// [`validate_period`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub quantity: Decimal,
    // Handle to the uploaded bill. We never look inside it.
    pub source_ref: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PeriodError {
    #[error("the period ends on {1}, before it starts on {0}")]
    InvalidRange(NaiveDate, NaiveDate), // start, end
    #[error("the quantity {0} must be greater than zero")]
    NonPositiveQuantity(Decimal),
    #[error("the quantity {0} is too large to split across {1} days")]
    QuantityTooLarge(Decimal, i64), // quantity, days
    #[error("no evidence has been attached to this period")]
    MissingEvidence,
    #[error("the id '{0}' has already been used by another period")]
    DuplicateId(String),
}

/// A period that was excluded from allocation, along with why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedPeriod {
    pub period: BillingPeriod,
    pub reason: PeriodError,
}

/// A period that was accepted despite a problem the options told us to tolerate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodWarning {
    pub period_id: String,
    pub reason: PeriodError,
}

/// The outcome of validating a whole submission set
#[derive(Debug, Default)]
pub struct Partition {
    pub accepted: Vec<BillingPeriod>,
    pub rejected: Vec<RejectedPeriod>,
    pub warnings: Vec<PeriodWarning>,
}

impl BillingPeriod {
    pub fn new<S: Into<String>>(
        id: S,
        start_date: NaiveDate,
        end_date: NaiveDate,
        quantity: Decimal,
    ) -> Self {
        BillingPeriod {
            id: id.into(),
            start_date,
            end_date,
            quantity,
            source_ref: None,
        }
    }

    pub fn with_source_ref<S: Into<String>>(mut self, source_ref: S) -> Self {
        self.source_ref = Some(source_ref.into());
        self
    }

    /// The dates this period covers, or `None` if the period is back to front
    pub fn range(&self) -> Option<DateRange> {
        DateRange::new(self.start_date, self.end_date).ok()
    }

    fn has_evidence(&self) -> bool {
        self.source_ref
            .as_deref()
            .map_or(false, |r| !r.trim().is_empty())
    }
}

impl PeriodError {
    /// A stable, machine readable reason for callers that map errors to messages
    pub fn code(&self) -> &'static str {
        match self {
            PeriodError::InvalidRange(..) => "invalid_range",
            PeriodError::NonPositiveQuantity(_) => "non_positive_quantity",
            PeriodError::QuantityTooLarge(..) => "quantity_too_large",
            PeriodError::MissingEvidence => "missing_evidence",
            PeriodError::DuplicateId(_) => "duplicate_id",
        }
    }
}

/// Checks a single period for structural problems.
///
/// The first failing check wins. Evidence is checked last as it is the only rule the
/// caller may relax, see [`EvidencePolicy`].
pub fn validate_period(p: &BillingPeriod, options: &EngineOptions) -> Result<(), PeriodError> {
    if p.end_date < p.start_date {
        return Err(PeriodError::InvalidRange(p.start_date, p.end_date));
    }

    if p.quantity <= Decimal::ZERO {
        return Err(PeriodError::NonPositiveQuantity(p.quantity));
    }

    // Proration multiplies the quantity by up to the period's length in days
    let days = (p.end_date - p.start_date).num_days() + 1;
    if p.quantity.checked_mul(Decimal::from(days)).is_none() {
        return Err(PeriodError::QuantityTooLarge(p.quantity, days));
    }

    if options.evidence == EvidencePolicy::Require && !p.has_evidence() {
        return Err(PeriodError::MissingEvidence);
    }

    Ok(())
}

/// Splits a submission set into the periods we can allocate and the ones we can't.
///
/// Every input period ends up in exactly one of `accepted` or `rejected`, in input
/// order.
pub fn partition_periods(periods: &[BillingPeriod], options: &EngineOptions) -> Partition {
    let mut partition = Partition::default();
    let mut seen_ids = HashSet::new();

    for p in periods {
        let result = validate_period(p, options).and_then(|_| {
            // Only accepted periods claim their id. Otherwise a malformed bill would
            // knock out the corrected bill that replaced it.
            if options.reject_duplicate_ids && seen_ids.contains(p.id.as_str()) {
                Err(PeriodError::DuplicateId(p.id.clone()))
            } else {
                Ok(())
            }
        });

        match result {
            Ok(()) => {
                trace!("accepted period '{}' ({} - {})", p.id, p.start_date, p.end_date);

                if options.evidence == EvidencePolicy::Warn && !p.has_evidence() {
                    warn!("period '{}' has no evidence attached", p.id);
                    partition.warnings.push(PeriodWarning {
                        period_id: p.id.clone(),
                        reason: PeriodError::MissingEvidence,
                    });
                }

                seen_ids.insert(p.id.as_str());
                partition.accepted.push(p.clone());
            }
            Err(reason) => {
                warn!("rejected period '{}': {}", p.id, reason);
                partition.rejected.push(RejectedPeriod {
                    period: p.clone(),
                    reason,
                });
            }
        }
    }

    partition
}
