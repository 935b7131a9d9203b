//! Validation of raw provider rows into a typed [`Series`].
//!
//! ## Checks
//! Applied in this order; the first failure rejects the whole series:
//!
//! 1. `empty_series`: no rows at all.
//! 2. `parse_error`: a date or a present value does not parse.
//! 3. `non_monotonic_dates`: after sorting newest first, dates are not strictly
//!    descending (duplicates).
//! 4. `missing_field`: any of open/high/low/close/volume absent.
//! 5. `zero_volume`: a day with no shares traded.
//! 6. `negative_price`, then `price_outlier`: a price above 10x the 99th
//!    percentile of its own column.
//! 7. `inconsistent_prices`: `low > high`, or open/close outside `[low, high]`.
//!
//! A [`Rejection`] carries the reason code and the offending dates (or
//! `date: field` entries) so operators can find the bad rows.

mod checks;

use std::{fmt, sync::Arc};

use shared_utils::event_log::EventLog;
use thiserror::Error;

use crate::models::{
    bar::DailyBar,
    series::{RawSeries, Series},
};

pub use checks::percentile;

/// Default column quantile for the outlier check.
pub const OUTLIER_QUANTILE: f64 = 0.99;
/// Default multiple of the quantile above which a price is an outlier.
pub const OUTLIER_FACTOR: f64 = 10.0;

/// Why a series was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    EmptySeries,
    ParseError,
    NonMonotonicDates,
    MissingField,
    ZeroVolume,
    NegativePrice,
    PriceOutlier,
    InconsistentPrices,
}

impl RejectReason {
    /// Stable snake_case code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmptySeries => "empty_series",
            Self::ParseError => "parse_error",
            Self::NonMonotonicDates => "non_monotonic_dates",
            Self::MissingField => "missing_field",
            Self::ZeroVolume => "zero_volume",
            Self::NegativePrice => "negative_price",
            Self::PriceOutlier => "price_outlier",
            Self::InconsistentPrices => "inconsistent_prices",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A series that failed the quality gate.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{symbol} rejected: {reason}{}", detail_suffix(.detail))]
pub struct Rejection {
    /// Symbol of the rejected series.
    pub symbol: String,
    /// First check that failed.
    pub reason: RejectReason,
    /// Offending dates or `date: field` entries.
    pub detail: Vec<String>,
}

fn detail_suffix(detail: &[String]) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(" [{}]", detail.join(", "))
    }
}

/// Turns a [`RawSeries`] into a [`Series`] or a [`Rejection`].
pub struct QualityGate {
    log: Arc<dyn EventLog>,
    outlier_quantile: f64,
    outlier_factor: f64,
}

impl QualityGate {
    /// Gate with the default outlier thresholds.
    pub fn new(log: Arc<dyn EventLog>) -> Self {
        Self {
            log,
            outlier_quantile: OUTLIER_QUANTILE,
            outlier_factor: OUTLIER_FACTOR,
        }
    }

    /// Override the outlier rule: reject prices above `factor` times the
    /// column's `quantile`.
    pub fn with_outlier_rule(mut self, quantile: f64, factor: f64) -> Self {
        self.outlier_quantile = quantile;
        self.outlier_factor = factor;
        self
    }

    /// Validate `raw` and return its bars sorted newest first.
    pub fn validate_and_transform(&self, raw: RawSeries) -> Result<Series, Rejection> {
        match self.check(&raw) {
            Ok(bars) => Ok(Series {
                symbol: raw.symbol,
                last_refreshed: raw.last_refreshed,
                bars,
            }),
            Err((reason, detail)) => {
                let rejection = Rejection {
                    symbol: raw.symbol,
                    reason,
                    detail,
                };
                self.log.warn(&format!("data quality check failed: {rejection}"));
                Err(rejection)
            }
        }
    }

    fn check(&self, raw: &RawSeries) -> Result<Vec<DailyBar>, (RejectReason, Vec<String>)> {
        fn fail_if(reason: RejectReason, offenders: Vec<String>) -> Result<(), (RejectReason, Vec<String>)> {
            if offenders.is_empty() {
                Ok(())
            } else {
                Err((reason, offenders))
            }
        }

        if raw.rows.is_empty() {
            return Err((RejectReason::EmptySeries, Vec::new()));
        }

        let mut rows =
            checks::parse_rows(&raw.rows).map_err(|dates| (RejectReason::ParseError, dates))?;
        rows.sort_by(|a, b| b.date.cmp(&a.date));

        fail_if(RejectReason::NonMonotonicDates, checks::non_monotonic_dates(&rows))?;
        fail_if(RejectReason::MissingField, checks::missing_fields(&rows))?;

        let bars = checks::into_bars(&rows);
        fail_if(RejectReason::ZeroVolume, checks::zero_volume(&bars))?;
        fail_if(RejectReason::NegativePrice, checks::negative_prices(&bars))?;
        fail_if(
            RejectReason::PriceOutlier,
            checks::price_outliers(&bars, self.outlier_quantile, self.outlier_factor),
        )?;
        fail_if(RejectReason::InconsistentPrices, checks::inconsistent_prices(&bars))?;

        Ok(bars)
    }
}

/// The newest bar of a validated series.
pub fn latest(series: &Series) -> Option<&DailyBar> {
    series.latest()
}
