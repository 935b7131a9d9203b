//! JSON records stored per symbol.
//!
//! - [`SeriesPayload`] backs the `latest`, `daily` and `full` objects: the
//!   symbol, when it was written, and the bars newest first.
//! - [`MetadataRecord`] backs the `metadata` object: a summary of the last
//!   successful run.
//!
//! Conversions are pure; the caller supplies the write timestamp.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{bar::DailyBar, series::Series};

/// One bar as stored. Dates serialize as `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl From<&DailyBar> for PayloadBar {
    fn from(bar: &DailyBar) -> Self {
        Self {
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        }
    }
}

impl From<PayloadBar> for DailyBar {
    fn from(bar: PayloadBar) -> Self {
        Self {
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        }
    }
}

/// Stored series document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPayload {
    pub symbol: String,
    pub last_updated: DateTime<Utc>,
    /// Bars, newest first.
    pub data: Vec<PayloadBar>,
}

impl SeriesPayload {
    /// Every bar of `series`.
    pub fn full(series: &Series, last_updated: DateTime<Utc>) -> Self {
        Self {
            symbol: series.symbol.clone(),
            last_updated,
            data: series.bars.iter().map(PayloadBar::from).collect(),
        }
    }

    /// Only the newest bar of `series` (empty `data` for an empty series).
    pub fn latest(series: &Series, last_updated: DateTime<Utc>) -> Self {
        Self {
            symbol: series.symbol.clone(),
            last_updated,
            data: series.latest().map(PayloadBar::from).into_iter().collect(),
        }
    }

    /// A single bar, as written to that day's snapshot.
    pub fn day(symbol: &str, bar: &DailyBar, last_updated: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.to_string(),
            last_updated,
            data: vec![PayloadBar::from(bar)],
        }
    }

    /// Rebuild the series this payload was written from.
    pub fn into_series(self) -> Series {
        Series {
            symbol: self.symbol,
            last_refreshed: None,
            bars: self.data.into_iter().map(DailyBar::from).collect(),
        }
    }
}

/// Inclusive date span of a stored series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Summary written next to a symbol's data after each successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub symbol: String,
    pub last_updated: DateTime<Utc>,
    pub latest_date: NaiveDate,
    pub data_points: usize,
    pub date_range: DateRange,
}

impl MetadataRecord {
    /// Summary of `series`; `None` when it has no bars.
    pub fn from_series(series: &Series, last_updated: DateTime<Utc>) -> Option<Self> {
        let newest = series.bars.first()?;
        let oldest = series.bars.last()?;
        Some(Self {
            symbol: series.symbol.clone(),
            last_updated,
            latest_date: newest.date,
            data_points: series.bars.len(),
            date_range: DateRange {
                start: oldest.date,
                end: newest.date,
            },
        })
    }
}
