//! Per-symbol series, before and after validation.

use crate::models::bar::DailyBar;

/// One row as the provider delivered it.
///
/// Fields stay textual and optional so the quality gate can tell a missing
/// value from one that does not parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    /// Trading day, expected as `YYYY-MM-DD`.
    pub date: String,
    /// Opening price.
    pub open: Option<String>,
    /// Highest price.
    pub high: Option<String>,
    /// Lowest price.
    pub low: Option<String>,
    /// Closing price.
    pub close: Option<String>,
    /// Shares traded.
    pub volume: Option<String>,
}

impl RawRow {
    /// Fields in provider order, paired with their names.
    pub fn fields(&self) -> [(&'static str, Option<&str>); 5] {
        [
            ("open", self.open.as_deref()),
            ("high", self.high.as_deref()),
            ("low", self.low.as_deref()),
            ("close", self.close.as_deref()),
            ("volume", self.volume.as_deref()),
        ]
    }
}

/// Unvalidated provider output for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSeries {
    /// Requested symbol.
    pub symbol: String,
    /// Provider's "last refreshed" stamp, if any.
    pub last_refreshed: Option<String>,
    /// Rows in the order the provider sent them.
    pub rows: Vec<RawRow>,
}

/// A validated series: dates strictly descending, every bar consistent.
///
/// Built once per fetch by the quality gate and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// Ticker symbol.
    pub symbol: String,
    /// Provider's "last refreshed" stamp, if any.
    pub last_refreshed: Option<String>,
    /// Bars, newest first.
    pub bars: Vec<DailyBar>,
}

impl Series {
    /// The newest bar.
    pub fn latest(&self) -> Option<&DailyBar> {
        self.bars.first()
    }
}
