//! Canonical in-memory representation of one trading day (OHLCV).
//!
//! Produced by the [`QualityGate`](crate::quality::QualityGate) from a
//! provider's [`RawRow`](crate::models::series::RawRow); every field is
//! present and parsed by the time a `DailyBar` exists.

use chrono::NaiveDate;

/// A single daily bar.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    /// Trading day.
    pub date: NaiveDate,

    /// Opening price.
    pub open: f64,

    /// Highest price of the day.
    pub high: f64,

    /// Lowest price of the day.
    pub low: f64,

    /// Closing price.
    pub close: f64,

    /// Shares traded.
    pub volume: u64,
}

impl DailyBar {
    /// The four prices as `(name, value)` pairs, in provider field order.
    pub fn prices(&self) -> [(&'static str, f64); 4] {
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ]
    }
}
