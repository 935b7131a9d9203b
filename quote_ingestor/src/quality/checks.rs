//! The individual checks, in the order the gate applies them.
//!
//! Each check returns the offending entries; an empty list means the check
//! passed.

use chrono::NaiveDate;

use crate::models::{bar::DailyBar, series::RawRow};

pub(super) const DATE_FORMAT: &str = "%Y-%m-%d";

/// A row whose present fields all parsed. `None` still means missing.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct ParsedRow {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
}

impl ParsedRow {
    fn missing_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        [
            ("open", self.open.is_none()),
            ("high", self.high.is_none()),
            ("low", self.low.is_none()),
            ("close", self.close.is_none()),
            ("volume", self.volume.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
    }

    fn complete(&self) -> Option<DailyBar> {
        Some(DailyBar {
            date: self.date,
            open: self.open?,
            high: self.high?,
            low: self.low?,
            close: self.close?,
            volume: self.volume?,
        })
    }
}

pub(super) fn day(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn present(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

fn parse_price(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_volume(text: &str) -> Option<u64> {
    text.parse::<u64>().ok().or_else(|| {
        let value = text.parse::<f64>().ok()?;
        (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64)
            .then_some(value as u64)
    })
}

/// Parse dates and every present field. Blank fields count as missing.
///
/// On failure returns the raw date text of each offending row.
pub(super) fn parse_rows(rows: &[RawRow]) -> Result<Vec<ParsedRow>, Vec<String>> {
    let mut parsed = Vec::with_capacity(rows.len());
    let mut offenders = Vec::new();

    for row in rows {
        let date = NaiveDate::parse_from_str(row.date.trim(), DATE_FORMAT).ok();
        let mut ok = date.is_some();

        let mut price = |text: Option<&str>| match present(text) {
            None => None,
            Some(t) => {
                let value = parse_price(t);
                ok &= value.is_some();
                value
            }
        };
        let open = price(row.open.as_deref());
        let high = price(row.high.as_deref());
        let low = price(row.low.as_deref());
        let close = price(row.close.as_deref());

        let volume = match present(row.volume.as_deref()) {
            None => None,
            Some(t) => {
                let value = parse_volume(t);
                ok &= value.is_some();
                value
            }
        };

        match (ok, date) {
            (true, Some(date)) => parsed.push(ParsedRow {
                date,
                open,
                high,
                low,
                close,
                volume,
            }),
            _ => offenders.push(row.date.clone()),
        }
    }

    if offenders.is_empty() {
        Ok(parsed)
    } else {
        Err(offenders)
    }
}

/// Dates that are not strictly below their predecessor, given rows sorted
/// newest first. Only duplicates can trip this after sorting.
pub(super) fn non_monotonic_dates(rows: &[ParsedRow]) -> Vec<String> {
    let mut offenders: Vec<String> = rows
        .windows(2)
        .filter(|pair| pair[1].date >= pair[0].date)
        .map(|pair| day(pair[1].date))
        .collect();
    offenders.dedup();
    offenders
}

/// `"YYYY-MM-DD: field"` for every missing value.
pub(super) fn missing_fields(rows: &[ParsedRow]) -> Vec<String> {
    rows.iter()
        .flat_map(|row| {
            row.missing_fields()
                .map(move |field| format!("{}: {field}", day(row.date)))
        })
        .collect()
}

/// Convert rows already known to be complete.
pub(super) fn into_bars(rows: &[ParsedRow]) -> Vec<DailyBar> {
    rows.iter().filter_map(ParsedRow::complete).collect()
}

pub(super) fn zero_volume(bars: &[DailyBar]) -> Vec<String> {
    bars.iter()
        .filter(|bar| bar.volume == 0)
        .map(|bar| day(bar.date))
        .collect()
}

pub(super) fn negative_prices(bars: &[DailyBar]) -> Vec<String> {
    bars.iter()
        .flat_map(|bar| {
            bar.prices()
                .into_iter()
                .filter(|(_, value)| *value < 0.0)
                .map(move |(name, value)| format!("{}: {name}={value}", day(bar.date)))
        })
        .collect()
}

/// Prices above `factor` times their column's `quantile`.
pub(super) fn price_outliers(bars: &[DailyBar], quantile: f64, factor: f64) -> Vec<String> {
    let mut offenders = Vec::new();
    for column in 0..4 {
        let values: Vec<f64> = bars.iter().map(|bar| bar.prices()[column].1).collect();
        let Some(threshold) = percentile(&values, quantile).map(|p| p * factor) else {
            continue;
        };
        for bar in bars {
            let (name, value) = bar.prices()[column];
            if value > threshold {
                offenders.push(format!(
                    "{}: {name}={value} exceeds {threshold}",
                    day(bar.date)
                ));
            }
        }
    }
    offenders
}

/// Bars where `low > high` or open/close fall outside `[low, high]`.
pub(super) fn inconsistent_prices(bars: &[DailyBar]) -> Vec<String> {
    bars.iter()
        .filter(|bar| {
            let range = bar.low..=bar.high;
            bar.low > bar.high || !range.contains(&bar.open) || !range.contains(&bar.close)
        })
        .map(|bar| day(bar.date))
        .collect()
}

/// Quantile `q` in `[0, 1]` with linear interpolation between closest ranks.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}
