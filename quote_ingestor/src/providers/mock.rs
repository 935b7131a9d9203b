//! Offline provider producing Alpha Vantage shaped documents.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use indexmap::IndexMap;
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde_json::Value;
use shared_utils::event_log::EventLog;

use crate::{
    models::{request_params::OutputSize, series::RawSeries},
    providers::{
        ProviderError, QuoteProvider, SchemaChangedSnafu,
        alpha_vantage::response::{DailyDocument, EXPECTED_FIELDS, parse_body},
    },
};

const COMPACT_DAYS: u64 = 100;
const FULL_DAYS: u64 = 500;
const START_PRICE: f64 = 100.0;
const MIN_PRICE: f64 = 5.0;

/// Deterministic [`QuoteProvider`] that never touches the network.
///
/// Generates one calendar day per entry ending at `as_of`, following a seeded
/// random walk. The document is serialized and fed through the same parser as
/// real responses, and always passes the quality gate.
pub struct MockProvider {
    as_of: NaiveDate,
    seed: u64,
    log: Arc<dyn EventLog>,
}

impl MockProvider {
    /// Provider whose newest bar is dated `as_of`.
    pub fn new(as_of: NaiveDate, log: Arc<dyn EventLog>) -> Self {
        Self {
            as_of,
            seed: 42,
            log,
        }
    }

    /// Use `seed` for the random walk.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn rng_for(&self, symbol: &str) -> StdRng {
        let salt = symbol
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)));
        StdRng::seed_from_u64(self.seed ^ salt)
    }

    /// Build the raw document for `symbol`.
    pub fn document(&self, symbol: &str, output_size: OutputSize) -> DailyDocument {
        let days = match output_size {
            OutputSize::Compact => COMPACT_DAYS,
            OutputSize::Full => FULL_DAYS,
        };
        let mut rng = self.rng_for(symbol);
        let mut base = START_PRICE;
        let mut time_series = IndexMap::new();

        for offset in 0..days {
            let Some(date) = self.as_of.checked_sub_days(Days::new(offset)) else {
                break;
            };
            let open: f64 = (base + rng.random_range(-5.0..=5.0)).max(MIN_PRICE);
            let high = open * rng.random_range(1.0..=1.05);
            let low = open * rng.random_range(0.95..=1.0);
            let close = rng.random_range(low..=high);
            let volume: u64 = rng.random_range(1_000_000..10_000_000);
            base = close;

            let values = [
                format!("{open:.4}"),
                format!("{high:.4}"),
                format!("{low:.4}"),
                format!("{close:.4}"),
                volume.to_string(),
            ];
            let fields: IndexMap<String, Value> = EXPECTED_FIELDS
                .iter()
                .zip(values)
                .map(|(name, value)| (name.to_string(), Value::String(value)))
                .collect();
            time_series.insert(date.format("%Y-%m-%d").to_string(), fields);
        }

        let meta = IndexMap::from([
            (
                "1. Information".to_string(),
                Value::from("Daily Prices (open, high, low, close) and Volumes"),
            ),
            ("2. Symbol".to_string(), Value::from(symbol)),
            (
                "3. Last Refreshed".to_string(),
                Value::from(self.as_of.format("%Y-%m-%d").to_string()),
            ),
            ("4. Output Size".to_string(), Value::from(output_size.as_str())),
            ("5. Time Zone".to_string(), Value::from("US/Eastern")),
        ]);

        DailyDocument {
            meta: Some(meta),
            time_series: Some(time_series),
            ..Default::default()
        }
    }
}

#[async_trait]
impl QuoteProvider for MockProvider {
    async fn fetch_daily(
        &self,
        symbol: &str,
        output_size: OutputSize,
    ) -> Result<RawSeries, ProviderError> {
        self.log
            .info(&format!("using mock data for {symbol} (outputsize: {output_size})"));
        let body = serde_json::to_string(&self.document(symbol, output_size)).map_err(|err| {
            SchemaChangedSnafu {
                message: format!("failed to render mock document: {err}"),
            }
            .build()
        })?;
        parse_body(symbol, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_utils::event_log::MemoryLog;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[tokio::test]
    async fn sizes_and_dates() {
        let provider = MockProvider::new(as_of(), Arc::new(MemoryLog::new()));

        let compact = provider.fetch_daily("NVDA", OutputSize::Compact).await.unwrap();
        assert_eq!(compact.rows.len(), 100);
        assert_eq!(compact.rows[0].date, "2024-03-01");
        assert_eq!(compact.rows[1].date, "2024-02-29");
        assert_eq!(compact.last_refreshed.as_deref(), Some("2024-03-01"));

        let full = provider.fetch_daily("NVDA", OutputSize::Full).await.unwrap();
        assert_eq!(full.rows.len(), 500);
    }

    #[tokio::test]
    async fn same_seed_same_data_per_symbol() {
        let log: Arc<dyn EventLog> = Arc::new(MemoryLog::new());
        let a = MockProvider::new(as_of(), log.clone()).with_seed(7);
        let b = MockProvider::new(as_of(), log).with_seed(7);

        let nvda_a = a.fetch_daily("NVDA", OutputSize::Compact).await.unwrap();
        let nvda_b = b.fetch_daily("NVDA", OutputSize::Compact).await.unwrap();
        let aapl = a.fetch_daily("AAPL", OutputSize::Compact).await.unwrap();

        assert_eq!(nvda_a, nvda_b);
        assert_ne!(nvda_a.rows, aapl.rows);
    }
}
