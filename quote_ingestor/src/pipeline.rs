//! Daily ingestion job: fetch, validate and store each symbol in turn.
//!
//! For every symbol the job
//!
//! 1. fetches the raw series from its [`QuoteProvider`],
//! 2. runs it through the [`QualityGate`],
//! 3. writes the `latest` object. This write is required; if it fails the
//!    symbol fails,
//! 4. writes the daily snapshot for the latest date, the `full` history and
//!    the metadata record. These are best effort: a failure is logged and kept
//!    as a warning on the symbol's status, and the symbol still succeeds.
//!
//! With [`IngestSettings::backfill_daily`] set, step 4 also writes a daily
//! snapshot for every older bar, which turns a `full` fetch into a historical
//! backfill.
//!
//! Every write goes through [`AtomicStore`], so readers never see a partial
//! object. Symbols are independent; one failing never stops the others.

use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use shared_utils::event_log::EventLog;
use stock_store::{
    atomic::{AtomicStore, AtomicUpdateError},
    keys::{DataKind, Environment, key_for, metadata_key_for},
};
use thiserror::Error;

use crate::{
    io::payload::{MetadataRecord, SeriesPayload},
    models::{request_params::OutputSize, series::Series},
    notify::RunSummary,
    providers::{ProviderError, QuoteProvider},
    quality::{QualityGate, RejectReason, Rejection},
};

/// Where and how much to ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSettings {
    /// Environment segment of every written key.
    pub environment: Environment,
    /// Data kind segment of every written key.
    pub data_kind: DataKind,
    /// History requested from the provider.
    pub output_size: OutputSize,
    /// Write a daily snapshot for every bar, not only the newest one.
    pub backfill_daily: bool,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            environment: Environment::Prod,
            data_kind: DataKind::Raw,
            output_size: OutputSize::Compact,
            backfill_daily: false,
        }
    }
}

/// Why a symbol was not ingested.
#[derive(Debug, Error)]
pub enum SymbolError {
    /// The provider call failed, after any retries.
    #[error("fetch failed: {0}")]
    Fetch(#[from] ProviderError),

    /// The series did not pass the quality gate; nothing was written.
    #[error("quality check failed: {0}")]
    Rejected(#[from] Rejection),

    /// The `latest` object could not be written.
    #[error("store write failed: {0}")]
    StoreWriteFailed(#[from] AtomicUpdateError),
}

/// Outcome for one symbol.
#[derive(Debug)]
pub enum SymbolStatus {
    /// The `latest` object was written.
    Succeeded {
        /// Date of the newest bar.
        latest_date: NaiveDate,
        /// Bars that passed the gate.
        data_points: usize,
        /// Best-effort writes that failed.
        warnings: Vec<String>,
    },
    /// Nothing authoritative was written.
    Failed(SymbolError),
}

impl SymbolStatus {
    /// `true` for [`SymbolStatus::Succeeded`], warnings or not.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

impl fmt::Display for SymbolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded {
                latest_date,
                warnings,
                ..
            } if warnings.is_empty() => write!(f, "SUCCESS ({latest_date})"),
            Self::Succeeded {
                latest_date,
                warnings,
                ..
            } => write!(f, "SUCCESS ({latest_date}, {} warnings)", warnings.len()),
            Self::Failed(err) => write!(f, "FAILURE: {err}"),
        }
    }
}

/// Per-symbol results of one run, in the order symbols were given.
#[derive(Debug)]
pub struct JobReport {
    /// Status per distinct symbol.
    pub results: IndexMap<String, SymbolStatus>,
    /// Wall time of the run.
    pub duration: Duration,
}

impl JobReport {
    /// Number of symbols that succeeded.
    pub fn succeeded(&self) -> usize {
        self.results.values().filter(|s| s.is_success()).count()
    }

    /// Number of symbols that failed.
    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// Symbol lists handed to a [`Notifier`](crate::notify::Notifier).
    pub fn summary(&self) -> RunSummary {
        let (succeeded, failed): (Vec<_>, Vec<_>) = self
            .results
            .iter()
            .partition(|(_, status)| status.is_success());
        RunSummary {
            succeeded: succeeded.into_iter().map(|(s, _)| s.clone()).collect(),
            failed: failed.into_iter().map(|(s, _)| s.clone()).collect(),
            duration: self.duration,
        }
    }

    /// `0` when every symbol succeeded, `1` otherwise.
    pub fn exit_code(&self) -> u8 {
        u8::from(self.failed() > 0)
    }
}

/// Runs the fetch, gate and store steps for a list of symbols.
pub struct IngestJob {
    provider: Arc<dyn QuoteProvider>,
    gate: QualityGate,
    atomic: AtomicStore,
    settings: IngestSettings,
    log: Arc<dyn EventLog>,
}

impl IngestJob {
    /// Wire a job from its parts. Nothing runs until [`IngestJob::run`].
    pub fn new(
        provider: Arc<dyn QuoteProvider>,
        gate: QualityGate,
        atomic: AtomicStore,
        settings: IngestSettings,
        log: Arc<dyn EventLog>,
    ) -> Self {
        Self {
            provider,
            gate,
            atomic,
            settings,
            log,
        }
    }

    /// Ingest each symbol once, in order. Repeated symbols are processed once.
    pub async fn run<S: AsRef<str>>(&self, symbols: &[S]) -> JobReport {
        let started = Instant::now();
        let mut results = IndexMap::new();

        self.log
            .info(&format!("starting daily fetch for {} symbols", symbols.len()));

        for symbol in symbols {
            let symbol = symbol.as_ref();
            if results.contains_key(symbol) {
                continue;
            }
            let status = match self.ingest_symbol(symbol).await {
                Ok(status) => status,
                Err(err) => {
                    self.log.error(&format!("failed to process {symbol}: {err}"));
                    SymbolStatus::Failed(err)
                }
            };
            results.insert(symbol.to_string(), status);
        }

        let report = JobReport {
            results,
            duration: started.elapsed(),
        };
        self.log.info(&format!(
            "daily fetch finished: {} succeeded, {} failed in {:.1}s",
            report.succeeded(),
            report.failed(),
            report.duration.as_secs_f64()
        ));
        report
    }

    /// Fetch, validate and store one symbol.
    pub async fn ingest_symbol(&self, symbol: &str) -> Result<SymbolStatus, SymbolError> {
        let raw = self
            .provider
            .fetch_daily(symbol, self.settings.output_size)
            .await?;
        let series = self.gate.validate_and_transform(raw)?;
        self.store_series(&series, Utc::now()).await
    }

    async fn store_series(
        &self,
        series: &Series,
        now: DateTime<Utc>,
    ) -> Result<SymbolStatus, SymbolError> {
        let IngestSettings {
            environment,
            data_kind,
            backfill_daily,
            ..
        } = self.settings;
        let symbol = series.symbol.as_str();

        let (Some(latest), Some(metadata)) =
            (series.latest(), MetadataRecord::from_series(series, now))
        else {
            return Err(SymbolError::Rejected(Rejection {
                symbol: symbol.to_string(),
                reason: RejectReason::EmptySeries,
                detail: Vec::new(),
            }));
        };
        let latest_date = latest.date;
        let latest_payload = SeriesPayload::latest(series, now);

        let latest_key = key_for(symbol, data_kind, None, true, environment);
        self.atomic
            .atomic_json_update(&latest_key, &latest_payload)
            .await?;

        let mut warnings = Vec::new();

        let daily_key = key_for(symbol, data_kind, Some(latest_date), false, environment);
        self.best_effort(&daily_key, &latest_payload, "daily data", &mut warnings)
            .await;

        if backfill_daily {
            self.log.info(&format!(
                "saving {} older daily snapshots for {symbol}",
                series.bars.len() - 1
            ));
            for bar in &series.bars[1..] {
                let key = key_for(symbol, data_kind, Some(bar.date), false, environment);
                let payload = SeriesPayload::day(symbol, bar, now);
                let what = format!("daily data for {}", bar.date);
                self.best_effort(&key, &payload, &what, &mut warnings).await;
            }
        }

        let full_key = key_for(symbol, data_kind, None, false, environment);
        let full_payload = SeriesPayload::full(series, now);
        self.best_effort(&full_key, &full_payload, "full data", &mut warnings)
            .await;

        let metadata_key = metadata_key_for(symbol, data_kind, environment);
        self.best_effort(&metadata_key, &metadata, "metadata", &mut warnings)
            .await;

        self.log.info(&format!(
            "processed {symbol} for {latest_date} ({} bars)",
            series.bars.len()
        ));
        Ok(SymbolStatus::Succeeded {
            latest_date,
            data_points: series.bars.len(),
            warnings,
        })
    }

    async fn best_effort<T>(&self, key: &str, value: &T, what: &str, warnings: &mut Vec<String>)
    where
        T: Serialize + Sync,
    {
        if let Err(err) = self.atomic.atomic_json_update(key, value).await {
            let message = format!("failed to save {what} at {key}, latest data was saved: {err}");
            self.log.warn(&message);
            warnings.push(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(statuses: Vec<(&str, SymbolStatus)>) -> JobReport {
        JobReport {
            results: statuses
                .into_iter()
                .map(|(s, status)| (s.to_string(), status))
                .collect(),
            duration: Duration::from_millis(1500),
        }
    }

    fn ok() -> SymbolStatus {
        SymbolStatus::Succeeded {
            latest_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            data_points: 100,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn exit_code_reflects_failures() {
        assert_eq!(report(vec![("NVDA", ok()), ("AAPL", ok())]).exit_code(), 0);

        let rejected = SymbolStatus::Failed(SymbolError::Rejected(Rejection {
            symbol: "AAPL".into(),
            reason: RejectReason::ZeroVolume,
            detail: vec!["2024-01-02".into()],
        }));
        let mixed = report(vec![("NVDA", ok()), ("AAPL", rejected)]);
        assert_eq!(mixed.exit_code(), 1);

        let summary = mixed.summary();
        assert_eq!(summary.succeeded, vec!["NVDA"]);
        assert_eq!(summary.failed, vec!["AAPL"]);
        assert_eq!((summary.succeeded_count(), summary.failed_count()), (1, 1));
        assert_eq!(summary.duration, Duration::from_millis(1500));
        assert!(mixed.results["AAPL"].to_string().starts_with("FAILURE: quality check failed"));
    }

    #[test]
    fn empty_run_succeeds() {
        assert_eq!(report(Vec::new()).exit_code(), 0);
    }
}
