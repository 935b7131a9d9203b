//! End-of-run notification.
//!
//! The job hands over which symbols succeeded and which failed; how that
//! reaches a person is up to the [`Notifier`] implementation.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use shared_utils::event_log::EventLog;

/// What a run achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Symbols whose `latest` object was written, in run order.
    pub succeeded: Vec<String>,
    /// Symbols that failed, in run order.
    pub failed: Vec<String>,
    /// Wall time of the whole run.
    pub duration: Duration,
}

impl RunSummary {
    /// Number of symbols that succeeded.
    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    /// Number of symbols that failed.
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// `true` when no symbol failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "succeeded={} failed={} duration={:.1}s",
            self.succeeded_count(),
            self.failed_count(),
            self.duration.as_secs_f64()
        )
    }
}

/// Receives the summary once a run has finished.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `summary`. Delivery problems are the notifier's own concern
    /// and never change the run's outcome.
    async fn notify(&self, summary: &RunSummary);
}

/// Reports the summary through an [`EventLog`]: info on success, error naming
/// the failed symbols otherwise.
pub struct LogNotifier {
    log: Arc<dyn EventLog>,
}

impl LogNotifier {
    pub fn new(log: Arc<dyn EventLog>) -> Self {
        Self { log }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, summary: &RunSummary) {
        if summary.is_success() {
            self.log
                .info(&format!("daily stock data fetch completed successfully: {summary}"));
        } else {
            self.log.error(&format!(
                "daily stock data fetch completed with {} failures ({}): {summary}",
                summary.failed_count(),
                summary.failed.join(", ")
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_utils::event_log::{LogLevel, MemoryLog};

    fn names(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn failures_are_reported_as_errors() {
        let log = Arc::new(MemoryLog::new());
        let notifier = LogNotifier::new(log.clone());

        notifier
            .notify(&RunSummary {
                succeeded: names(&["NVDA", "AAPL"]),
                failed: Vec::new(),
                duration: Duration::from_millis(2500),
            })
            .await;
        notifier
            .notify(&RunSummary {
                succeeded: names(&["NVDA"]),
                failed: names(&["MSFT", "TSLA"]),
                duration: Duration::from_secs(1),
            })
            .await;

        assert_eq!(
            log.messages(LogLevel::Info),
            vec!["daily stock data fetch completed successfully: succeeded=2 failed=0 duration=2.5s"]
        );
        assert_eq!(
            log.messages(LogLevel::Error),
            vec![
                "daily stock data fetch completed with 2 failures (MSFT, TSLA): \
                 succeeded=1 failed=2 duration=1.0s"
            ]
        );
    }
}
