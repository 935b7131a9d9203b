//! Provider abstraction for daily quote sources.
//!
//! This module defines the [`QuoteProvider`] trait, the single interface the
//! ingestion pipeline uses to obtain a symbol's daily series. Implementations:
//!
//! - [`AlphaVantageProvider`](alpha_vantage::AlphaVantageProvider): the
//!   `TIME_SERIES_DAILY` HTTP endpoint, with retry/backoff and an optional
//!   client-side rate limit.
//! - [`MockProvider`](mock::MockProvider): no network, deterministic
//!   synthetic data shaped like the real response.
//!
//! Both hand back a [`RawSeries`]; validation of the values themselves is the
//! [`QualityGate`](crate::quality::QualityGate)'s job.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use quote_ingestor::models::{request_params::OutputSize, series::RawSeries};
//! use quote_ingestor::providers::{ProviderError, QuoteProvider};
//!
//! struct EmptyProvider;
//!
//! #[async_trait]
//! impl QuoteProvider for EmptyProvider {
//!     async fn fetch_daily(
//!         &self,
//!         symbol: &str,
//!         _output_size: OutputSize,
//!     ) -> Result<RawSeries, ProviderError> {
//!         Ok(RawSeries { symbol: symbol.to_string(), ..Default::default() })
//!     }
//! }
//! ```

pub mod alpha_vantage;
pub mod mock;
pub mod retry;

use async_trait::async_trait;
use snafu::{Backtrace, Snafu};

use crate::models::{request_params::OutputSize, series::RawSeries};

/// Fetches the daily series for one symbol.
///
/// Object safe; the pipeline holds an `Arc<dyn QuoteProvider>` and never
/// knows which implementation it was given.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Fetch `symbol`'s daily bars.
    ///
    /// # Returns
    ///
    /// * `Ok(RawSeries)` - rows as delivered, possibly empty.
    /// * `Err(ProviderError)` - transport failure after retries, or a response
    ///   whose shape no longer matches what we parse.
    async fn fetch_daily(
        &self,
        symbol: &str,
        output_size: OutputSize,
    ) -> Result<RawSeries, ProviderError>;
}

/// Errors that can occur within a [`QuoteProvider`] implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// Network-level failure: connect error, timeout or non-2xx status. Retryable.
    #[snafu(display("transport failure: {message}"))]
    Transport {
        message: String,
        backtrace: Backtrace,
    },

    /// The response no longer has the expected shape. Never retried.
    #[snafu(display("API specification may have changed: {message}"))]
    SchemaChanged {
        message: String,
        backtrace: Backtrace,
    },

    /// Failed to build the HTTP client.
    #[snafu(display("failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },
}

impl ProviderError {
    /// Whether retrying the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}
