use std::{num::NonZeroU32, sync::Arc, time::Duration};

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::Client;
use secrecy::SecretString;
use shared_utils::event_log::EventLog;
use snafu::ResultExt;

use crate::{
    models::{request_params::OutputSize, series::RawSeries},
    providers::{
        ClientBuildSnafu, ProviderError, QuoteProvider, TransportSnafu,
        alpha_vantage::{params::DailyQuery, response::parse_body},
        retry::RetryPolicy,
    },
};

/// Public Alpha Vantage query endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";

/// Per-request timeout unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for [`AlphaVantageProvider`].
#[derive(Debug)]
pub struct AlphaVantageConfig {
    /// API key, sent as the `apikey` query parameter.
    pub api_key: SecretString,
    /// Endpoint to query.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry behaviour for transport failures.
    pub retry: RetryPolicy,
    /// Client-side cap on requests per minute, if any.
    pub requests_per_minute: Option<NonZeroU32>,
}

impl AlphaVantageConfig {
    /// Defaults for everything but the key.
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            requests_per_minute: None,
        }
    }
}

/// [`QuoteProvider`] for Alpha Vantage's `TIME_SERIES_DAILY`.
pub struct AlphaVantageProvider {
    client: Client,
    base_url: String,
    api_key: SecretString,
    retry: RetryPolicy,
    limiter: Option<DefaultDirectRateLimiter>,
    log: Arc<dyn EventLog>,
}

impl AlphaVantageProvider {
    /// Creates a new Alpha Vantage provider.
    pub fn new(config: AlphaVantageConfig, log: Arc<dyn EventLog>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context(ClientBuildSnafu)?;

        let limiter = config
            .requests_per_minute
            .map(|rpm| RateLimiter::direct(Quota::per_minute(rpm)));

        Ok(Self {
            client,
            base_url: config.base_url,
            api_key: config.api_key,
            retry: config.retry,
            limiter,
            log,
        })
    }

    async fn fetch_once(
        &self,
        symbol: &str,
        output_size: OutputSize,
    ) -> Result<RawSeries, ProviderError> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let query = DailyQuery {
            symbol,
            output_size,
        }
        .to_pairs(&self.api_key);

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|err| transport_error(symbol, err))?;

        let status = response.status();
        if !status.is_success() {
            return TransportSnafu {
                message: format!("HTTP {status} for {symbol}"),
            }
            .fail();
        }

        let body = response
            .text()
            .await
            .map_err(|err| transport_error(symbol, err))?;
        parse_body(symbol, &body)
    }
}

/// Describe a reqwest failure without echoing the URL, which carries the API key.
fn transport_error(symbol: &str, err: reqwest::Error) -> ProviderError {
    let kind = if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect error"
    } else {
        "request error"
    };
    TransportSnafu {
        message: format!("{kind} for {symbol}: {}", err.without_url()),
    }
    .build()
}

#[async_trait]
impl QuoteProvider for AlphaVantageProvider {
    async fn fetch_daily(
        &self,
        symbol: &str,
        output_size: OutputSize,
    ) -> Result<RawSeries, ProviderError> {
        let raw = self
            .retry
            .run(self.log.as_ref(), symbol, |_| self.fetch_once(symbol, output_size))
            .await?;
        self.log
            .info(&format!("fetched {} rows for {symbol}", raw.rows.len()));
        Ok(raw)
    }
}
