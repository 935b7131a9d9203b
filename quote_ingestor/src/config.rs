//! Job configuration, resolved and validated once at startup.
//!
//! Settings come either from environment variables ([`JobConfig::from_env`])
//! or from a TOML document ([`JobConfig::from_toml_str`]). Both go through the
//! same [`ConfigFile`] shape and the same validation, so the rest of the crate
//! only ever sees a complete [`JobConfig`].
//!
//! | variable | TOML key | default |
//! |---|---|---|
//! | `ALPHA_VANTAGE_API_KEY` | `api_key` | required unless mock mode |
//! | `ALPHA_VANTAGE_BASE_URL` | `base_url` | [`DEFAULT_BASE_URL`] |
//! | `STOCK_SYMBOLS` | `symbols` | `NVDA` |
//! | `S3_BUCKET` | `bucket` | required |
//! | `STORE_ROOT` | `store_root` | `./data` |
//! | `MOCK_MODE` | `mock_mode` | `false` |
//! | `ENVIRONMENT` | `environment` | `test` in mock mode, else `prod` |
//! | `DATA_KIND` | `data_kind` | `raw` |
//! | `OUTPUT_SIZE` | `output_size` | `compact` |
//! | `BACKFILL_DAILY` | `backfill_daily` | `false` |
//! | `REQUEST_TIMEOUT_SECS` | `request_timeout_secs` | `10` |
//! | `MAX_RETRIES` | `max_retries` | `3` |
//! | `REQUESTS_PER_MINUTE` | `requests_per_minute` | `5`, `0` disables |

use std::{num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use nonzero_ext::nonzero;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use shared_utils::{
    config::ConfigError,
    env::{get_env_flag, get_env_parsed, get_env_var_or},
};
use stock_store::keys::{DataKind, Environment};

use crate::{
    models::request_params::OutputSize,
    pipeline::IngestSettings,
    providers::{
        alpha_vantage::{AlphaVantageConfig, DEFAULT_BASE_URL},
        retry::RetryPolicy,
    },
};

pub const API_KEY_VAR: &str = "ALPHA_VANTAGE_API_KEY";
pub const BASE_URL_VAR: &str = "ALPHA_VANTAGE_BASE_URL";
pub const SYMBOLS_VAR: &str = "STOCK_SYMBOLS";
pub const BUCKET_VAR: &str = "S3_BUCKET";
pub const STORE_ROOT_VAR: &str = "STORE_ROOT";
pub const MOCK_MODE_VAR: &str = "MOCK_MODE";
pub const ENVIRONMENT_VAR: &str = "ENVIRONMENT";
pub const DATA_KIND_VAR: &str = "DATA_KIND";
pub const OUTPUT_SIZE_VAR: &str = "OUTPUT_SIZE";
pub const BACKFILL_VAR: &str = "BACKFILL_DAILY";
pub const TIMEOUT_VAR: &str = "REQUEST_TIMEOUT_SECS";
pub const MAX_RETRIES_VAR: &str = "MAX_RETRIES";
pub const RATE_LIMIT_VAR: &str = "REQUESTS_PER_MINUTE";

const DEFAULT_SYMBOLS: &str = "NVDA";
const DEFAULT_STORE_ROOT: &str = "./data";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Alpha Vantage's free tier allows five calls a minute.
const DEFAULT_REQUESTS_PER_MINUTE: NonZeroU32 = nonzero!(5u32);

/// Unvalidated settings as they appear in a TOML file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub symbols: Option<Vec<String>>,
    pub bucket: Option<String>,
    pub store_root: Option<PathBuf>,
    pub mock_mode: Option<bool>,
    pub environment: Option<String>,
    pub data_kind: Option<String>,
    pub output_size: Option<String>,
    pub backfill_daily: Option<bool>,
    pub request_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub requests_per_minute: Option<u32>,
}

/// Fully resolved job settings.
#[derive(Debug)]
pub struct JobConfig {
    /// `None` only in mock mode.
    pub api_key: Option<SecretString>,
    pub base_url: String,
    /// Trimmed, non-empty, in the order given.
    pub symbols: Vec<String>,
    pub bucket: String,
    /// Directory under which the bucket's objects are kept.
    pub store_root: PathBuf,
    pub mock_mode: bool,
    pub ingest: IngestSettings,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// `None` disables client-side rate limiting.
    pub requests_per_minute: Option<NonZeroU32>,
}

impl JobConfig {
    /// Resolve from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let text = |name: &str| {
            let value = get_env_var_or(name, "");
            (!value.trim().is_empty()).then_some(value)
        };

        let file = ConfigFile {
            api_key: text(API_KEY_VAR),
            base_url: text(BASE_URL_VAR),
            symbols: text(SYMBOLS_VAR).map(|s| s.split(',').map(str::to_string).collect()),
            bucket: text(BUCKET_VAR),
            store_root: text(STORE_ROOT_VAR).map(PathBuf::from),
            mock_mode: Some(get_env_flag(MOCK_MODE_VAR)),
            environment: text(ENVIRONMENT_VAR),
            data_kind: text(DATA_KIND_VAR),
            output_size: text(OUTPUT_SIZE_VAR),
            backfill_daily: Some(get_env_flag(BACKFILL_VAR)),
            request_timeout_secs: get_env_parsed(TIMEOUT_VAR)?,
            max_retries: get_env_parsed(MAX_RETRIES_VAR)?,
            requests_per_minute: get_env_parsed(RATE_LIMIT_VAR)?,
        };
        file.resolve()
    }

    /// Resolve from a TOML document. Unknown keys are rejected.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            toml::from_str(toml_str).map_err(|err| ConfigError::File(err.to_string()))?;
        file.resolve()
    }

    /// Read a TOML file from disk and resolve it.
    pub fn from_toml_path(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::File(format!("{}: {err}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Provider settings for the live API.
    ///
    /// Fails with [`ConfigError::MissingEnvVar`] when no key was configured.
    pub fn alpha_vantage(&self) -> Result<AlphaVantageConfig, ConfigError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar(API_KEY_VAR.to_string()))?;
        Ok(AlphaVantageConfig {
            api_key: SecretString::from(api_key.expose_secret().to_owned()),
            base_url: self.base_url.clone(),
            timeout: self.timeout,
            retry: self.retry,
            requests_per_minute: self.requests_per_minute,
        })
    }
}

impl ConfigFile {
    /// Apply defaults and validate.
    pub fn resolve(self) -> Result<JobConfig, ConfigError> {
        let mock_mode = self.mock_mode.unwrap_or(false);

        let api_key = self
            .api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        if api_key.is_none() && !mock_mode {
            return Err(ConfigError::MissingEnvVar(API_KEY_VAR.to_string()));
        }

        let symbols: Vec<String> = self
            .symbols
            .unwrap_or_else(|| vec![DEFAULT_SYMBOLS.to_string()])
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if symbols.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "{SYMBOLS_VAR} must name at least one symbol"
            )));
        }

        let bucket = self
            .bucket
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(BUCKET_VAR.to_string()))?;

        // Mock data never lands under the prod prefix unless asked for.
        let default_environment = if mock_mode {
            Environment::Test
        } else {
            Environment::Prod
        };
        let ingest = IngestSettings {
            environment: parse_or(ENVIRONMENT_VAR, self.environment, default_environment)?,
            data_kind: parse_or(DATA_KIND_VAR, self.data_kind, DataKind::Raw)?,
            output_size: parse_or(OUTPUT_SIZE_VAR, self.output_size, OutputSize::Compact)?,
            backfill_daily: self.backfill_daily.unwrap_or(false),
        };

        let timeout_secs = self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                TIMEOUT_VAR,
                "0",
                "timeout must be at least one second",
            ));
        }

        let retry = RetryPolicy {
            max_retries: self
                .max_retries
                .unwrap_or(RetryPolicy::default().max_retries),
            ..RetryPolicy::default()
        };

        let requests_per_minute = match self.requests_per_minute {
            None => Some(DEFAULT_REQUESTS_PER_MINUTE),
            Some(n) => NonZeroU32::new(n),
        };

        Ok(JobConfig {
            api_key: api_key.map(SecretString::from),
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            symbols,
            bucket,
            store_root: self
                .store_root
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_ROOT)),
            mock_mode,
            ingest,
            timeout: Duration::from_secs(timeout_secs),
            retry,
            requests_per_minute,
        })
    }
}

fn parse_or<T>(name: &str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|err: T::Err| ConfigError::invalid_value(name, raw.clone(), err.to_string())),
    }
}
