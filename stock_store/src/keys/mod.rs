//! Object key layouts, past and present.
//!
//! Every stored object is addressed by a path-like key whose *shape* tells us
//! which layout generation wrote it. Three shapes exist in the wild:
//!
//! | version  | shape                                                                  |
//! |----------|------------------------------------------------------------------------|
//! | `v1`     | `stock-data*/{symbol}/{latest,full,metadata}.json`, `.../daily/{YYYY-MM-DD}.json` |
//! | `lambda` | `daily/{symbol}/{YYYY-MM-DD}.json`                                     |
//! | `v2`     | `{test,prod}/stock/{raw,processed}/{symbol}/{latest,full,metadata}.json`, `.../daily/{YYYY}/{MM}/{DD}.json` |
//!
//! `v2` is the layout new data is written under ([`CURRENT_VERSION`]).
//!
//! Entrypoints:
//! - Build current keys: [`key_for`], [`metadata_key_for`]
//! - Recognise any key: [`decode`] (total, unknown shapes become [`ParsedKey::Unknown`])
//! - Rewrite between layouts: [`convert`]

mod convert;
mod parse;

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use convert::{ConvertOptions, Conversion, convert, convert_parsed};
pub use parse::decode;

/// The layout new keys are written under.
pub const CURRENT_VERSION: KeyVersion = KeyVersion::V2;

/// Default prefix used when rewriting keys into the `v1` layout.
pub const DEFAULT_V1_PREFIX: &str = "stock-data-mock";

/// Deployment environment a `v2` key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Mock / test data.
    Test,
    /// Production data.
    Prod,
}

impl Environment {
    /// Path segment for this environment.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Prod => "prod",
        }
    }
}

/// Whether an object holds provider data as fetched or a derived form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    /// Data as fetched from the provider (after validation).
    #[default]
    Raw,
    /// Derived data.
    Processed,
}

impl DataKind {
    /// Path segment for this data kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Processed => "processed",
        }
    }
}

/// What an object under a symbol holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    /// The most recent bar.
    Latest,
    /// The whole series.
    Full,
    /// A one-day snapshot.
    Daily,
    /// The summary record.
    Metadata,
}

impl KeyType {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Full => "full",
            Self::Daily => "daily",
            Self::Metadata => "metadata",
        }
    }
}

/// Layout generation of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyVersion {
    /// Flat `{prefix}/{symbol}/...` layout.
    V1,
    /// Hierarchical `{env}/stock/{kind}/{symbol}/...` layout.
    V2,
    /// `daily/{symbol}/{date}.json`, written by the scheduled function deployment.
    Lambda,
    /// Not a shape this crate recognises.
    Unknown,
}

impl KeyVersion {
    /// Lowercase name (`v1`, `v2`, `lambda`, `unknown`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
            Self::Lambda => "lambda",
            Self::Unknown => "unknown",
        }
    }
}

/// The semantic object a key points at, independent of layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyTarget {
    /// `latest.json`
    Latest,
    /// `full.json`
    Full,
    /// A daily snapshot for the given date.
    Daily(NaiveDate),
    /// `metadata.json`
    Metadata,
}

impl KeyTarget {
    /// The key type without the date.
    pub fn key_type(self) -> KeyType {
        match self {
            Self::Latest => KeyType::Latest,
            Self::Full => KeyType::Full,
            Self::Daily(_) => KeyType::Daily,
            Self::Metadata => KeyType::Metadata,
        }
    }

    /// The snapshot date, for daily targets.
    pub fn date(self) -> Option<NaiveDate> {
        match self {
            Self::Daily(date) => Some(date),
            _ => None,
        }
    }
}

/// A decoded key. Produced by [`decode`]; [`ParsedKey::encode`] is its inverse.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParsedKey {
    /// `{prefix}/{symbol}/...`
    V1 {
        /// Top-level prefix, always starting with `stock-data`.
        prefix: String,
        /// Ticker symbol.
        symbol: String,
        /// Object within the symbol.
        target: KeyTarget,
    },
    /// `{env}/stock/{kind}/{symbol}/...`
    V2 {
        /// Deployment environment.
        environment: Environment,
        /// Raw or processed.
        data_kind: DataKind,
        /// Ticker symbol.
        symbol: String,
        /// Object within the symbol.
        target: KeyTarget,
    },
    /// `daily/{symbol}/{date}.json`
    Lambda {
        /// Ticker symbol.
        symbol: String,
        /// Snapshot date.
        date: NaiveDate,
    },
    /// Anything else, carried verbatim.
    Unknown {
        /// The key as given.
        key: String,
    },
}

impl ParsedKey {
    /// Layout generation of this key.
    pub fn version(&self) -> KeyVersion {
        match self {
            Self::V1 { .. } => KeyVersion::V1,
            Self::V2 { .. } => KeyVersion::V2,
            Self::Lambda { .. } => KeyVersion::Lambda,
            Self::Unknown { .. } => KeyVersion::Unknown,
        }
    }

    /// Ticker symbol, if recognised.
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::V1 { symbol, .. } | Self::V2 { symbol, .. } | Self::Lambda { symbol, .. } => {
                Some(symbol)
            }
            Self::Unknown { .. } => None,
        }
    }

    /// Semantic target, if recognised.
    pub fn target(&self) -> Option<KeyTarget> {
        match self {
            Self::V1 { target, .. } | Self::V2 { target, .. } => Some(*target),
            Self::Lambda { date, .. } => Some(KeyTarget::Daily(*date)),
            Self::Unknown { .. } => None,
        }
    }

    /// Key type, if recognised.
    pub fn key_type(&self) -> Option<KeyType> {
        self.target().map(KeyTarget::key_type)
    }

    /// Snapshot date for daily keys.
    pub fn date(&self) -> Option<NaiveDate> {
        self.target().and_then(KeyTarget::date)
    }

    /// Environment, only known for `v2` keys.
    pub fn environment(&self) -> Option<Environment> {
        match self {
            Self::V2 { environment, .. } => Some(*environment),
            _ => None,
        }
    }

    /// Data kind, only known for `v2` keys.
    pub fn data_kind(&self) -> Option<DataKind> {
        match self {
            Self::V2 { data_kind, .. } => Some(*data_kind),
            _ => None,
        }
    }

    /// Render the key string for this layout.
    pub fn encode(&self) -> String {
        parse::encode(self)
    }
}

/// Current-layout key for a symbol's latest, full or daily object.
///
/// `is_latest` takes precedence over `date`; with neither, the full-history key
/// is returned.
pub fn key_for(
    symbol: &str,
    data_kind: DataKind,
    date: Option<NaiveDate>,
    is_latest: bool,
    environment: Environment,
) -> String {
    let target = match (is_latest, date) {
        (true, _) => KeyTarget::Latest,
        (false, Some(date)) => KeyTarget::Daily(date),
        (false, None) => KeyTarget::Full,
    };
    ParsedKey::V2 {
        environment,
        data_kind,
        symbol: symbol.to_string(),
        target,
    }
    .encode()
}

/// Current-layout key for a symbol's metadata record.
pub fn metadata_key_for(symbol: &str, data_kind: DataKind, environment: Environment) -> String {
    ParsedKey::V2 {
        environment,
        data_kind,
        symbol: symbol.to_string(),
        target: KeyTarget::Metadata,
    }
    .encode()
}

/// Errors raised when rewriting keys between layouts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// The source key does not match any known layout.
    #[error("unrecognized key format: {key}")]
    UnrecognizedKey {
        /// The offending key.
        key: String,
    },

    /// The source key lacks information the target layout needs.
    #[error("cannot convert {key} to {target}: {reason}")]
    UnsupportedConversion {
        /// The source key.
        key: String,
        /// Requested layout.
        target: KeyVersion,
        /// Why the conversion is impossible.
        reason: String,
    },
}

/// A string did not name a known enum value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} {value:?} (expected one of: {expected})")]
pub struct ParseKeyPartError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

macro_rules! str_enum_impls {
    ($ty:ty, $kind:literal, $expected:literal, { $($text:literal => $variant:expr),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = ParseKeyPartError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($variant),)+
                    _ => Err(ParseKeyPartError {
                        kind: $kind,
                        value: s.to_string(),
                        expected: $expected,
                    }),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum_impls!(Environment, "environment", "test, prod", {
    "test" => Environment::Test,
    "prod" => Environment::Prod,
});
str_enum_impls!(DataKind, "data kind", "raw, processed", {
    "raw" => DataKind::Raw,
    "processed" => DataKind::Processed,
});
str_enum_impls!(KeyType, "key type", "latest, full, daily, metadata", {
    "latest" => KeyType::Latest,
    "full" => KeyType::Full,
    "daily" => KeyType::Daily,
    "metadata" => KeyType::Metadata,
});
str_enum_impls!(KeyVersion, "key version", "v1, v2, lambda, unknown", {
    "v1" => KeyVersion::V1,
    "v2" => KeyVersion::V2,
    "lambda" => KeyVersion::Lambda,
    "unknown" => KeyVersion::Unknown,
});
