//! Shape of the `TIME_SERIES_DAILY` JSON document and its conversion to a
//! [`RawSeries`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    models::series::{RawRow, RawSeries},
    providers::{ProviderError, SchemaChangedSnafu},
};

/// Container holding one entry per trading day.
pub const TIME_SERIES_KEY: &str = "Time Series (Daily)";

/// Exact field set every day entry must expose.
pub const EXPECTED_FIELDS: [&str; 5] = ["1. open", "2. high", "3. low", "4. close", "5. volume"];

const LAST_REFRESHED_KEY: &str = "3. Last Refreshed";

/// The parts of a daily response we read.
///
/// Maps are [`IndexMap`]s so the document order survives: the first day entry
/// is the sample whose field set is checked.
#[derive(Deserialize, Serialize, Debug, Default)]
pub struct DailyDocument {
    #[serde(rename = "Meta Data", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<IndexMap<String, Value>>,
    #[serde(rename = "Time Series (Daily)", default, skip_serializing_if = "Option::is_none")]
    pub time_series: Option<IndexMap<String, IndexMap<String, Value>>>,
    #[serde(rename = "Note", default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(rename = "Information", default, skip_serializing_if = "Option::is_none")]
    pub information: Option<String>,
    #[serde(rename = "Error Message", default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl DailyDocument {
    fn provider_messages(&self) -> Vec<&str> {
        [&self.error_message, &self.note, &self.information]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect()
    }
}

/// Parse and validate a response body.
pub fn parse_body(symbol: &str, body: &str) -> Result<RawSeries, ProviderError> {
    let document: DailyDocument = serde_json::from_str(body).map_err(|err| {
        SchemaChangedSnafu {
            message: format!("unparseable response for {symbol}: {err}"),
        }
        .build()
    })?;
    into_raw_series(symbol, document)
}

/// Validate the document's shape and flatten it into rows.
pub fn into_raw_series(symbol: &str, document: DailyDocument) -> Result<RawSeries, ProviderError> {
    let messages = document.provider_messages().join("; ");
    let Some(time_series) = document.time_series else {
        let mut message = format!("'{TIME_SERIES_KEY}' key not found for {symbol}");
        if !messages.is_empty() {
            message.push_str(&format!(" (provider said: {messages})"));
        }
        return SchemaChangedSnafu { message }.fail();
    };

    if let Some((sample_date, sample)) = time_series.first() {
        let mut actual: Vec<&str> = sample.keys().map(String::as_str).collect();
        actual.sort_unstable();
        if actual != EXPECTED_FIELDS {
            return SchemaChangedSnafu {
                message: format!(
                    "response format change detected for {symbol} on {sample_date}: \
                     expected {EXPECTED_FIELDS:?}, got {actual:?}"
                ),
            }
            .fail();
        }
    }

    let last_refreshed = document
        .meta
        .as_ref()
        .and_then(|meta| meta.get(LAST_REFRESHED_KEY))
        .and_then(field_text);

    let rows = time_series
        .into_iter()
        .map(|(date, fields)| RawRow {
            date,
            open: fields.get(EXPECTED_FIELDS[0]).and_then(field_text),
            high: fields.get(EXPECTED_FIELDS[1]).and_then(field_text),
            low: fields.get(EXPECTED_FIELDS[2]).and_then(field_text),
            close: fields.get(EXPECTED_FIELDS[3]).and_then(field_text),
            volume: fields.get(EXPECTED_FIELDS[4]).and_then(field_text),
        })
        .collect();

    Ok(RawSeries {
        symbol: symbol.to_string(),
        last_refreshed,
        rows,
    })
}

/// Values are strings on the wire; numbers are tolerated, `null` means missing.
fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
