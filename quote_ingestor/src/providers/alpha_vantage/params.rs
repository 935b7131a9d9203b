use secrecy::{ExposeSecret, SecretString};

use crate::models::request_params::OutputSize;

/// API function for daily, unadjusted series.
pub const FUNCTION: &str = "TIME_SERIES_DAILY";

/// Alpha Vantage query for one symbol's daily series.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DailyQuery<'a> {
    pub symbol: &'a str,
    pub output_size: OutputSize,
}

impl DailyQuery<'_> {
    /// Query-string pairs, API key included.
    pub fn to_pairs(&self, api_key: &SecretString) -> Vec<(&'static str, String)> {
        vec![
            ("function", FUNCTION.to_string()),
            ("symbol", self.symbol.to_string()),
            ("apikey", api_key.expose_secret().to_string()),
            ("outputsize", self.output_size.as_str().to_string()),
            ("datatype", "json".to_string()),
        ]
    }
}
