//! Alpha Vantage `TIME_SERIES_DAILY` provider.

pub mod params;
pub mod provider;
pub mod response;

pub use provider::{AlphaVantageConfig, AlphaVantageProvider, DEFAULT_BASE_URL};
