use thiserror::Error;

use crate::env::MissingEnvVarError;

/// Errors related to application configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable required by the application is not set.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// A setting is present but its value cannot be used.
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },

    /// The resolved configuration as a whole is inconsistent.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// A configuration file could not be read or parsed.
    #[error("Failed to load configuration file: {0}")]
    File(String),
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidValue`].
    pub fn invalid_value(
        name: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

impl From<MissingEnvVarError> for ConfigError {
    fn from(err: MissingEnvVarError) -> Self {
        Self::MissingEnvVar(err.0)
    }
}
