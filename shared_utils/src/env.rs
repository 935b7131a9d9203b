use std::str::FromStr;

use thiserror::Error;

use crate::config::ConfigError;

/// An environment variable required by the application is not set.
#[derive(Debug, Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVarError(pub String);

/// Reads an environment variable, returning a structured error if it's missing.
///
/// This is a thin wrapper around `std::env::var` that provides a more
/// ergonomic and specific error type for missing variables.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, MissingEnvVarError> {
    std::env::var(name).map_err(|_| MissingEnvVarError(name.to_string()))
}

/// Reads an environment variable, falling back to `default` when unset.
pub fn get_env_var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Reads a boolean flag. `true`, `1` and `yes` (any case) are truthy; unset is `false`.
pub fn get_env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Reads and parses an optional environment variable.
///
/// Returns `Ok(None)` when the variable is unset or blank, and
/// [`ConfigError::InvalidValue`] when it is set but does not parse as `T`.
pub fn get_env_parsed<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::invalid_value(name, raw.clone(), e.to_string())),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn missing_variable_is_reported_by_name() {
        unsafe { std::env::remove_var("SHARED_UTILS_TEST_MISSING") };
        let err = get_env_var("SHARED_UTILS_TEST_MISSING").unwrap_err();
        assert_eq!(err.0, "SHARED_UTILS_TEST_MISSING");
        assert_eq!(get_env_var_or("SHARED_UTILS_TEST_MISSING", "dflt"), "dflt");
    }

    #[test]
    #[serial]
    fn flags_accept_common_spellings() {
        for truthy in ["true", "TRUE", "1", "yes"] {
            unsafe { std::env::set_var("SHARED_UTILS_TEST_FLAG", truthy) };
            assert!(get_env_flag("SHARED_UTILS_TEST_FLAG"), "{truthy}");
        }
        unsafe { std::env::set_var("SHARED_UTILS_TEST_FLAG", "False") };
        assert!(!get_env_flag("SHARED_UTILS_TEST_FLAG"));
        unsafe { std::env::remove_var("SHARED_UTILS_TEST_FLAG") };
        assert!(!get_env_flag("SHARED_UTILS_TEST_FLAG"));
    }

    #[test]
    #[serial]
    fn parsed_values_report_bad_input() {
        unsafe { std::env::set_var("SHARED_UTILS_TEST_NUM", "12") };
        assert_eq!(get_env_parsed::<u32>("SHARED_UTILS_TEST_NUM").unwrap(), Some(12));

        unsafe { std::env::set_var("SHARED_UTILS_TEST_NUM", "twelve") };
        let err = get_env_parsed::<u32>("SHARED_UTILS_TEST_NUM").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "SHARED_UTILS_TEST_NUM"));

        unsafe { std::env::set_var("SHARED_UTILS_TEST_NUM", "  ") };
        assert_eq!(get_env_parsed::<u32>("SHARED_UTILS_TEST_NUM").unwrap(), None);
        unsafe { std::env::remove_var("SHARED_UTILS_TEST_NUM") };
    }
}
