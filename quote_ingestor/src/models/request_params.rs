use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// How much history a daily request asks for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSize {
    /// The latest 100 data points.
    #[default]
    Compact,
    /// The full available history.
    Full,
}

impl OutputSize {
    /// Query-string value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for OutputSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "full" => Ok(Self::Full),
            other => Err(format!("unknown output size {other:?} (expected compact or full)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_renders() {
        assert_eq!("FULL".parse::<OutputSize>().unwrap(), OutputSize::Full);
        assert_eq!(OutputSize::default().to_string(), "compact");
        assert!("huge".parse::<OutputSize>().is_err());
        assert_eq!(serde_json::to_string(&OutputSize::Full).unwrap(), "\"full\"");
    }
}
