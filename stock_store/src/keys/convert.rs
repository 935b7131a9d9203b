use super::{
    DEFAULT_V1_PREFIX, DataKind, Environment, KeyError, KeyTarget, KeyVersion, ParsedKey, decode,
};

/// Fields a target layout needs but a source key may not carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Data kind for `v2` targets.
    pub data_kind: DataKind,
    /// Environment for `v2` targets. `None` keeps a `v2` source's environment
    /// and falls back to [`Environment::Prod`] for other sources.
    pub environment: Option<Environment>,
    /// Prefix for `v1` targets.
    pub v1_prefix: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            data_kind: DataKind::Raw,
            environment: None,
            v1_prefix: DEFAULT_V1_PREFIX.to_string(),
        }
    }
}

/// Outcome of a successful [`convert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    /// The key was already in the target layout and is returned untouched.
    Unchanged(String),
    /// The key was rewritten.
    Converted(String),
}

impl Conversion {
    /// The resulting key.
    pub fn key(&self) -> &str {
        match self {
            Self::Unchanged(key) | Self::Converted(key) => key,
        }
    }

    /// Consume into the resulting key.
    pub fn into_key(self) -> String {
        match self {
            Self::Unchanged(key) | Self::Converted(key) => key,
        }
    }

    /// True when no rewrite happened.
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged(_))
    }
}

/// Re-derive `key` in the `target` layout.
///
/// Converting a key that is already in `target` returns
/// [`Conversion::Unchanged`] so callers can skip the copy.
pub fn convert(
    key: &str,
    target: KeyVersion,
    opts: &ConvertOptions,
) -> Result<Conversion, KeyError> {
    let parsed = decode(key);
    if parsed.version() == target && target != KeyVersion::Unknown {
        return Ok(Conversion::Unchanged(key.to_string()));
    }
    convert_parsed(&parsed, target, opts)
}

/// Same as [`convert`] for a key that has already been decoded.
pub fn convert_parsed(
    parsed: &ParsedKey,
    target: KeyVersion,
    opts: &ConvertOptions,
) -> Result<Conversion, KeyError> {
    let (symbol, source_target) = match (parsed.symbol(), parsed.target()) {
        (Some(symbol), Some(source_target)) => (symbol.to_string(), source_target),
        _ => {
            return Err(KeyError::UnrecognizedKey {
                key: parsed.encode(),
            });
        }
    };

    if parsed.version() == target {
        return Ok(Conversion::Unchanged(parsed.encode()));
    }

    let unsupported = |reason: String| KeyError::UnsupportedConversion {
        key: parsed.encode(),
        target,
        reason,
    };

    let converted = match target {
        KeyVersion::V2 => ParsedKey::V2 {
            environment: opts
                .environment
                .or(parsed.environment())
                .unwrap_or(Environment::Prod),
            data_kind: opts.data_kind,
            symbol,
            target: source_target,
        },
        KeyVersion::V1 => ParsedKey::V1 {
            prefix: opts.v1_prefix.clone(),
            symbol,
            target: source_target,
        },
        KeyVersion::Lambda => match source_target {
            KeyTarget::Daily(date) => ParsedKey::Lambda { symbol, date },
            other => {
                return Err(unsupported(format!(
                    "{} keys carry no date and the lambda layout only stores daily snapshots",
                    other.key_type().as_str()
                )));
            }
        },
        KeyVersion::Unknown => {
            return Err(unsupported("unknown is not a target layout".to_string()));
        }
    };

    Ok(Conversion::Converted(converted.encode()))
}
