use chrono::{Datelike, NaiveDate};

use super::{DataKind, Environment, KeyTarget, ParsedKey};

const V1_PREFIX_MARKER: &str = "stock-data";
const JSON_SUFFIX: &str = ".json";

/// Recognise the layout of `key` and extract its semantic fields.
///
/// Never fails: shapes that match no known layout (including in-flight
/// `.tmp.` objects) come back as [`ParsedKey::Unknown`]. Parsing is strict
/// about segment counts and zero-padded dates so that
/// `decode(k).encode() == k` holds for every recognised key.
pub fn decode(key: &str) -> ParsedKey {
    let parts: Vec<&str> = key.split('/').collect();

    parse_v2(&parts)
        .or_else(|| parse_lambda(&parts))
        .or_else(|| parse_v1(&parts))
        .unwrap_or_else(|| ParsedKey::Unknown {
            key: key.to_string(),
        })
}

pub(super) fn encode(parsed: &ParsedKey) -> String {
    match parsed {
        ParsedKey::V2 {
            environment,
            data_kind,
            symbol,
            target,
        } => {
            let leaf = match target {
                KeyTarget::Daily(date) => format!(
                    "daily/{:04}/{:02}/{:02}.json",
                    date.year(),
                    date.month(),
                    date.day()
                ),
                other => flat_leaf(*other),
            };
            format!("{environment}/stock/{data_kind}/{symbol}/{leaf}")
        }
        ParsedKey::V1 {
            prefix,
            symbol,
            target,
        } => {
            let leaf = match target {
                KeyTarget::Daily(date) => format!("daily/{}.json", date.format("%Y-%m-%d")),
                other => flat_leaf(*other),
            };
            format!("{prefix}/{symbol}/{leaf}")
        }
        ParsedKey::Lambda { symbol, date } => {
            format!("daily/{symbol}/{}.json", date.format("%Y-%m-%d"))
        }
        ParsedKey::Unknown { key } => key.clone(),
    }
}

fn flat_leaf(target: KeyTarget) -> String {
    match target {
        KeyTarget::Latest => "latest.json".to_string(),
        KeyTarget::Full => "full.json".to_string(),
        KeyTarget::Metadata => "metadata.json".to_string(),
        KeyTarget::Daily(date) => format!("{}.json", date.format("%Y-%m-%d")),
    }
}

// ----- per-layout parsers -----

fn parse_v2(parts: &[&str]) -> Option<ParsedKey> {
    let [environment, "stock", data_kind, symbol, rest @ ..] = parts else {
        return None;
    };
    // Segments must be exactly lowercase; `FromStr` is lenient for CLI input.
    let environment = environment
        .parse::<Environment>()
        .ok()
        .filter(|env| env.as_str() == *environment)?;
    let data_kind = data_kind
        .parse::<DataKind>()
        .ok()
        .filter(|kind| kind.as_str() == *data_kind)?;
    let symbol = symbol_segment(symbol)?;

    let target = match rest {
        [leaf] => flat_target(leaf)?,
        ["daily", year, month, day_file] => {
            let day = day_file.strip_suffix(JSON_SUFFIX)?;
            KeyTarget::Daily(split_date(year, month, day)?)
        }
        _ => return None,
    };

    Some(ParsedKey::V2 {
        environment,
        data_kind,
        symbol,
        target,
    })
}

fn parse_lambda(parts: &[&str]) -> Option<ParsedKey> {
    let ["daily", symbol, date_file] = parts else {
        return None;
    };
    Some(ParsedKey::Lambda {
        symbol: symbol_segment(symbol)?,
        date: iso_date(date_file.strip_suffix(JSON_SUFFIX)?)?,
    })
}

fn parse_v1(parts: &[&str]) -> Option<ParsedKey> {
    let [prefix, symbol, rest @ ..] = parts else {
        return None;
    };
    if !prefix.starts_with(V1_PREFIX_MARKER) {
        return None;
    }
    let symbol = symbol_segment(symbol)?;

    let target = match rest {
        [leaf] => flat_target(leaf)?,
        ["daily", date_file] => KeyTarget::Daily(iso_date(date_file.strip_suffix(JSON_SUFFIX)?)?),
        _ => return None,
    };

    Some(ParsedKey::V1 {
        prefix: prefix.to_string(),
        symbol,
        target,
    })
}

// ----- segment helpers -----

fn flat_target(leaf: &str) -> Option<KeyTarget> {
    match leaf {
        "latest.json" => Some(KeyTarget::Latest),
        "full.json" => Some(KeyTarget::Full),
        "metadata.json" => Some(KeyTarget::Metadata),
        _ => None,
    }
}

fn symbol_segment(segment: &str) -> Option<String> {
    (!segment.is_empty() && !segment.ends_with(JSON_SUFFIX)).then(|| segment.to_string())
}

/// `YYYY`, `MM`, `DD` segments, each zero-padded to its exact width.
fn split_date(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    let all_digits = |s: &str, width: usize| s.len() == width && s.bytes().all(|b| b.is_ascii_digit());
    if !(all_digits(year, 4) && all_digits(month, 2) && all_digits(day, 2)) {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// A canonical `YYYY-MM-DD` date.
fn iso_date(text: &str) -> Option<NaiveDate> {
    let (year, rest) = text.split_once('-')?;
    let (month, day) = rest.split_once('-')?;
    split_date(year, month, day)
}
