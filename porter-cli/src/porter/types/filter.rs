//! Column filters applied while mapping source rows

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use super::Value;

/// Date format written for converted timestamps
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A pure unary transform applied to a single column value
///
/// Every filter passes `Null` through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Return the value unchanged
    Identity,
    /// Decode HTML entities in text (`&amp;` -> `&`); plain text is unchanged
    HtmlDecode,
    /// Coerce source truthy/falsy representations into a boolean
    #[serde(rename = "bool")]
    BoolCoerce,
    /// Convert a unix timestamp in seconds to a datetime string
    UnixSeconds,
    /// Convert a unix timestamp in milliseconds to a datetime string
    UnixMillis,
}

/// A filter rejected a value outside its domain
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{filter}: {message}")]
pub struct FilterError {
    pub filter: Filter,
    pub message: String,
}

impl Filter {
    /// All filters, in lookup table order
    pub fn all_variants() -> &'static [Filter] {
        &[
            Filter::Identity,
            Filter::HtmlDecode,
            Filter::BoolCoerce,
            Filter::UnixSeconds,
            Filter::UnixMillis,
        ]
    }

    /// Name used in mapping listings and for lookup
    pub fn name(&self) -> &'static str {
        match self {
            Filter::Identity => "identity",
            Filter::HtmlDecode => "html_decode",
            Filter::BoolCoerce => "bool",
            Filter::UnixSeconds => "unix_seconds",
            Filter::UnixMillis => "unix_millis",
        }
    }

    /// Resolve a filter from its name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all_variants()
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }

    /// Apply this filter to a value
    pub fn apply(&self, value: Value) -> Result<Value, FilterError> {
        if value.is_null() {
            return Ok(value);
        }

        match self {
            Filter::Identity => Ok(value),
            Filter::HtmlDecode => Ok(html_decode(value)),
            Filter::BoolCoerce => self.coerce_bool(&value).map(Value::Bool),
            Filter::UnixSeconds => self.from_unix(&value, 1),
            Filter::UnixMillis => self.from_unix(&value, 1000),
        }
    }

    fn coerce_bool(&self, value: &Value) -> Result<bool, FilterError> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            Value::Float(f) => Ok(*f != 0.0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" | "true" | "t" | "on" | "1" => Ok(true),
                "n" | "no" | "false" | "f" | "off" | "0" | "" => Ok(false),
                other => other
                    .parse::<i64>()
                    .map(|i| i != 0)
                    .map_err(|_| self.error(format!("'{}' is not a boolean", s))),
            },
            Value::Null => unreachable!("null handled by apply"),
        }
    }

    fn from_unix(&self, value: &Value, divisor: i64) -> Result<Value, FilterError> {
        let raw = value
            .as_int()
            .ok_or_else(|| self.error(format!("{} is not a timestamp", value)))?;

        let secs = raw.div_euclid(divisor);
        let nanos = (raw.rem_euclid(divisor) * (1_000_000_000 / divisor)) as u32;
        let datetime = DateTime::from_timestamp(secs, nanos)
            .ok_or_else(|| self.error(format!("{} is out of range", raw)))?;

        Ok(Value::String(datetime.format(DATETIME_FORMAT).to_string()))
    }

    fn error(&self, message: String) -> FilterError {
        FilterError {
            filter: *self,
            message,
        }
    }
}

fn html_decode(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(html_escape::decode_html_entities(&s).into_owned()),
        other => other,
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Filter::from_name(s).ok_or_else(|| format!("unknown filter '{}'", s))
    }
}
