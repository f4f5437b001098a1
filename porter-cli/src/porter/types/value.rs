//! Cell value representation for exported rows

use serde::{Deserialize, Serialize};

/// A single cell read from the source store or written to the destination
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// SQL NULL
    #[default]
    Null,
    /// Text value
    String(String),
    /// Whole number
    Int(i64),
    /// Floating point
    Float(f64),
    /// Boolean, produced by the bool filter
    Bool(bool),
}

/// Token the porter file uses for NULL cells
pub const NULL_TOKEN: &str = "\\N";

impl Value {
    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as integer
    ///
    /// Numeric strings are accepted since SQLite happily returns numbers as
    /// text when a column has no declared affinity.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(*b as i64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Render this value as a porter file cell
    ///
    /// Text starting with a backslash gets one more, so a literal `\N`
    /// never reads back as NULL. Readers drop one leading backslash.
    pub fn to_cell(&self) -> String {
        match self {
            Value::Null => NULL_TOKEN.to_string(),
            Value::String(s) if s.starts_with('\\') => format!("\\{}", s),
            Value::String(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "(null)"),
            Value::String(s) => write!(f, "'{}'", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_cell() {
        assert_eq!(Value::Null.to_cell(), "\\N");
        assert_eq!(Value::Bool(true).to_cell(), "1");
        assert_eq!(Value::Bool(false).to_cell(), "0");
        assert_eq!(Value::Int(-4).to_cell(), "-4");
        assert_eq!(Value::from("plain").to_cell(), "plain");
    }

    #[test]
    fn test_to_cell_escapes_literal_null_token() {
        assert_eq!(Value::from("\\N").to_cell(), "\\\\N");
        assert_ne!(Value::from("\\N").to_cell(), Value::Null.to_cell());
        assert_eq!(Value::from("\\\\N").to_cell(), "\\\\\\N");
        assert_eq!(Value::from("C:\\forum").to_cell(), "C:\\forum");
    }

    #[test]
    fn test_default_is_null() {
        assert!(Value::default().is_null());
    }

    #[test]
    fn test_as_int_accepts_numeric_text() {
        assert_eq!(Value::from(" 42 ").as_int(), Some(42));
        assert_eq!(Value::from("forty").as_int(), None);
        assert_eq!(Value::Null.as_int(), None);
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(7i64)), Value::Int(7));
    }
}
