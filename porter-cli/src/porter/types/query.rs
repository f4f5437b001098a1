//! Query templates with source table prefix substitution
//!
//! Platform queries reference source tables as `:_name`; the `:_` token is
//! replaced with the configured table prefix before execution. This is
//! identifier templating only. Platform queries carry no value parameters,
//! and the prefix is validated as an identifier so it can never smuggle SQL
//! into the statement.

use serde::{Deserialize, Serialize};

/// Placeholder replaced by the source table prefix
pub const PREFIX_TOKEN: &str = ":_";

/// A validated source table prefix (`tbl`, `phpbb_`, or empty)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourcePrefix(String);

/// Error when a prefix contains characters outside `[A-Za-z0-9_]`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid table prefix '{prefix}': only letters, digits and '_' are allowed")]
pub struct InvalidPrefix {
    pub prefix: String,
}

impl SourcePrefix {
    pub fn new(prefix: impl Into<String>) -> Result<Self, InvalidPrefix> {
        let prefix = prefix.into();
        if prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            Ok(SourcePrefix(prefix))
        } else {
            Err(InvalidPrefix { prefix })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourcePrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SourcePrefix {
    type Error = InvalidPrefix;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SourcePrefix::new(value)
    }
}

impl From<SourcePrefix> for String {
    fn from(value: SourcePrefix) -> Self {
        value.0
    }
}

/// SQL text containing `:_` prefix placeholders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTemplate(String);

impl QueryTemplate {
    pub fn new(sql: impl Into<String>) -> Self {
        QueryTemplate(sql.into())
    }

    /// Raw template text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substitute the prefix placeholder, producing executable SQL
    pub fn render(&self, prefix: &SourcePrefix) -> String {
        self.0.replace(PREFIX_TOKEN, prefix.as_str()).trim().to_string()
    }
}

impl From<&str> for QueryTemplate {
    fn from(sql: &str) -> Self {
        QueryTemplate::new(sql)
    }
}

impl From<String> for QueryTemplate {
    fn from(sql: String) -> Self {
        QueryTemplate::new(sql)
    }
}
