//! Source store abstraction: where platform queries run

mod row;
mod sqlite;

pub use row::{ResultSet, SourceRow};
pub use sqlite::SqliteSource;

use async_trait::async_trait;

use crate::porter::Value;

/// Error raised by the source store
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("invalid source location '{location}': {message}")]
    InvalidLocation { location: String, message: String },
}

/// A derived table written into the source store before dependent queries run
#[derive(Debug, Clone, PartialEq)]
pub struct StagedTable {
    pub name: String,
    /// Column name and SQL type
    pub columns: Vec<(String, String)>,
    pub rows: Vec<Vec<Value>>,
}

impl StagedTable {
    pub fn new(name: impl Into<String>, columns: &[(&str, &str)]) -> Self {
        StagedTable {
            name: name.into(),
            columns: columns
                .iter()
                .map(|(n, t)| (n.to_string(), t.to_string()))
                .collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }
}

/// The database a porter reads from
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Run a query and return every row in the order the query yields them
    async fn fetch(&self, sql: &str) -> Result<ResultSet, SourceError>;

    /// Character set of a table, `None` when the table does not exist
    async fn character_set(&self, table: &str) -> Result<Option<String>, SourceError>;

    /// Replace a derived table with the given rows
    async fn stage(&self, table: &StagedTable) -> Result<(), SourceError>;

    /// Drop a derived table if it exists
    async fn drop_staged(&self, name: &str) -> Result<(), SourceError>;
}
