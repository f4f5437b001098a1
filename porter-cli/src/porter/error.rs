//! Per-table export errors

use crate::porter::output::OutputError;
use crate::porter::source::SourceError;
use crate::porter::{DestinationTable, Filter, Value};

/// Failure exporting one destination table
///
/// Every variant names the table, so a failed run can be resumed by hand.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A mapping names a column the query does not produce
    #[error("{table}: mapping for '{target_column}' references missing source column '{source_column}'")]
    MissingSourceColumn {
        table: DestinationTable,
        source_column: String,
        target_column: String,
    },

    /// The source store rejected the table's query
    #[error("{table}: query failed: {source}")]
    QueryExecutionFailure {
        table: DestinationTable,
        #[source]
        source: SourceError,
    },

    /// A filter was given a value outside its domain
    #[error("{table}: row {row}, column '{column}': {filter} rejected {value}: {message}")]
    FilterApplicationFailure {
        table: DestinationTable,
        row: usize,
        column: String,
        filter: Filter,
        value: Value,
        message: String,
    },

    /// Writing the mapped rows failed
    #[error("{table}: failed to write output: {source}")]
    Output {
        table: DestinationTable,
        #[source]
        source: OutputError,
    },

    /// Conversation staging failed, so the table's query was never run
    #[error("{table}: skipped, conversation staging failed: {message}")]
    Staging {
        table: DestinationTable,
        message: String,
    },
}

impl ExportError {
    /// The destination table that failed
    pub fn table(&self) -> DestinationTable {
        match self {
            ExportError::MissingSourceColumn { table, .. }
            | ExportError::QueryExecutionFailure { table, .. }
            | ExportError::FilterApplicationFailure { table, .. }
            | ExportError::Output { table, .. }
            | ExportError::Staging { table, .. } => *table,
        }
    }

    /// Short machine-readable kind, used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            ExportError::MissingSourceColumn { .. } => "missing_source_column",
            ExportError::QueryExecutionFailure { .. } => "query_execution_failure",
            ExportError::FilterApplicationFailure { .. } => "filter_application_failure",
            ExportError::Output { .. } => "output",
            ExportError::Staging { .. } => "staging",
        }
    }
}
