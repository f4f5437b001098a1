//! Destination writers for exported tables

mod memory;
mod porter_file;

pub use memory::{MemoryTable, MemoryWriter};
pub use porter_file::PorterFileWriter;

use chrono::{DateTime, Utc};

use crate::porter::{DestinationTable, SourcePrefix, Value};

/// Error raised while writing the destination
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Session details written at the top of an export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportHeader {
    pub label: String,
    pub character_set: String,
    pub source_prefix: SourcePrefix,
    pub started_at: DateTime<Utc>,
}

/// Totals written when an export is finalized
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFooter {
    pub completed_at: DateTime<Utc>,
    pub tables: usize,
    pub rows: u64,
}

/// A destination column and its declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputColumn {
    pub name: String,
    pub column_type: String,
}

impl OutputColumn {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        OutputColumn {
            name: name.into(),
            column_type: column_type.into(),
        }
    }
}

/// Where mapped rows end up
///
/// A table is written in one go: the engine only calls `write_table` once
/// every row of it mapped successfully.
pub trait DestinationWriter: Send {
    fn begin(&mut self, header: &ExportHeader) -> Result<(), OutputError>;

    fn write_table(
        &mut self,
        table: DestinationTable,
        columns: &[OutputColumn],
        rows: &[Vec<Value>],
    ) -> Result<(), OutputError>;

    fn finish(&mut self, footer: &ExportFooter) -> Result<(), OutputError>;
}
