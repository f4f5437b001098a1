//! In-memory destination, used for dry runs and tests

use std::collections::HashMap;

use super::{DestinationWriter, ExportFooter, ExportHeader, OutputColumn, OutputError};
use crate::porter::{DestinationTable, Value};

/// A table captured by `MemoryWriter`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryTable {
    pub columns: Vec<OutputColumn>,
    pub rows: Vec<Vec<Value>>,
}

impl MemoryTable {
    /// Rows as column name -> value maps
    pub fn records(&self) -> Vec<HashMap<&str, &Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(|c| c.name.as_str())
                    .zip(row.iter())
                    .collect()
            })
            .collect()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Keeps every written table in memory
#[derive(Debug, Default)]
pub struct MemoryWriter {
    pub header: Option<ExportHeader>,
    pub footer: Option<ExportFooter>,
    /// Tables in the order they were written
    pub tables: Vec<(DestinationTable, MemoryTable)>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        MemoryWriter::default()
    }

    pub fn table(&self, table: DestinationTable) -> Option<&MemoryTable> {
        self.tables.iter().find(|(t, _)| *t == table).map(|(_, m)| m)
    }
}

impl DestinationWriter for MemoryWriter {
    fn begin(&mut self, header: &ExportHeader) -> Result<(), OutputError> {
        self.header = Some(header.clone());
        Ok(())
    }

    fn write_table(
        &mut self,
        table: DestinationTable,
        columns: &[OutputColumn],
        rows: &[Vec<Value>],
    ) -> Result<(), OutputError> {
        self.tables.push((
            table,
            MemoryTable {
                columns: columns.to_vec(),
                rows: rows.to_vec(),
            },
        ));
        Ok(())
    }

    fn finish(&mut self, footer: &ExportFooter) -> Result<(), OutputError> {
        self.footer = Some(footer.clone());
        Ok(())
    }
}
