//! Query results as read from the source store

use crate::porter::Value;

/// One result row; column names may repeat (`select x as Name, t.*`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRow {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl SourceRow {
    pub fn new() -> Self {
        SourceRow::default()
    }

    /// Append a cell
    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.columns.push(column.into());
        self.values.push(value);
    }

    /// Builder-style append, handy for tests and staging
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, value.into());
        self
    }

    /// Look up a column; a repeated name resolves to its last occurrence
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .rposition(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Cells with repeated names collapsed to their last value, in first-seen order
    pub fn distinct_cells(&self) -> Vec<(&str, &Value)> {
        let mut out: Vec<(&str, &Value)> = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            if out.iter().any(|(c, _)| c == column) {
                continue;
            }
            if let Some(value) = self.get(column) {
                out.push((column.as_str(), value));
            }
        }
        out
    }
}

/// A full query result, with column names known even when no row came back
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<SourceRow>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<SourceRow>) -> Self {
        ResultSet { columns, rows }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Column names with repeats removed, in first-seen order
    pub fn distinct_columns(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            if !out.contains(&column.as_str()) {
                out.push(column);
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
