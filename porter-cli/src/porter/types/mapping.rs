//! Mapping tables: ordered source column -> destination column rules

use serde::{Deserialize, Serialize};

use super::Filter;

/// Destination side of a mapping entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Destination column name
    pub name: String,
    /// Optional filter applied to the raw value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    /// Optional override of the destination column type (e.g. `varchar(255)`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Column {
            name: name.into(),
            filter: None,
            target_type: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn target_type(mut self, target_type: impl Into<String>) -> Self {
        self.target_type = Some(target_type.into());
        self
    }
}

impl From<&str> for Column {
    fn from(name: &str) -> Self {
        Column::new(name)
    }
}

/// One entry of a mapping table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Column (or query alias) in the source result set
    pub source_column: String,
    /// Destination column rule
    pub target: Column,
}

impl ColumnMapping {
    pub fn target_column(&self) -> &str {
        &self.target.name
    }

    /// Get a human-readable description of this mapping
    pub fn describe(&self) -> String {
        let mut out = format!("{} -> {}", self.source_column, self.target.name);
        if let Some(filter) = self.target.filter {
            out.push_str(&format!(" |{}", filter));
        }
        if let Some(ref ty) = self.target.target_type {
            out.push_str(&format!(" :{}", ty));
        }
        out
    }
}

/// Ordered mapping rules for one destination table
///
/// Entries are keyed by source column. Inserting a source column that is
/// already present replaces the earlier entry in place, keeping its
/// position: the last declaration wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingTable {
    entries: Vec<ColumnMapping>,
}

impl MappingTable {
    pub fn new() -> Self {
        MappingTable::default()
    }

    /// Map a source column straight onto a destination column
    pub fn map(self, source_column: impl Into<String>, target_column: impl Into<String>) -> Self {
        self.column(source_column, Column::new(target_column))
    }

    /// Map a source column onto a destination column rule
    pub fn column(mut self, source_column: impl Into<String>, target: Column) -> Self {
        self.insert(source_column, target);
        self
    }

    /// Insert an entry, overwriting any entry with the same source column
    pub fn insert(&mut self, source_column: impl Into<String>, target: Column) {
        let source_column = source_column.into();
        match self
            .entries
            .iter_mut()
            .find(|e| e.source_column == source_column)
        {
            Some(existing) => {
                log::trace!(
                    "Mapping for '{}' redefined: {} -> {}",
                    source_column,
                    existing.target.name,
                    target.name
                );
                existing.target = target;
            }
            None => self.entries.push(ColumnMapping {
                source_column,
                target,
            }),
        }
    }

    /// Entries in declaration order
    pub fn entries(&self) -> &[ColumnMapping] {
        &self.entries
    }

    /// Find the entry for a source column
    pub fn find(&self, source_column: &str) -> Option<&ColumnMapping> {
        self.entries.iter().find(|e| e.source_column == source_column)
    }

    /// Distinct destination columns, in order of first declaration
    pub fn target_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            if !columns.contains(&entry.target_column()) {
                columns.push(entry.target_column());
            }
        }
        columns
    }

    /// The type override for a destination column, if any entry declares one
    ///
    /// When several entries write the same column the last one decides.
    pub fn target_type(&self, target_column: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.target_column() == target_column)
            .and_then(|e| e.target.target_type.as_deref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
