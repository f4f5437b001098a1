//! Mapping table application: one source row in, one destination row out

use crate::porter::source::{ResultSet, SourceRow};
use crate::porter::{DestinationTable, ExportError, MappingTable, Value};

/// A destination row; writing a column twice overwrites the first value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedRow {
    cells: Vec<(String, Value)>,
}

impl MappedRow {
    pub fn new() -> Self {
        MappedRow::default()
    }

    /// Set a column, replacing any earlier value in place
    pub fn set(&mut self, column: &str, value: Value) {
        match self.cells.iter_mut().find(|(c, _)| c == column) {
            Some((_, existing)) => *existing = value,
            None => self.cells.push((column.to_string(), value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    /// Column names in the order they were first written
    pub fn columns(&self) -> Vec<&str> {
        self.cells.iter().map(|(c, _)| c.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Values laid out for the given column order; absent columns become NULL
    pub fn into_values(mut self, columns: &[&str]) -> Vec<Value> {
        columns
            .iter()
            .map(|column| {
                self.cells
                    .iter_mut()
                    .find(|(c, _)| c == column)
                    .map(|(_, v)| std::mem::take(v))
                    .unwrap_or(Value::Null)
            })
            .collect()
    }
}

/// Verify every mapped source column exists in the query result
///
/// Runs before any row is mapped so typos surface even for empty results.
pub fn check_columns(
    table: DestinationTable,
    mapping: &MappingTable,
    result: &ResultSet,
) -> Result<(), ExportError> {
    match mapping
        .entries()
        .iter()
        .find(|entry| !result.has_column(&entry.source_column))
    {
        Some(entry) => Err(ExportError::MissingSourceColumn {
            table,
            source_column: entry.source_column.clone(),
            target_column: entry.target_column().to_string(),
        }),
        None => Ok(()),
    }
}

/// Apply a mapping table to one source row
///
/// `row_index` is only used to locate filter failures.
pub fn apply_mapping(
    table: DestinationTable,
    mapping: &MappingTable,
    row: &SourceRow,
    row_index: usize,
) -> Result<MappedRow, ExportError> {
    let mut mapped = MappedRow::new();

    for entry in mapping.entries() {
        let raw = row
            .get(&entry.source_column)
            .ok_or_else(|| ExportError::MissingSourceColumn {
                table,
                source_column: entry.source_column.clone(),
                target_column: entry.target_column().to_string(),
            })?;

        let value = match entry.target.filter {
            Some(filter) => filter.apply(raw.clone()).map_err(|e| {
                ExportError::FilterApplicationFailure {
                    table,
                    row: row_index,
                    column: entry.target_column().to_string(),
                    filter,
                    value: raw.clone(),
                    message: e.message,
                }
            })?,
            None => raw.clone(),
        };

        mapped.set(entry.target_column(), value);
    }

    Ok(mapped)
}

/// Copy a row unchanged, for tables exported without a mapping
pub fn passthrough(row: &SourceRow) -> MappedRow {
    let mut mapped = MappedRow::new();
    for (column, value) in row.distinct_cells() {
        mapped.set(column, value.clone());
    }
    mapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::porter::{Column, Filter};

    fn user_map() -> MappingTable {
        MappingTable::new()
            .map("Author_ID", "UserID")
            .column("Username", Column::new("Name").filter(Filter::HtmlDecode))
            .map("Author_email", "Email")
    }

    fn user_row() -> SourceRow {
        SourceRow::new()
            .with("Author_ID", 7i64)
            .with("Username", "Tom &amp; Jerry")
            .with("Author_email", "tj@example.com")
            .with("Unmapped", "ignored")
    }

    #[test]
    fn test_apply_yields_exactly_declared_targets() {
        let mapping = user_map();
        let mapped = apply_mapping(DestinationTable::User, &mapping, &user_row(), 0).unwrap();

        assert_eq!(mapped.columns(), mapping.target_columns());
        assert_eq!(mapped.get("UserID"), Some(&Value::Int(7)));
        assert_eq!(mapped.get("Name"), Some(&Value::from("Tom & Jerry")));
        assert_eq!(mapped.get("Unmapped"), None);
    }

    #[test]
    fn test_missing_source_column_never_partial() {
        let mapping = user_map();
        let row = SourceRow::new().with("Author_ID", 7i64).with("Username", "bob");

        let err = apply_mapping(DestinationTable::User, &mapping, &row, 3).unwrap_err();
        match err {
            ExportError::MissingSourceColumn {
                table,
                source_column,
                target_column,
            } => {
                assert_eq!(table, DestinationTable::User);
                assert_eq!(source_column, "Author_email");
                assert_eq!(target_column, "Email");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_later_mapping_wins_on_same_target() {
        let mapping = MappingTable::new()
            .map("owner_user_id", "InsertUserID")
            .map("edit_user", "InsertUserID");
        let row = SourceRow::new()
            .with("owner_user_id", 1i64)
            .with("edit_user", 2i64);

        let mapped = apply_mapping(DestinationTable::Category, &mapping, &row, 0).unwrap();
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped.get("InsertUserID"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_redefined_source_routes_to_last_target() {
        let mapping = MappingTable::new()
            .map("ManageUsers", "Garden.Users.Add")
            .map("ManageUsers", "Garden.Users.Edit");
        let row = SourceRow::new().with("ManageUsers", 1i64);

        let mapped = apply_mapping(DestinationTable::Permission, &mapping, &row, 0).unwrap();
        assert_eq!(mapped.columns(), vec!["Garden.Users.Edit"]);
    }

    #[test]
    fn test_filter_failure_reports_context() {
        let mapping = MappingTable::new().column("Locked", Column::new("Closed").filter(Filter::BoolCoerce));
        let row = SourceRow::new().with("Locked", "perhaps");

        let err = apply_mapping(DestinationTable::Discussion, &mapping, &row, 12).unwrap_err();
        match err {
            ExportError::FilterApplicationFailure {
                row, column, filter, value, ..
            } => {
                assert_eq!(row, 12);
                assert_eq!(column, "Closed");
                assert_eq!(filter, Filter::BoolCoerce);
                assert_eq!(value, Value::from("perhaps"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_check_columns_on_empty_result() {
        let result = ResultSet::new(vec!["Author_ID".into(), "Username".into()], vec![]);
        let err = check_columns(DestinationTable::User, &user_map(), &result).unwrap_err();
        assert!(matches!(
            err,
            ExportError::MissingSourceColumn { ref source_column, .. } if source_column == "Author_email"
        ));
    }

    #[test]
    fn test_into_values_orders_and_fills_nulls() {
        let mut row = MappedRow::new();
        row.set("B", Value::Int(2));
        row.set("A", Value::Int(1));
        assert_eq!(
            row.into_values(&["A", "B", "C"]),
            vec![Value::Int(1), Value::Int(2), Value::Null]
        );
    }

    #[test]
    fn test_passthrough_collapses_repeats() {
        let row = SourceRow::new()
            .with("UserID", 1i64)
            .with("Name", "Plugin.Signatures.Sig")
            .with("UserID", 2i64);
        let mapped = passthrough(&row);
        assert_eq!(mapped.columns(), vec!["UserID", "Name"]);
        assert_eq!(mapped.get("UserID"), Some(&Value::Int(2)));
    }
}
