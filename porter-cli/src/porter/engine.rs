//! Export engine - runs table queries, maps rows and hands them to a writer

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::porter::output::{
    DestinationWriter, ExportFooter, ExportHeader, OutputColumn, OutputError,
};
use crate::porter::source::{SourceError, SourceStore};
use crate::porter::transform::{MappedRow, apply_mapping, check_columns, passthrough};
use crate::porter::{
    DEFAULT_COLUMN_TYPE, DestinationTable, ExportError, MappingTable, QueryTemplate,
    SourcePrefix, TableExportSpec, Value,
};

/// Character set assumed when the source cannot tell
pub const DEFAULT_CHARACTER_SET: &str = "utf8";

/// How a table export ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableOutcome {
    Exported,
    Failed { kind: String, message: String },
    /// Not attempted because an earlier table failed with fail-fast on
    Skipped,
}

/// Per-table entry of the run report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableReport {
    pub table: DestinationTable,
    #[serde(flatten)]
    pub outcome: TableOutcome,
    pub rows: u64,
    /// Mapped columns the destination schema does not know
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dropped_columns: Vec<String>,
    pub duration_ms: u64,
}

impl TableReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, TableOutcome::Failed { .. })
    }
}

/// An export in progress
pub struct ExportSession<W: DestinationWriter> {
    pub label: String,
    pub character_set: String,
    pub source_prefix: SourcePrefix,
    pub started_at: DateTime<Utc>,
    writer: W,
    reports: Vec<TableReport>,
}

impl<W: DestinationWriter> ExportSession<W> {
    pub fn reports(&self) -> &[TableReport] {
        &self.reports
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn has_failures(&self) -> bool {
        self.reports.iter().any(TableReport::is_failed)
    }

    /// Record a table that failed before its query could run
    pub fn record_failure(&mut self, error: &ExportError) {
        log::error!("{}", error);
        self.reports.push(TableReport {
            table: error.table(),
            outcome: TableOutcome::Failed {
                kind: error.kind().to_string(),
                message: error.to_string(),
            },
            rows: 0,
            dropped_columns: Vec::new(),
            duration_ms: 0,
        });
    }

    /// Record a table left out of the run
    pub fn record_skipped(&mut self, table: DestinationTable) {
        log::warn!("Skipping {}", table);
        self.reports.push(TableReport {
            table,
            outcome: TableOutcome::Skipped,
            rows: 0,
            dropped_columns: Vec::new(),
            duration_ms: 0,
        });
    }
}

/// Final report of an export run
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub label: String,
    pub character_set: String,
    pub source_prefix: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub tables: Vec<TableReport>,
}

impl ExportSummary {
    /// Rows written across all exported tables
    pub fn rows(&self) -> u64 {
        self.tables
            .iter()
            .filter(|t| t.outcome == TableOutcome::Exported)
            .map(|t| t.rows)
            .sum()
    }

    pub fn exported(&self) -> usize {
        self.tables
            .iter()
            .filter(|t| t.outcome == TableOutcome::Exported)
            .count()
    }

    pub fn failed(&self) -> Vec<&TableReport> {
        self.tables.iter().filter(|t| t.is_failed()).collect()
    }

    pub fn is_success(&self) -> bool {
        self.tables
            .iter()
            .all(|t| t.outcome == TableOutcome::Exported)
    }

    pub fn report(&self, table: DestinationTable) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == table)
    }
}

/// A fully mapped table ready to be written
struct MappedTable {
    columns: Vec<OutputColumn>,
    rows: Vec<Vec<Value>>,
    dropped: Vec<String>,
}

/// Runs table exports against one source store
pub struct ExportEngine<S: SourceStore> {
    source: S,
    prefix: SourcePrefix,
    character_set: Option<String>,
}

impl<S: SourceStore> ExportEngine<S> {
    pub fn new(source: S, prefix: SourcePrefix) -> Self {
        ExportEngine {
            source,
            prefix,
            character_set: None,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn prefix(&self) -> &SourcePrefix {
        &self.prefix
    }

    /// Character set written in the header of the next export
    pub fn set_character_set(&mut self, character_set: impl Into<String>) {
        self.character_set = Some(character_set.into());
    }

    /// Character set of the prefixed probe table, `None` when it does not exist
    pub async fn get_character_set(&self, probe_table: &str) -> Result<Option<String>, SourceError> {
        let table = format!("{}{}", self.prefix, probe_table);
        let charset = self.source.character_set(&table).await?;
        match charset {
            Some(ref cs) => log::debug!("Probe table {} uses character set {}", table, cs),
            None => log::debug!("Probe table {} not found", table),
        }
        Ok(charset)
    }

    /// Open a session and write the export header
    pub fn begin_export<W: DestinationWriter>(
        &self,
        label: &str,
        mut writer: W,
    ) -> Result<ExportSession<W>, OutputError> {
        let character_set = self
            .character_set
            .clone()
            .unwrap_or_else(|| DEFAULT_CHARACTER_SET.to_string());
        let header = ExportHeader {
            label: label.to_string(),
            character_set: character_set.clone(),
            source_prefix: self.prefix.clone(),
            started_at: Utc::now(),
        };
        writer.begin(&header)?;

        log::info!(
            "Starting export '{}' (character set {}, prefix '{}')",
            label,
            character_set,
            self.prefix
        );

        Ok(ExportSession {
            label: header.label,
            character_set,
            source_prefix: header.source_prefix,
            started_at: header.started_at,
            writer,
            reports: Vec::new(),
        })
    }

    /// Export one table and record the outcome in the session
    ///
    /// Returns the number of rows written. On error nothing is written for
    /// the table and the session stays usable for the next one.
    pub async fn export_table<W: DestinationWriter>(
        &self,
        session: &mut ExportSession<W>,
        target: DestinationTable,
        query: &QueryTemplate,
        mapping: Option<&MappingTable>,
    ) -> Result<u64, ExportError> {
        log::info!("Exporting {}", target);
        let start = Instant::now();

        let result = match self.map_table(target, query, mapping).await {
            Ok(mapped) => session
                .writer
                .write_table(target, &mapped.columns, &mapped.rows)
                .map(|_| mapped)
                .map_err(|source| ExportError::Output {
                    table: target,
                    source,
                }),
            Err(e) => Err(e),
        };

        match result {
            Ok(mapped) => {
                let rows = mapped.rows.len() as u64;
                let duration = start.elapsed();
                log::info!(
                    "Exported {} rows to {} in {:.2}s",
                    rows,
                    target,
                    duration.as_secs_f64()
                );
                session.reports.push(TableReport {
                    table: target,
                    outcome: TableOutcome::Exported,
                    rows,
                    dropped_columns: mapped.dropped,
                    duration_ms: duration.as_millis() as u64,
                });
                Ok(rows)
            }
            Err(e) => {
                session.record_failure(&e);
                Err(e)
            }
        }
    }

    /// Export a table described by a plan entry
    pub async fn export_spec<W: DestinationWriter>(
        &self,
        session: &mut ExportSession<W>,
        spec: &TableExportSpec,
    ) -> Result<u64, ExportError> {
        self.export_table(session, spec.target, &spec.query, spec.mapping.as_ref())
            .await
    }

    /// Write the footer and close the session
    pub fn end_export<W: DestinationWriter>(
        &self,
        mut session: ExportSession<W>,
    ) -> Result<(ExportSummary, W), OutputError> {
        let summary = ExportSummary {
            label: session.label,
            character_set: session.character_set,
            source_prefix: session.source_prefix.to_string(),
            started_at: session.started_at,
            completed_at: Utc::now(),
            tables: session.reports,
        };

        session.writer.finish(&ExportFooter {
            completed_at: summary.completed_at,
            tables: summary.exported(),
            rows: summary.rows(),
        })?;

        log::info!(
            "Export '{}' finished: {} tables, {} rows, {} failed",
            summary.label,
            summary.exported(),
            summary.rows(),
            summary.failed().len()
        );

        Ok((summary, session.writer))
    }

    async fn map_table(
        &self,
        target: DestinationTable,
        query: &QueryTemplate,
        mapping: Option<&MappingTable>,
    ) -> Result<MappedTable, ExportError> {
        let sql = query.render(&self.prefix);
        log::debug!("{} query: {}", target, sql);

        let result = self
            .source
            .fetch(&sql)
            .await
            .map_err(|source| ExportError::QueryExecutionFailure {
                table: target,
                source,
            })?;
        log::debug!("{} query returned {} rows", target, result.len());

        let names: Vec<&str> = match mapping {
            Some(mapping) => {
                check_columns(target, mapping, &result)?;
                mapping.target_columns()
            }
            None => result.distinct_columns(),
        };

        let (columns, dropped) = output_columns(target, mapping, &names);
        for column in &dropped {
            log::warn!("{}: dropping column '{}' unknown to the destination", target, column);
        }
        let kept: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();

        let mut rows = Vec::with_capacity(result.len());
        for (idx, row) in result.rows.iter().enumerate() {
            let mapped: MappedRow = match mapping {
                Some(mapping) => apply_mapping(target, mapping, row, idx)?,
                None => passthrough(row),
            };
            rows.push(mapped.into_values(&kept));
        }

        Ok(MappedTable {
            columns,
            rows,
            dropped,
        })
    }
}

/// Resolve destination columns and split off the ones the table rejects
///
/// Type precedence: mapping override, then destination schema, then the
/// default column type.
fn output_columns(
    target: DestinationTable,
    mapping: Option<&MappingTable>,
    names: &[&str],
) -> (Vec<OutputColumn>, Vec<String>) {
    let mut columns = Vec::with_capacity(names.len());
    let mut dropped = Vec::new();

    for name in names {
        let override_type = mapping.and_then(|m| m.target_type(name));
        let schema_type = target.column_type(name);
        if override_type.is_none() && schema_type.is_none() {
            dropped.push(name.to_string());
            continue;
        }
        let column_type = override_type.or(schema_type).unwrap_or(DEFAULT_COLUMN_TYPE);
        columns.push(OutputColumn::new(*name, column_type));
    }

    (columns, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::porter::output::MemoryWriter;
    use crate::porter::source::SqliteSource;
    use crate::porter::{Column, Filter};

    async fn forum_engine() -> ExportEngine<SqliteSource> {
        let source = SqliteSource::connect("sqlite::memory:").await.unwrap();
        for sql in [
            "create table tblAuthor (Author_ID integer, Username text, Author_email text, Join_date text, Active integer)",
            "insert into tblAuthor values (1, 'admin', 'admin@example.com', '2020-01-01 00:00:00', 1)",
            "insert into tblAuthor values (2, 'Tom &amp; Jerry', null, '2021-05-05 10:00:00', 0)",
            "create table tblGroup (Group_ID integer, Name text)",
        ] {
            sqlx::query(sql).execute(source.pool()).await.unwrap();
        }
        ExportEngine::new(source, SourcePrefix::new("tbl").unwrap())
    }

    fn user_map() -> MappingTable {
        MappingTable::new()
            .map("Author_ID", "UserID")
            .column("Username", Column::new("Name").filter(Filter::HtmlDecode))
            .map("Author_email", "Email")
            .map("Join_date", "DateInserted")
            .column("Active", Column::new("Verified").filter(Filter::BoolCoerce))
    }

    #[tokio::test]
    async fn test_export_user_table() {
        let engine = forum_engine().await;
        let mut session = engine.begin_export("Test Forum", MemoryWriter::new()).unwrap();

        let rows = engine
            .export_table(
                &mut session,
                DestinationTable::User,
                &QueryTemplate::new("select * from :_Author order by Author_ID"),
                Some(&user_map()),
            )
            .await
            .unwrap();
        assert_eq!(rows, 2);

        let (summary, writer) = engine.end_export(session).unwrap();
        assert!(summary.is_success());
        assert_eq!(summary.rows(), 2);
        assert_eq!(writer.footer.as_ref().unwrap().tables, 1);

        let users = writer.table(DestinationTable::User).unwrap();
        assert_eq!(
            users.column_names(),
            vec!["UserID", "Name", "Email", "DateInserted", "Verified"]
        );
        let records = users.records();
        assert_eq!(records[1]["Name"], &Value::from("Tom & Jerry"));
        assert_eq!(records[1]["Email"], &Value::Null);
        assert_eq!(records[1]["Verified"], &Value::Bool(false));
    }

    #[tokio::test]
    async fn test_export_user_missing_column_names_column_and_table() {
        let engine = forum_engine().await;
        let mut session = engine.begin_export("Test Forum", MemoryWriter::new()).unwrap();

        let err = engine
            .export_table(
                &mut session,
                DestinationTable::User,
                &QueryTemplate::new("select Author_ID, Username from :_Author"),
                Some(&user_map()),
            )
            .await
            .unwrap_err();

        match err {
            ExportError::MissingSourceColumn {
                table,
                ref source_column,
                ..
            } => {
                assert_eq!(table, DestinationTable::User);
                assert_eq!(source_column, "Author_email");
            }
            ref other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("User"));
        assert!(err.to_string().contains("Author_email"));

        // Nothing was written for the failed table
        assert!(session.writer().table(DestinationTable::User).is_none());
        assert!(session.has_failures());
    }

    #[tokio::test]
    async fn test_missing_column_detected_on_empty_result() {
        let engine = forum_engine().await;
        let mut session = engine.begin_export("Test Forum", MemoryWriter::new()).unwrap();

        let err = engine
            .export_table(
                &mut session,
                DestinationTable::Role,
                &QueryTemplate::new("select Group_ID from :_Group"),
                Some(&MappingTable::new().map("Group_ID", "RoleID").map("Name2", "Name")),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::MissingSourceColumn { .. }));
    }

    #[tokio::test]
    async fn test_query_failure_is_isolated_to_its_table() {
        let engine = forum_engine().await;
        let mut session = engine.begin_export("Test Forum", MemoryWriter::new()).unwrap();

        let err = engine
            .export_table(
                &mut session,
                DestinationTable::Category,
                &QueryTemplate::new("select * from :_Forum"),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::QueryExecutionFailure { table: DestinationTable::Category, .. }));

        let rows = engine
            .export_table(
                &mut session,
                DestinationTable::Role,
                &QueryTemplate::new("select Group_ID as RoleID, Name from :_Group"),
                None,
            )
            .await
            .unwrap();
        assert_eq!(rows, 0);

        let (summary, writer) = engine.end_export(session).unwrap();
        assert_eq!(summary.failed().len(), 1);
        assert_eq!(summary.exported(), 1);
        // Empty tables still get their header written
        assert_eq!(
            writer.table(DestinationTable::Role).unwrap().column_names(),
            vec!["RoleID", "Name"]
        );
    }

    #[tokio::test]
    async fn test_latin1_text_does_not_fail_the_table() {
        let engine = forum_engine().await;
        let mut session = engine.begin_export("Test Forum", MemoryWriter::new()).unwrap();

        let rows = engine
            .export_table(
                &mut session,
                DestinationTable::Comment,
                &QueryTemplate::new("select 1 as CommentID, cast(x'43616692' as text) as Body"),
                None,
            )
            .await
            .unwrap();
        assert_eq!(rows, 1);

        let (_, writer) = engine.end_export(session).unwrap();
        let comments = writer.table(DestinationTable::Comment).unwrap().records();
        assert_eq!(comments[0]["Body"], &Value::from("Caf\u{FFFD}"));
    }

    #[tokio::test]
    async fn test_unknown_columns_dropped_and_reported() {
        let engine = forum_engine().await;
        let mut session = engine.begin_export("Test Forum", MemoryWriter::new()).unwrap();

        engine
            .export_table(
                &mut session,
                DestinationTable::Role,
                &QueryTemplate::new("select 1 as RoleID, 'x' as Name, 'y' as Colour"),
                None,
            )
            .await
            .unwrap();

        let report = &session.reports()[0];
        assert_eq!(report.dropped_columns, vec!["Colour".to_string()]);
        assert_eq!(
            session.writer().table(DestinationTable::Role).unwrap().column_names(),
            vec!["RoleID", "Name"]
        );
    }

    #[tokio::test]
    async fn test_get_character_set_uses_prefix() {
        let engine = forum_engine().await;
        assert_eq!(
            engine.get_character_set("Author").await.unwrap(),
            Some("utf8".to_string())
        );
        assert_eq!(engine.get_character_set("Topic").await.unwrap(), None);
    }

    #[test]
    fn test_output_column_type_precedence() {
        let mapping = MappingTable::new()
            .column("a", Column::new("Name").target_type("varchar(20)"))
            .map("b", "UserID")
            .column("c", Column::new("Extra").target_type("text"))
            .map("d", "Nope");

        let (columns, dropped) = output_columns(
            DestinationTable::User,
            Some(&mapping),
            &mapping.target_columns(),
        );
        assert_eq!(
            columns,
            vec![
                OutputColumn::new("Name", "varchar(20)"),
                OutputColumn::new("UserID", "int"),
                OutputColumn::new("Extra", "text"),
            ]
        );
        assert_eq!(dropped, vec!["Nope".to_string()]);
    }

    #[test]
    fn test_open_table_keeps_any_column() {
        let (columns, dropped) = output_columns(
            DestinationTable::Permission,
            None,
            &["RoleID", "Garden.Settings.Manage"],
        );
        assert!(dropped.is_empty());
        assert_eq!(columns[1], OutputColumn::new("Garden.Settings.Manage", "tinyint"));
    }
}
