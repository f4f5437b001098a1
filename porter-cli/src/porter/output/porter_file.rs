//! Porter export file: sectioned CSV, one section per destination table

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::{Terminator, WriterBuilder};

use super::{DestinationWriter, ExportFooter, ExportHeader, OutputColumn, OutputError};
use crate::porter::{DestinationTable, Value};

/// Format version written in the file header
pub const FORMAT_VERSION: &str = "1.0";

/// Writes the porter interchange format to any `Write`
pub struct PorterFileWriter<W: Write> {
    inner: W,
}

impl PorterFileWriter<BufWriter<File>> {
    /// Create (or truncate) an export file
    pub fn create(path: impl AsRef<Path>) -> Result<Self, OutputError> {
        let file = File::create(path.as_ref())?;
        Ok(PorterFileWriter::new(BufWriter::new(file)))
    }
}

impl<W: Write> PorterFileWriter<W> {
    pub fn new(inner: W) -> Self {
        PorterFileWriter { inner }
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(mut self) -> Result<W, OutputError> {
        self.inner.flush()?;
        Ok(self.inner)
    }

    /// Write a raw line between CSV sections
    fn line(&mut self, text: &str) -> Result<(), OutputError> {
        writeln!(self.inner, "{}", text)?;
        Ok(())
    }
}

impl<W: Write + Send> DestinationWriter for PorterFileWriter<W> {
    fn begin(&mut self, header: &ExportHeader) -> Result<(), OutputError> {
        self.line(&format!(
            "Porter Export: {}, Source: {}",
            FORMAT_VERSION, header.label
        ))?;
        self.line(&format!(
            "// Started: {}, Character set: {}, Source prefix: {}",
            header.started_at.to_rfc3339(),
            header.character_set,
            header.source_prefix
        ))?;
        self.line("")
    }

    fn write_table(
        &mut self,
        table: DestinationTable,
        columns: &[OutputColumn],
        rows: &[Vec<Value>],
    ) -> Result<(), OutputError> {
        self.line(&format!("Table: {}", table))?;

        let header: Vec<String> = columns
            .iter()
            .map(|c| format!("{}:{}", c.name, c.column_type))
            .collect();

        // Sections differ in width, so each one gets its own CSV writer
        {
            let mut csv = WriterBuilder::new()
                .has_headers(false)
                .flexible(true)
                .terminator(Terminator::Any(b'\n'))
                .from_writer(&mut self.inner);
            csv.write_record(&header)?;
            for row in rows {
                csv.write_record(row.iter().map(Value::to_cell))?;
            }
            csv.flush()?;
        }

        self.line("")
    }

    fn finish(&mut self, footer: &ExportFooter) -> Result<(), OutputError> {
        self.line(&format!(
            "// Completed: {}, Tables: {}, Rows: {}",
            footer.completed_at.to_rfc3339(),
            footer.tables,
            footer.rows
        ))?;
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::porter::SourcePrefix;
    use chrono::{TimeZone, Utc};

    fn render(f: impl FnOnce(&mut PorterFileWriter<Vec<u8>>)) -> String {
        let mut writer = PorterFileWriter::new(Vec::new());
        f(&mut writer);
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_writes_sections() {
        let started = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let out = render(|w| {
            w.begin(&ExportHeader {
                label: "Web Wiz Forums".into(),
                character_set: "utf8".into(),
                source_prefix: SourcePrefix::new("tbl").unwrap(),
                started_at: started,
            })
            .unwrap();
            w.write_table(
                DestinationTable::Role,
                &[OutputColumn::new("RoleID", "int"), OutputColumn::new("Name", "varchar(100)")],
                &[
                    vec![Value::Int(1), Value::from("Admin")],
                    vec![Value::Int(2), Value::Null],
                ],
            )
            .unwrap();
            w.finish(&ExportFooter {
                completed_at: started,
                tables: 1,
                rows: 2,
            })
            .unwrap();
        });

        let expected = "\
Porter Export: 1.0, Source: Web Wiz Forums
// Started: 2024-03-01T12:00:00+00:00, Character set: utf8, Source prefix: tbl

Table: Role
RoleID:int,Name:varchar(100)
1,Admin
2,\\N

// Completed: 2024-03-01T12:00:00+00:00, Tables: 1, Rows: 2
";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_consecutive_sections_of_different_width() {
        let out = render(|w| {
            w.write_table(
                DestinationTable::Role,
                &[OutputColumn::new("RoleID", "int"), OutputColumn::new("Name", "varchar(100)")],
                &[vec![Value::Int(1), Value::from("Admin")]],
            )
            .unwrap();
            w.write_table(
                DestinationTable::UserRole,
                &[
                    OutputColumn::new("UserID", "int"),
                    OutputColumn::new("RoleID", "int"),
                    OutputColumn::new("Note", "varchar(255)"),
                ],
                &[vec![Value::Int(7), Value::Int(1), Value::from("\\N")]],
            )
            .unwrap();
        });

        let expected = "\
Table: Role
RoleID:int,Name:varchar(100)
1,Admin

Table: UserRole
UserID:int,RoleID:int,Note:varchar(255)
7,1,\\\\N

";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_quotes_cells_with_delimiters() {
        let out = render(|w| {
            w.write_table(
                DestinationTable::Comment,
                &[OutputColumn::new("Body", "longtext")],
                &[vec![Value::from("hello, \"world\"\nbye")]],
            )
            .unwrap();
        });

        assert!(out.contains("\"hello, \"\"world\"\"\nbye\""));
    }
}
