//! SQLite source store backed by sqlx

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Column, Executor, Row, Sqlite, TypeInfo, ValueRef};

use super::{ResultSet, SourceError, SourceRow, SourceStore, StagedTable};
use crate::porter::Value;

/// Source store reading a forum database from SQLite
#[derive(Debug, Clone)]
pub struct SqliteSource {
    pool: SqlitePool,
}

impl SqliteSource {
    /// Open a database from a file path or a `sqlite:` URL
    ///
    /// The pool holds a single connection: staged tables and every query of
    /// a run must see the same session.
    pub async fn connect(location: &str) -> Result<Self, SourceError> {
        let options = if location.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(location)?
        } else {
            if !std::path::Path::new(location).exists() {
                return Err(SourceError::InvalidLocation {
                    location: location.to_string(),
                    message: "file does not exist".to_string(),
                });
            }
            SqliteConnectOptions::new().filename(location)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options.create_if_missing(false))
            .await?;

        log::debug!("Connected to SQLite source at {}", location);
        Ok(SqliteSource { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        SqliteSource { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn describe_columns(&self, sql: &str) -> Result<Vec<String>, SourceError> {
        let describe = (&self.pool).describe(sql).await?;
        Ok(describe
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect())
    }
}

#[async_trait]
impl SourceStore for SqliteSource {
    async fn fetch(&self, sql: &str) -> Result<ResultSet, SourceError> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;

        // Column names come from the first row; an empty result needs a describe
        let columns = match rows.first() {
            Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
            None => self.describe_columns(sql).await?,
        };

        let rows = rows
            .iter()
            .map(decode_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ResultSet::new(columns, rows))
    }

    async fn character_set(&self, table: &str) -> Result<Option<String>, SourceError> {
        let found: Option<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type IN ('table', 'view') AND name = ? COLLATE NOCASE",
        )
        .bind(table)
        .fetch_optional(&self.pool)
        .await?;

        if found.is_none() {
            return Ok(None);
        }

        let encoding: String = sqlx::query_scalar("PRAGMA encoding")
            .fetch_one(&self.pool)
            .await?;

        // "UTF-8" -> "utf8", "UTF-16le" -> "utf16le"
        Ok(Some(encoding.to_ascii_lowercase().replace('-', "")))
    }

    async fn stage(&self, table: &StagedTable) -> Result<(), SourceError> {
        let name = quote_ident(&table.name);
        let column_defs = table
            .columns
            .iter()
            .map(|(c, ty)| format!("{} {}", quote_ident(c), ty))
            .collect::<Vec<_>>()
            .join(", ");
        let column_names = table
            .columns
            .iter()
            .map(|(c, _)| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; table.columns.len()].join(", ");

        let drop_sql = format!("DROP TABLE IF EXISTS {}", name);
        let create_sql = format!("CREATE TABLE {} ({})", name, column_defs);
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            name, column_names, placeholders
        );

        let mut tx = self.pool.begin().await?;
        sqlx::query(&drop_sql).execute(&mut *tx).await?;
        sqlx::query(&create_sql).execute(&mut *tx).await?;
        for row in &table.rows {
            let mut query = sqlx::query(&insert_sql);
            for value in row {
                query = bind_value(query, value);
            }
            query.execute(&mut *tx).await?;
        }
        tx.commit().await?;

        log::debug!("Staged {} rows into {}", table.rows.len(), table.name);
        Ok(())
    }

    async fn drop_staged(&self, name: &str) -> Result<(), SourceError> {
        let sql = format!("DROP TABLE IF EXISTS {}", quote_ident(name));
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::String(s) => query.bind(s.clone()),
        Value::Int(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::Bool(b) => query.bind(*b),
    }
}

fn decode_row(row: &SqliteRow) -> Result<SourceRow, sqlx::Error> {
    let mut out = SourceRow::new();
    for (idx, column) in row.columns().iter().enumerate() {
        out.push(column.name(), decode_cell(row, idx)?);
    }
    Ok(out)
}

/// Decode a cell by its runtime storage class
///
/// Text and blobs are read as bytes; invalid UTF-8 (legacy latin1 posts)
/// is replaced rather than failing the whole table.
fn decode_cell(row: &SqliteRow, idx: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let kind = raw.type_info().name().to_ascii_uppercase();

    let value = match kind.as_str() {
        "INTEGER" | "BOOLEAN" => Value::Int(row.try_get_unchecked::<i64, _>(idx)?),
        "REAL" => Value::Float(row.try_get_unchecked::<f64, _>(idx)?),
        _ => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(idx)?;
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        }
    };
    Ok(value)
}
