//! SQLite export of a frame
//!
//! Writes every column of a [`Frame`] into one table. Row keys stay in
//! memory; only the data columns are persisted.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use polars::prelude::*;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, VisualDataError};
use crate::frame::{any_value_as_str, Frame};

/// What to do when the target table already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    #[default]
    Fail,
    Replace,
    Append,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConflictPolicy::Fail => "fail",
            ConflictPolicy::Replace => "replace",
            ConflictPolicy::Append => "append",
        })
    }
}

impl FromStr for ConflictPolicy {
    type Err = VisualDataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(ConflictPolicy::Fail),
            "replace" => Ok(ConflictPolicy::Replace),
            "append" => Ok(ConflictPolicy::Append),
            other => Err(VisualDataError::InvalidInput(format!(
                "if_exists must be one of fail, replace, append; got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub table: String,
    pub rows_written: usize,
    pub columns: Vec<String>,
    pub policy: ConflictPolicy,
}

/// Column storage class derived from the polars dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Affinity {
    Integer,
    Real,
    Text,
}

impl Affinity {
    fn of(dtype: &DataType) -> Self {
        match dtype {
            DataType::Boolean
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => Affinity::Integer,
            DataType::Float32 | DataType::Float64 => Affinity::Real,
            _ => Affinity::Text,
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            Affinity::Integer => "INTEGER",
            Affinity::Real => "REAL",
            Affinity::Text => "TEXT",
        }
    }

    fn convert(&self, value: AnyValue) -> SqlValue {
        if matches!(value, AnyValue::Null) {
            return SqlValue::Null;
        }
        match self {
            Affinity::Integer => match value {
                AnyValue::Boolean(b) => SqlValue::Integer(i64::from(b)),
                // u64 beyond i64::MAX is stored as REAL rather than wrapped.
                AnyValue::UInt64(v) => match i64::try_from(v) {
                    Ok(i) => SqlValue::Integer(i),
                    Err(_) => SqlValue::Real(v as f64),
                },
                other => other.extract::<i64>().map_or(SqlValue::Null, SqlValue::Integer),
            },
            Affinity::Real => match value.extract::<f64>() {
                Some(v) if !v.is_nan() => SqlValue::Real(v),
                _ => SqlValue::Null,
            },
            Affinity::Text => SqlValue::Text(any_value_as_str(&value).unwrap_or_else(|| value.to_string())),
        }
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn export_err(context: &str, e: rusqlite::Error) -> VisualDataError {
    VisualDataError::Export(format!("{}: {}", context, e))
}

/// Writes frames into a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteExporter {
    db_path: PathBuf,
}

impl SqliteExporter {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn export(&self, frame: &Frame, table: &str, policy: ConflictPolicy) -> Result<ExportSummary> {
        let table = table.trim();
        if table.is_empty() {
            return Err(VisualDataError::InvalidInput("table name must not be empty".into()));
        }
        if frame.width() == 0 {
            return Err(VisualDataError::InvalidInput("cannot export a frame without columns".into()));
        }

        let mut conn = Connection::open(&self.db_path)
            .map_err(|e| export_err(&format!("Failed to open {}", self.db_path.display()), e))?;
        let tx = conn
            .transaction()
            .map_err(|e| export_err("Failed to begin transaction", e))?;

        let exists = tx
            .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")
            .and_then(|mut stmt| stmt.exists(params![table]))
            .map_err(|e| export_err("Failed to inspect schema", e))?;

        let quoted = quote_ident(table);
        match (exists, policy) {
            (true, ConflictPolicy::Fail) => return Err(VisualDataError::ExportConflict(table.to_string())),
            (true, ConflictPolicy::Replace) => {
                tx.execute_batch(&format!("DROP TABLE {}", quoted))
                    .map_err(|e| export_err("Failed to drop table", e))?;
            }
            _ => {}
        }

        let columns = frame.data().get_columns();
        let affinities: Vec<Affinity> = columns.iter().map(|c| Affinity::of(c.dtype())).collect();
        let definitions: Vec<String> = columns
            .iter()
            .zip(&affinities)
            .map(|(c, a)| format!("{} {}", quote_ident(c.name()), a.sql()))
            .collect();
        tx.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quoted,
            definitions.join(", ")
        ))
        .map_err(|e| export_err("Failed to create table", e))?;

        let names: Vec<String> = columns.iter().map(|c| quote_ident(c.name())).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quoted,
            names.join(", "),
            placeholders.join(", ")
        );

        {
            let mut stmt = tx
                .prepare(&insert)
                .map_err(|e| export_err("Failed to prepare insert", e))?;
            for row in 0..frame.height() {
                let values: Vec<SqlValue> = columns
                    .iter()
                    .zip(&affinities)
                    .map(|(c, a)| c.get(row).map_or(SqlValue::Null, |v| a.convert(v)))
                    .collect();
                stmt.execute(params_from_iter(values))
                    .map_err(|e| export_err(&format!("Failed to insert row {}", row), e))?;
            }
        }

        tx.commit().map_err(|e| export_err("Failed to commit", e))?;

        info!(
            db = %self.db_path.display(),
            table = table,
            rows = frame.height(),
            policy = %policy,
            "Exported frame to SQLite"
        );

        Ok(ExportSummary {
            table: table.to_string(),
            rows_written: frame.height(),
            columns: frame.column_names(),
            policy,
        })
    }
}
