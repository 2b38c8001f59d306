//! SQL query sources backed by a local SQLite database.

use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use crate::error::{Result, VisualDataError};
use crate::frame::{CellValue, Frame, FrameBuilder};

fn value(v: ValueRef<'_>) -> CellValue {
    match v {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(i) => CellValue::Int(i),
        ValueRef::Real(f) => CellValue::Float(f),
        ValueRef::Text(t) => CellValue::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => CellValue::Text(format!("<{} bytes>", b.len())),
    }
}

/// Run `query` against the database at `db_path` (opened read-only).
pub fn read_query(db_path: &Path, query: &str) -> Result<Frame> {
    if !db_path.is_file() {
        return Err(VisualDataError::NotFound(format!("database {}", db_path.display())));
    }
    let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| VisualDataError::SourceUnreachable(format!("cannot open database: {}", e)))?;
    let mut stmt = conn
        .prepare(query)
        .map_err(|e| VisualDataError::ParseError(format!("invalid query: {}", e)))?;
    let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let width = names.len();

    let mut builder = FrameBuilder::new(&names);
    let mut rows = stmt
        .query([])
        .map_err(|e| VisualDataError::ParseError(format!("query failed: {}", e)))?;
    while let Some(row) = rows
        .next()
        .map_err(|e| VisualDataError::ParseError(format!("query failed: {}", e)))?
    {
        let mut cells = Vec::with_capacity(width);
        for i in 0..width {
            let v = row
                .get_ref(i)
                .map_err(|e| VisualDataError::ParseError(e.to_string()))?;
            cells.push(value(v));
        }
        builder.push_row(cells);
    }
    builder.build()
}
