//! Flattening of JSON-like documents into tabular form.
//!
//! An array of objects gives one row per object, a single object gives one
//! row. Nested objects are flattened into `parent.child` columns; arrays
//! inside a record are kept as their JSON text.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::{Result, VisualDataError};
use crate::frame::{CellValue, Frame, FrameBuilder};

fn leaf(value: &Value) -> CellValue {
    match value {
        Value::Null => CellValue::Null,
        Value::Bool(b) => CellValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => CellValue::Int(i),
            None => n.as_f64().map(CellValue::Float).unwrap_or(CellValue::Null),
        },
        Value::String(s) => CellValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => CellValue::Text(value.to_string()),
    }
}

fn flatten_into(prefix: &str, object: &Map<String, Value>, out: &mut Vec<(String, CellValue)>) {
    for (key, value) in object {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::Object(inner) => flatten_into(&name, inner, out),
            other => out.push((name, leaf(other))),
        }
    }
}

/// Turn a parsed document into a frame.
pub fn normalize(document: &Value) -> Result<Frame> {
    let records: Vec<&Map<String, Value>> = match document {
        Value::Object(object) => vec![object],
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(object) => Ok(object),
                other => Err(VisualDataError::ParseError(format!(
                    "expected an array of records, found element {}",
                    other
                ))),
            })
            .collect::<Result<_>>()?,
        other => {
            return Err(VisualDataError::ParseError(format!(
                "expected a record or an array of records, found {}",
                kind(other)
            )))
        }
    };

    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut rows: Vec<Vec<(String, CellValue)>> = Vec::with_capacity(records.len());
    for record in records {
        let mut flat = Vec::new();
        flatten_into("", record, &mut flat);
        for (name, _) in &flat {
            if !positions.contains_key(name) {
                positions.insert(name.clone(), columns.len());
                columns.push(name.clone());
            }
        }
        rows.push(flat);
    }

    let mut builder = FrameBuilder::new(&columns);
    for flat in rows {
        let mut row = vec![CellValue::Null; columns.len()];
        for (name, cell) in flat {
            if let Some(&i) = positions.get(&name) {
                row[i] = cell;
            }
        }
        builder.push_row(row);
    }
    builder.build()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub fn parse_json(bytes: &[u8]) -> Result<Frame> {
    let document: Value =
        serde_json::from_slice(bytes).map_err(|e| VisualDataError::ParseError(format!("invalid JSON: {}", e)))?;
    normalize(&document)
}

pub fn parse_yaml(bytes: &[u8]) -> Result<Frame> {
    let document: Value =
        serde_yaml::from_slice(bytes).map_err(|e| VisualDataError::ParseError(format!("invalid YAML: {}", e)))?;
    normalize(&document)
}
