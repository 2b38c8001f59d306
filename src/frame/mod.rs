//! Keyed tabular frames.
//!
//! A [`Frame`] pairs a polars `DataFrame` with one stable [`RowKey`] per row.
//! Keys are assigned once, when the frame is first materialized, and follow
//! their rows through every filter, take and projection. They are never
//! renumbered, which is what lets a label column be re-attached to rows that
//! survived cleaning.

pub mod builder;
pub mod describe;
pub mod numeric;

pub use builder::{CellValue, FrameBuilder};
pub use describe::{coerce_numeric, describe, summarize, ColumnDescription, ColumnSummary, Summary};
pub use numeric::{is_numeric_dtype, numeric_matrix, numeric_subset};

use std::collections::{HashMap, HashSet};

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VisualDataError};

/// Stable identifier of a row.
pub type RowKey = u64;

/// Role a column plays at the point of use. Computed, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    Numeric,
    Categorical,
    Label,
}

/// Rectangular table with uniquely keyed rows.
#[derive(Debug, Clone)]
pub struct Frame {
    data: DataFrame,
    keys: Vec<RowKey>,
}

fn internal(e: PolarsError) -> VisualDataError {
    VisualDataError::Internal(e.to_string())
}

impl Frame {
    /// Wrap a data frame, assigning keys `0..height`.
    pub fn new(data: DataFrame) -> Self {
        let keys = (0..data.height() as RowKey).collect();
        Self { data, keys }
    }

    /// Wrap a data frame with explicit keys. Keys must be unique and match the height.
    pub fn with_keys(data: DataFrame, keys: Vec<RowKey>) -> Result<Self> {
        if keys.len() != data.height() {
            return Err(VisualDataError::InvalidInput(format!(
                "{} row keys supplied for {} rows",
                keys.len(),
                data.height()
            )));
        }
        let mut seen = HashSet::with_capacity(keys.len());
        if let Some(dup) = keys.iter().find(|k| !seen.insert(**k)) {
            return Err(VisualDataError::InvalidInput(format!("duplicate row key {}", dup)));
        }
        Ok(Self { data, keys })
    }

    pub fn empty() -> Self {
        Self::new(DataFrame::empty())
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    pub fn keys(&self) -> &[RowKey] {
        &self.keys
    }

    pub fn into_parts(self) -> (DataFrame, Vec<RowKey>) {
        (self.data, self.keys)
    }

    pub fn height(&self) -> usize {
        self.data.height()
    }

    pub fn width(&self) -> usize {
        self.data.width()
    }

    /// True when the frame has no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.height() == 0 || self.width() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.data
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.data.column(name).is_ok()
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.data
            .column(name)
            .map_err(|_| VisualDataError::NotFound(format!("column '{}'", name)))
    }

    /// Keep the rows whose mask entry is true.
    pub fn filter_rows(&self, mask: &[bool]) -> Result<Frame> {
        if mask.len() != self.height() {
            return Err(VisualDataError::Internal(format!(
                "row mask of length {} for {} rows",
                mask.len(),
                self.height()
            )));
        }
        let keys = self
            .keys
            .iter()
            .zip(mask)
            .filter_map(|(k, keep)| keep.then_some(*k))
            .collect();
        // Zero-width frames have no columns to filter but still track their rows.
        let data = if self.width() == 0 {
            DataFrame::empty()
        } else {
            self.data
                .filter(&BooleanChunked::from_slice("mask".into(), mask))
                .map_err(internal)?
        };
        Ok(Frame { data, keys })
    }

    /// Select rows by key, in the order the keys are given.
    pub fn take_keys(&self, keys: &[RowKey]) -> Result<Frame> {
        let positions: HashMap<RowKey, usize> =
            self.keys.iter().enumerate().map(|(i, k)| (*k, i)).collect();
        let idx = keys
            .iter()
            .map(|k| {
                positions
                    .get(k)
                    .map(|&i| i as IdxSize)
                    .ok_or_else(|| VisualDataError::Internal(format!("row key {} not in frame", k)))
            })
            .collect::<Result<Vec<IdxSize>>>()?;
        let data = self
            .data
            .take(&IdxCa::from_vec("idx".into(), idx))
            .map_err(internal)?;
        Frame::with_keys(data, keys.to_vec())
    }

    /// Project onto the named columns, keeping row keys.
    pub fn select_columns(&self, names: &[String]) -> Result<Frame> {
        for name in names {
            if !self.has_column(name) {
                return Err(VisualDataError::NotFound(format!("column '{}'", name)));
            }
        }
        let data = self
            .data
            .select(names.iter().map(|s| s.as_str()))
            .map_err(internal)?;
        Ok(Frame {
            data,
            keys: self.keys.clone(),
        })
    }

    /// Values of one column for the given row keys, in key order.
    pub fn column_values_by_keys(&self, name: &str, keys: &[RowKey]) -> Result<Column> {
        if !self.has_column(name) {
            return Err(VisualDataError::LabelColumnNotFound(name.to_string()));
        }
        let subset = self.select_columns(&[name.to_string()])?.take_keys(keys)?;
        subset.column(name).cloned()
    }

    /// Replace (or append) a column. Its length must match the frame height.
    pub fn with_column(&self, column: Column) -> Result<Frame> {
        if self.width() > 0 && column.len() != self.height() {
            return Err(VisualDataError::Internal(format!(
                "column '{}' has {} values for {} rows",
                column.name(),
                column.len(),
                self.height()
            )));
        }
        let mut data = self.data.clone();
        data.with_column(column).map_err(internal)?;
        Frame::with_keys(data, self.keys.clone())
    }

    /// Per-column role. The label column, when given, wins over its dtype.
    pub fn column_roles(&self, label: Option<&str>) -> Vec<(String, ColumnRole)> {
        self.data
            .get_columns()
            .iter()
            .map(|col| {
                let name = col.name().to_string();
                let role = if Some(name.as_str()) == label {
                    ColumnRole::Label
                } else if is_numeric_dtype(col.dtype()) {
                    ColumnRole::Numeric
                } else {
                    ColumnRole::Categorical
                };
                (name, role)
            })
            .collect()
    }

    /// Per-row flag: does the row contain any missing cell?
    pub fn rows_with_missing(&self) -> Vec<bool> {
        let mut flags = vec![false; self.height()];
        for col in self.data.get_columns() {
            for (flag, missing) in flags.iter_mut().zip(missing_mask(col)) {
                *flag |= missing;
            }
        }
        flags
    }

    /// Textual signature of a row, equal for rows with equal cells.
    pub fn row_signature(&self, row: usize) -> String {
        let mut sig = String::new();
        for col in self.data.get_columns() {
            match col.get(row) {
                Ok(value) => sig.push_str(&format!("{:?}", value)),
                Err(_) => sig.push_str("?"),
            }
            sig.push('\u{1f}');
        }
        sig
    }

    /// Rows as JSON objects. Non-finite floats become null.
    pub fn to_records(&self) -> Vec<serde_json::Value> {
        let columns = self.data.get_columns();
        (0..self.height())
            .map(|row| {
                let mut record = serde_json::Map::with_capacity(columns.len());
                for col in columns {
                    let value = col
                        .get(row)
                        .map(|v| any_value_to_json(&v))
                        .unwrap_or(serde_json::Value::Null);
                    record.insert(col.name().to_string(), value);
                }
                serde_json::Value::Object(record)
            })
            .collect()
    }
}

impl From<DataFrame> for Frame {
    fn from(data: DataFrame) -> Self {
        Frame::new(data)
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys && self.data.equals_missing(&other.data)
    }
}

/// Missing flags of a column: null, or NaN for floating columns.
pub fn missing_mask(column: &Column) -> Vec<bool> {
    let series = column.as_materialized_series();
    if matches!(series.dtype(), DataType::Float32 | DataType::Float64) {
        if let Ok(cast) = series.cast(&DataType::Float64) {
            if let Ok(ca) = cast.f64() {
                return ca
                    .into_iter()
                    .map(|v| v.map_or(true, |x| x.is_nan()))
                    .collect();
            }
        }
    }
    series
        .is_null()
        .into_iter()
        .map(|v| v.unwrap_or(true))
        .collect()
}

/// Number of missing cells in a column.
pub fn missing_count(column: &Column) -> usize {
    missing_mask(column).into_iter().filter(|m| *m).count()
}

/// Text content of a string cell, if it is one.
pub fn any_value_as_str(value: &AnyValue) -> Option<String> {
    match value {
        AnyValue::String(s) => Some(s.to_string()),
        AnyValue::StringOwned(s) => Some(s.to_string()),
        _ => None,
    }
}

/// JSON rendering of one cell.
pub fn any_value_to_json(value: &AnyValue) -> serde_json::Value {
    use serde_json::{json, Value};
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => json!(b),
        AnyValue::Int8(v) => json!(v),
        AnyValue::Int16(v) => json!(v),
        AnyValue::Int32(v) => json!(v),
        AnyValue::Int64(v) => json!(v),
        AnyValue::UInt8(v) => json!(v),
        AnyValue::UInt16(v) => json!(v),
        AnyValue::UInt32(v) => json!(v),
        AnyValue::UInt64(v) => json!(v),
        AnyValue::Float32(v) if v.is_finite() => json!(v),
        AnyValue::Float64(v) if v.is_finite() => json!(v),
        AnyValue::Float32(_) | AnyValue::Float64(_) => Value::Null,
        other => match any_value_as_str(other) {
            Some(s) => Value::String(s),
            None => Value::String(other.to_string()),
        },
    }
}
