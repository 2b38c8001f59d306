//! Cell-level frame construction for readers that produce rows of loosely
//! typed values (spreadsheets, SQL result sets, flattened JSON).

use std::collections::HashMap;

use polars::prelude::*;

use super::Frame;
use crate::error::{Result, VisualDataError};

/// One loosely typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    fn render(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::Int(i) => Some(i.to_string()),
            CellValue::Float(f) => Some(f.to_string()),
            CellValue::Text(s) => Some(s.clone()),
        }
    }
}

/// Inferred storage type of a built column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inferred {
    Int,
    Float,
    Bool,
    Text,
}

fn infer(cells: &[CellValue]) -> Inferred {
    let mut kind: Option<Inferred> = None;
    for cell in cells {
        let this = match cell {
            CellValue::Null => continue,
            CellValue::Int(_) => Inferred::Int,
            CellValue::Float(_) => Inferred::Float,
            CellValue::Bool(_) => Inferred::Bool,
            CellValue::Text(_) => return Inferred::Text,
        };
        kind = Some(match (kind, this) {
            (None, t) => t,
            (Some(a), b) if a == b => a,
            (Some(Inferred::Int), Inferred::Float) | (Some(Inferred::Float), Inferred::Int) => {
                Inferred::Float
            }
            _ => return Inferred::Text,
        });
    }
    kind.unwrap_or(Inferred::Text)
}

/// Accumulates rows of [`CellValue`]s under a header and infers column dtypes.
#[derive(Debug, Default)]
pub struct FrameBuilder {
    names: Vec<String>,
    columns: Vec<Vec<CellValue>>,
    rows: usize,
}

impl FrameBuilder {
    /// Start a builder. Blank headers become `Unnamed: i`, repeated ones get `.1`, `.2` suffixes.
    pub fn new<S: AsRef<str>>(headers: &[S]) -> Self {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let names = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let base = h.as_ref().trim();
                let base = if base.is_empty() {
                    format!("Unnamed: {}", i)
                } else {
                    base.to_string()
                };
                let count = seen.entry(base.clone()).or_insert(0);
                let name = if *count == 0 {
                    base.clone()
                } else {
                    format!("{}.{}", base, count)
                };
                *count += 1;
                name
            })
            .collect::<Vec<_>>();
        let columns = vec![Vec::new(); names.len()];
        Self {
            names,
            columns,
            rows: 0,
        }
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Append a row. Short rows are padded with nulls, extra cells are dropped.
    pub fn push_row(&mut self, row: Vec<CellValue>) {
        let mut cells = row.into_iter();
        for column in self.columns.iter_mut() {
            column.push(cells.next().unwrap_or(CellValue::Null));
        }
        self.rows += 1;
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn build(self) -> Result<Frame> {
        let columns = self
            .names
            .into_iter()
            .zip(self.columns)
            .map(|(name, cells)| build_column(&name, &cells))
            .collect::<Vec<_>>();
        let df = DataFrame::new(columns).map_err(|e| VisualDataError::ParseError(e.to_string()))?;
        Ok(Frame::new(df))
    }
}

fn build_column(name: &str, cells: &[CellValue]) -> Column {
    match infer(cells) {
        Inferred::Int => {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|c| match c {
                    CellValue::Int(i) => Some(*i),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), values)
        }
        Inferred::Float => {
            let values: Vec<Option<f64>> = cells
                .iter()
                .map(|c| match c {
                    CellValue::Int(i) => Some(*i as f64),
                    CellValue::Float(f) => Some(*f),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), values)
        }
        Inferred::Bool => {
            let values: Vec<Option<bool>> = cells
                .iter()
                .map(|c| match c {
                    CellValue::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), values)
        }
        Inferred::Text => {
            let values: Vec<Option<String>> = cells.iter().map(CellValue::render).collect();
            Column::new(name.into(), values)
        }
    }
}
