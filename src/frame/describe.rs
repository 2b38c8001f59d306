//! Dataset summaries and descriptive statistics.

use std::collections::{HashMap, HashSet};

use polars::prelude::*;
use serde::Serialize;

use super::{any_value_as_str, is_numeric_dtype, missing_count, missing_mask, Frame};
use crate::error::{Result, VisualDataError};
use crate::loading::LoadedData;

/// Per-column entry of a table summary.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub dtype: String,
    pub missing: usize,
}

/// Shape-level overview of whatever a source produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Summary {
    Table {
        rows: usize,
        columns: usize,
        column_info: Vec<ColumnSummary>,
        duplicates: usize,
    },
    Image {
        shape: [usize; 3],
        dtype: String,
    },
    Text {
        length: usize,
        lines: usize,
    },
}

pub fn summarize(data: &LoadedData) -> Summary {
    match data {
        LoadedData::Table(frame) => {
            let column_info = frame
                .data()
                .get_columns()
                .iter()
                .map(|c| ColumnSummary {
                    name: c.name().to_string(),
                    dtype: c.dtype().to_string(),
                    missing: missing_count(c),
                })
                .collect();
            let mut seen = HashSet::with_capacity(frame.height());
            let duplicates = (0..frame.height())
                .filter(|&i| !seen.insert(frame.row_signature(i)))
                .count();
            Summary::Table {
                rows: frame.height(),
                columns: frame.width(),
                column_info,
                duplicates,
            }
        }
        LoadedData::Pixels(pixels) => Summary::Image {
            shape: [pixels.height, pixels.width, 3],
            dtype: "uint8".to_string(),
        },
        LoadedData::Text(text) => Summary::Text {
            length: text.chars().count(),
            lines: text.lines().count(),
        },
    }
}

/// Statistics of one column.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ColumnDescription {
    Numeric {
        name: String,
        count: usize,
        mean: Option<f64>,
        std: Option<f64>,
        min: Option<f64>,
        #[serde(rename = "25%")]
        q25: Option<f64>,
        #[serde(rename = "50%")]
        q50: Option<f64>,
        #[serde(rename = "75%")]
        q75: Option<f64>,
        max: Option<f64>,
    },
    Categorical {
        name: String,
        count: usize,
        unique: usize,
        top: Option<String>,
        freq: usize,
    },
}

impl ColumnDescription {
    pub fn name(&self) -> &str {
        match self {
            ColumnDescription::Numeric { name, .. } | ColumnDescription::Categorical { name, .. } => name,
        }
    }
}

/// Linear-interpolated quantile of sorted values.
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

fn present_f64(column: &Column) -> Result<Vec<f64>> {
    let cast = column
        .cast(&DataType::Float64)
        .map_err(|e| VisualDataError::Internal(e.to_string()))?;
    let values = cast
        .f64()
        .map_err(|e| VisualDataError::Internal(e.to_string()))?;
    Ok(values.into_iter().flatten().filter(|v| !v.is_nan()).collect())
}

fn describe_numeric(column: &Column) -> Result<ColumnDescription> {
    let mut values = present_f64(column)?;
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    let mean = (n > 0).then(|| values.iter().sum::<f64>() / n as f64);
    let std = match mean {
        Some(m) if n > 1 => {
            let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
            Some((ss / (n - 1) as f64).sqrt())
        }
        _ => None,
    };
    Ok(ColumnDescription::Numeric {
        name: column.name().to_string(),
        count: n,
        mean,
        std,
        min: values.first().copied(),
        q25: quantile(&values, 0.25),
        q50: quantile(&values, 0.5),
        q75: quantile(&values, 0.75),
        max: values.last().copied(),
    })
}

fn describe_categorical(column: &Column) -> ColumnDescription {
    let missing = missing_mask(column);
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for (i, is_missing) in missing.into_iter().enumerate() {
        if is_missing {
            continue;
        }
        let value = match column.get(i) {
            Ok(v) => any_value_as_str(&v).unwrap_or_else(|| v.to_string()),
            Err(_) => continue,
        };
        let entry = counts.entry(value.clone()).or_insert(0);
        if *entry == 0 {
            order.push(value);
        }
        *entry += 1;
    }
    let count = counts.values().sum();
    // Ties resolve to the value seen first.
    let top = order
        .iter()
        .fold(None::<(&String, usize)>, |best, v| {
            let c = counts[v];
            match best {
                Some((_, bc)) if bc >= c => best,
                _ => Some((v, c)),
            }
        });
    ColumnDescription::Categorical {
        name: column.name().to_string(),
        count,
        unique: counts.len(),
        top: top.map(|(v, _)| v.clone()),
        freq: top.map(|(_, c)| c).unwrap_or(0),
    }
}

/// Describe every column: numeric ones first, then the rest.
pub fn describe(frame: &Frame) -> Result<Vec<ColumnDescription>> {
    let columns = frame.data().get_columns();
    let mut out = Vec::with_capacity(columns.len());
    for column in columns.iter().filter(|c| is_numeric_dtype(c.dtype())) {
        out.push(describe_numeric(column)?);
    }
    for column in columns.iter().filter(|c| !is_numeric_dtype(c.dtype())) {
        out.push(describe_categorical(column));
    }
    Ok(out)
}

/// Convert text columns that are mostly numeric into Float64. Cells that do not
/// parse become null.
pub fn coerce_numeric(frame: &Frame) -> Result<Frame> {
    let mut result = frame.clone();
    for column in frame.data().get_columns() {
        if !matches!(column.dtype(), DataType::String) {
            continue;
        }
        let text = column
            .str()
            .map_err(|e| VisualDataError::Internal(e.to_string()))?;
        let mut present = 0usize;
        let mut parsed_ok = 0usize;
        let parsed: Vec<Option<f64>> = text
            .into_iter()
            .map(|cell| {
                let cell = cell?.trim();
                if cell.is_empty() {
                    return None;
                }
                present += 1;
                let value = cell.parse::<f64>().ok();
                if value.is_some() {
                    parsed_ok += 1;
                }
                value
            })
            .collect();
        if present > 0 && parsed_ok * 2 > present {
            result = result.with_column(Column::new(column.name().clone(), parsed))?;
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loading::PixelMatrix;

    #[test]
    fn test_summarize_table() {
        let frame = Frame::new(
            df!(
                "a" => &[Some(1.0), Some(1.0), None],
                "b" => &["x", "x", "y"]
            )
            .unwrap(),
        );
        match summarize(&LoadedData::Table(frame)) {
            Summary::Table { rows, columns, column_info, duplicates } => {
                assert_eq!(rows, 3);
                assert_eq!(columns, 2);
                assert_eq!(column_info[0].missing, 1);
                assert_eq!(duplicates, 1);
            }
            other => panic!("unexpected summary {:?}", other),
        }
    }

    #[test]
    fn test_summarize_text_and_image() {
        let text = summarize(&LoadedData::Text("one\ntwo\n".into()));
        assert!(matches!(text, Summary::Text { length: 8, lines: 2 }));

        let pixels = PixelMatrix::new(ndarray::Array3::zeros((4, 5, 3)));
        let image = summarize(&LoadedData::Pixels(pixels));
        assert!(matches!(image, Summary::Image { shape: [4, 5, 3], .. }));
    }

    #[test]
    fn test_describe_numeric_quantiles() {
        let frame = Frame::new(df!("x" => &[1.0, 2.0, 3.0, 4.0]).unwrap());
        let stats = describe(&frame).unwrap();
        match &stats[0] {
            ColumnDescription::Numeric { count, mean, q25, q50, q75, std, .. } => {
                assert_eq!(*count, 4);
                assert_eq!(*mean, Some(2.5));
                assert_eq!(*q25, Some(1.75));
                assert_eq!(*q50, Some(2.5));
                assert_eq!(*q75, Some(3.25));
                assert!((std.unwrap() - 1.2909944).abs() < 1e-6);
            }
            other => panic!("unexpected description {:?}", other),
        }
    }

    #[test]
    fn test_describe_categorical() {
        let frame = Frame::new(df!("c" => &[Some("a"), Some("b"), Some("b"), None]).unwrap());
        let stats = describe(&frame).unwrap();
        match &stats[0] {
            ColumnDescription::Categorical { count, unique, top, freq, .. } => {
                assert_eq!(*count, 3);
                assert_eq!(*unique, 2);
                assert_eq!(top.as_deref(), Some("b"));
                assert_eq!(*freq, 2);
            }
            other => panic!("unexpected description {:?}", other),
        }
    }

    #[test]
    fn test_coerce_numeric() {
        let frame = Frame::new(
            df!(
                "mostly" => &["1", "2.5", "oops"],
                "words" => &["a", "b", "3"]
            )
            .unwrap(),
        );
        let coerced = coerce_numeric(&frame).unwrap();
        assert_eq!(coerced.column("mostly").unwrap().dtype(), &DataType::Float64);
        assert_eq!(coerced.column("mostly").unwrap().null_count(), 1);
        assert_eq!(coerced.column("words").unwrap().dtype(), &DataType::String);
    }
}
