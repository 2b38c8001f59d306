//! Missing-value and duplicate-row handling.
//!
//! Order is fixed: duplicates are removed first, then missing values are
//! handled. Dropping rows with missing values wins over imputation. When
//! imputation runs, duplicates are checked once more, since filled rows can
//! collide with each other.

use std::collections::HashSet;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, VisualDataError};
use crate::frame::{is_numeric_dtype, missing_mask, Frame};

/// How missing values are filled when rows are not dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Imputation {
    #[default]
    None,
    /// Column mean (numeric columns only)
    Mean,
    /// Column median (numeric columns only)
    Median,
    /// Fixed sentinel: 0 for numbers, "0" for text, false for booleans
    #[serde(alias = "fill")]
    Constant,
}

impl std::str::FromStr for Imputation {
    type Err = VisualDataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Imputation::None),
            "mean" => Ok(Imputation::Mean),
            "median" => Ok(Imputation::Median),
            "constant" | "fill" => Ok(Imputation::Constant),
            other => Err(VisualDataError::InvalidInput(format!(
                "unknown imputation strategy '{}' (expected none, mean, median or fill)",
                other
            ))),
        }
    }
}

/// Cleaning configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningPolicy {
    pub drop_missing: bool,
    pub drop_duplicates: bool,
    pub imputation: Imputation,
}

impl CleaningPolicy {
    /// Policy used ahead of every reduction.
    pub fn drop_missing_only() -> Self {
        Self::default().with_drop_missing(true)
    }

    pub fn with_drop_missing(mut self, drop: bool) -> Self {
        self.drop_missing = drop;
        self
    }

    pub fn with_drop_duplicates(mut self, drop: bool) -> Self {
        self.drop_duplicates = drop;
        self
    }

    pub fn with_imputation(mut self, imputation: Imputation) -> Self {
        self.imputation = imputation;
        self
    }
}

/// What a cleaning pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub rows_before: usize,
    pub rows_after: usize,
    pub duplicates_removed: usize,
    pub missing_rows_removed: usize,
    pub values_imputed: usize,
}

/// Applies a [`CleaningPolicy`]. Row keys of surviving rows are preserved.
#[derive(Debug, Clone, Default)]
pub struct Cleaner {
    policy: CleaningPolicy,
}

impl Cleaner {
    pub fn new(policy: CleaningPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &CleaningPolicy {
        &self.policy
    }

    pub fn clean(&self, frame: &Frame) -> Result<Frame> {
        self.clean_with_report(frame).map(|(frame, _)| frame)
    }

    pub fn clean_with_report(&self, frame: &Frame) -> Result<(Frame, CleaningReport)> {
        let mut report = CleaningReport {
            rows_before: frame.height(),
            ..Default::default()
        };
        if frame.is_empty() {
            report.rows_after = frame.height();
            return Ok((frame.clone(), report));
        }

        let mut current = frame.clone();

        if self.policy.drop_duplicates {
            let (deduped, removed) = drop_duplicate_rows(current)?;
            current = deduped;
            report.duplicates_removed = removed;
        }

        if self.policy.drop_missing {
            let mask: Vec<bool> = current.rows_with_missing().into_iter().map(|m| !m).collect();
            report.missing_rows_removed = mask.iter().filter(|keep| !**keep).count();
            if report.missing_rows_removed > 0 {
                current = current.filter_rows(&mask)?;
            }
        } else if self.policy.imputation != Imputation::None {
            let (imputed, count) = impute(&current, self.policy.imputation)?;
            current = imputed;
            report.values_imputed = count;

            if self.policy.drop_duplicates && count > 0 {
                let (deduped, removed) = drop_duplicate_rows(current)?;
                current = deduped;
                report.duplicates_removed += removed;
            }
        }

        report.rows_after = current.height();
        debug!(
            rows_before = report.rows_before,
            rows_after = report.rows_after,
            duplicates_removed = report.duplicates_removed,
            missing_rows_removed = report.missing_rows_removed,
            values_imputed = report.values_imputed,
            "Cleaning finished"
        );
        Ok((current, report))
    }
}

/// Keep the first occurrence of every row.
fn drop_duplicate_rows(frame: Frame) -> Result<(Frame, usize)> {
    let mut seen = HashSet::with_capacity(frame.height());
    let mask: Vec<bool> = (0..frame.height())
        .map(|i| seen.insert(frame.row_signature(i)))
        .collect();
    let removed = mask.iter().filter(|keep| !**keep).count();
    if removed == 0 {
        return Ok((frame, 0));
    }
    Ok((frame.filter_rows(&mask)?, removed))
}

fn internal(e: PolarsError) -> VisualDataError {
    VisualDataError::Internal(e.to_string())
}

fn impute(frame: &Frame, strategy: Imputation) -> Result<(Frame, usize)> {
    let mut result = frame.clone();
    let mut imputed = 0;

    for column in frame.data().get_columns() {
        let mask = missing_mask(column);
        let missing = mask.iter().filter(|m| **m).count();
        if missing == 0 {
            continue;
        }
        let replacement = match strategy {
            Imputation::None => None,
            Imputation::Mean | Imputation::Median => impute_statistic(column, &mask, strategy)?,
            Imputation::Constant => impute_constant(column, &mask)?,
        };
        if let Some(new_column) = replacement {
            imputed += missing;
            result = result.with_column(new_column)?;
        }
    }
    Ok((result, imputed))
}

fn float_values(column: &Column) -> Result<Vec<Option<f64>>> {
    let cast = column.cast(&DataType::Float64).map_err(internal)?;
    let ca = cast.f64().map_err(internal)?;
    Ok(ca.into_iter().collect())
}

fn impute_statistic(column: &Column, mask: &[bool], strategy: Imputation) -> Result<Option<Column>> {
    if !is_numeric_dtype(column.dtype()) {
        return Ok(None);
    }
    let values = float_values(column)?;
    let mut present: Vec<f64> = values
        .iter()
        .zip(mask)
        .filter_map(|(v, missing)| if *missing { None } else { *v })
        .collect();
    if present.is_empty() {
        return Ok(None);
    }
    let fill = if strategy == Imputation::Mean {
        present.iter().sum::<f64>() / present.len() as f64
    } else {
        present.sort_by(|a, b| a.total_cmp(b));
        let mid = present.len() / 2;
        if present.len() % 2 == 0 {
            (present[mid - 1] + present[mid]) / 2.0
        } else {
            present[mid]
        }
    };
    let filled: Vec<f64> = values
        .into_iter()
        .zip(mask)
        .map(|(v, missing)| if *missing { fill } else { v.unwrap_or(fill) })
        .collect();
    Ok(Some(Column::new(column.name().clone(), filled)))
}

fn impute_constant(column: &Column, mask: &[bool]) -> Result<Option<Column>> {
    let name = column.name().clone();
    let filled = match column.dtype() {
        DataType::Float32 | DataType::Float64 => {
            let values: Vec<f64> = float_values(column)?
                .into_iter()
                .zip(mask)
                .map(|(v, missing)| if *missing { 0.0 } else { v.unwrap_or(0.0) })
                .collect();
            Column::new(name, values)
        }
        dtype if is_numeric_dtype(dtype) => {
            let cast = column.cast(&DataType::Int64).map_err(internal)?;
            let values: Vec<i64> = cast
                .i64()
                .map_err(internal)?
                .into_iter()
                .map(|v| v.unwrap_or(0))
                .collect();
            Column::new(name, values)
        }
        DataType::String => {
            let values: Vec<String> = column
                .str()
                .map_err(internal)?
                .into_iter()
                .map(|v| v.unwrap_or("0").to_string())
                .collect();
            Column::new(name, values)
        }
        DataType::Boolean => {
            let values: Vec<bool> = column
                .bool()
                .map_err(internal)?
                .into_iter()
                .map(|v| v.unwrap_or(false))
                .collect();
            Column::new(name, values)
        }
        _ => return Ok(None),
    };
    Ok(Some(filled))
}
