//! End-to-end reduction: clean, project, choose, reduce, re-attach the label.

use std::time::Instant;

use polars::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use super::{reducer_for, AutoSelector, ReductionMethod, ReductionRequest, TargetDim};
use crate::cleaning::{Cleaner, CleaningPolicy};
use crate::error::{Result, VisualDataError};
use crate::frame::{numeric_matrix, numeric_subset, Frame};

/// Tidy output of a reduction.
///
/// `frame` holds the coordinate columns followed by the optional label
/// column, keyed by the rows that survived cleaning.
#[derive(Debug, Clone)]
pub struct ReductionResult {
    pub frame: Frame,
    /// Method actually run (never `Auto`)
    pub method: ReductionMethod,
    pub dim: TargetDim,
    pub coordinate_columns: Vec<String>,
    pub label_column: Option<String>,
}

/// Lightweight description of a result, for logs and API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ResultOverview {
    pub method: ReductionMethod,
    pub dim: usize,
    pub rows: usize,
    pub coordinate_columns: Vec<String>,
    pub label_column: Option<String>,
}

impl ReductionResult {
    pub fn overview(&self) -> ResultOverview {
        ResultOverview {
            method: self.method,
            dim: self.dim.get(),
            rows: self.frame.height(),
            coordinate_columns: self.coordinate_columns.clone(),
            label_column: self.label_column.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    selector: AutoSelector,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selector(mut self, selector: AutoSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn run(&self, raw: &Frame, request: &ReductionRequest) -> Result<ReductionResult> {
        let start = Instant::now();

        // Reducers cannot take missing values, whatever the caller cleaned before.
        let cleaned = Cleaner::new(CleaningPolicy::drop_missing_only()).clean(raw)?;
        let numeric = numeric_subset(&cleaned)?;

        if let Some(label) = &request.label_column {
            if !raw.has_column(label) {
                return Err(VisualDataError::LabelColumnNotFound(label.clone()));
            }
        }

        let method = match request.method {
            ReductionMethod::Auto => self.selector.select(&numeric, request.dim),
            method => method,
        };

        info!(
            method = %method,
            rows = numeric.height(),
            columns = numeric.width(),
            dim = request.dim.get(),
            dropped_rows = raw.height() - cleaned.height(),
            "Starting reduction"
        );

        let matrix = numeric_matrix(&numeric)?;
        let reducer = reducer_for(method, &request.params)?;
        let coords = reducer.reduce(&matrix, request.dim).map_err(|e| match e {
            e @ (VisualDataError::InvalidHyperparameter { .. }
            | VisualDataError::InsufficientRank { .. }
            | VisualDataError::ReductionFailed { .. }) => e,
            other => {
                warn!(method = %method, error = %other, "Reduction strategy failed");
                VisualDataError::reduction_failed(method, other)
            }
        })?;

        if coords.dim() != (numeric.height(), request.dim.get()) {
            return Err(VisualDataError::reduction_failed(
                method,
                format!("strategy returned shape {:?}", coords.dim()),
            ));
        }

        let coordinate_columns = method.column_names(request.dim);
        let columns: Vec<Column> = coordinate_columns
            .iter()
            .enumerate()
            .map(|(c, name)| Column::new(name.as_str().into(), coords.column(c).to_vec()))
            .collect();
        let data = DataFrame::new(columns).map_err(|e| VisualDataError::Internal(e.to_string()))?;
        let mut frame = Frame::with_keys(data, numeric.keys().to_vec())?;

        if let Some(label) = &request.label_column {
            if coordinate_columns.contains(label) {
                return Err(VisualDataError::InvalidInput(format!(
                    "label column '{}' collides with a coordinate column",
                    label
                )));
            }
            let values = cleaned.column_values_by_keys(label, numeric.keys())?;
            frame = frame.with_column(values)?;
        }

        info!(
            method = %method,
            rows = frame.height(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Reduction finished"
        );

        Ok(ReductionResult {
            frame,
            method,
            dim: request.dim,
            coordinate_columns,
            label_column: request.label_column.clone(),
        })
    }
}
