//! Numeric projection of a frame.

use ndarray::Array2;
use polars::prelude::*;

use super::Frame;
use crate::error::{Result, VisualDataError};

/// Integer and floating dtypes. Booleans are not numeric here.
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Keep only the numeric columns, in their original order.
///
/// Fails with [`VisualDataError::NoNumericColumns`] when nothing usable is left,
/// so that a reduction never starts on degenerate input.
pub fn numeric_subset(frame: &Frame) -> Result<Frame> {
    let names: Vec<String> = frame
        .data()
        .get_columns()
        .iter()
        .filter(|c| is_numeric_dtype(c.dtype()))
        .map(|c| c.name().to_string())
        .collect();

    if names.is_empty() || frame.height() == 0 {
        return Err(VisualDataError::NoNumericColumns);
    }
    frame.select_columns(&names)
}

/// Dense row-major matrix of a numeric frame.
pub fn numeric_matrix(frame: &Frame) -> Result<Array2<f64>> {
    let (rows, cols) = (frame.height(), frame.width());
    let mut matrix = Array2::<f64>::zeros((rows, cols));

    for (j, column) in frame.data().get_columns().iter().enumerate() {
        if !is_numeric_dtype(column.dtype()) {
            return Err(VisualDataError::InvalidInput(format!(
                "column '{}' is not numeric",
                column.name()
            )));
        }
        let cast = column
            .cast(&DataType::Float64)
            .map_err(|e| VisualDataError::Internal(e.to_string()))?;
        let values = cast
            .f64()
            .map_err(|e| VisualDataError::Internal(e.to_string()))?;
        for (i, value) in values.into_iter().enumerate() {
            match value {
                Some(v) if !v.is_nan() => matrix[[i, j]] = v,
                _ => {
                    return Err(VisualDataError::InvalidInput(format!(
                        "column '{}' has a missing value at row {}",
                        column.name(),
                        i
                    )))
                }
            }
        }
    }

    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_subset_keeps_order() {
        let frame = Frame::new(
            df!(
                "s" => &["a", "b"],
                "x" => &[1i32, 2],
                "flag" => &[true, false],
                "y" => &[0.5, 1.5]
            )
            .unwrap(),
        );
        let numeric = numeric_subset(&frame).unwrap();
        assert_eq!(numeric.column_names(), vec!["x", "y"]);
        assert_eq!(numeric.keys(), frame.keys());
    }

    #[test]
    fn test_no_numeric_columns() {
        let frame = Frame::new(df!("s" => &["a", "b"]).unwrap());
        assert!(matches!(numeric_subset(&frame), Err(VisualDataError::NoNumericColumns)));
    }

    #[test]
    fn test_zero_rows_is_no_numeric() {
        let frame = Frame::new(df!("x" => &[1.0]).unwrap())
            .filter_rows(&[false])
            .unwrap();
        assert!(matches!(numeric_subset(&frame), Err(VisualDataError::NoNumericColumns)));
    }

    #[test]
    fn test_matrix_layout() {
        let frame = Frame::new(df!("a" => &[1i64, 2, 3], "b" => &[4.0, 5.0, 6.0]).unwrap());
        let m = numeric_matrix(&frame).unwrap();
        assert_eq!(m.shape(), &[3, 2]);
        assert_eq!(m[[2, 0]], 3.0);
        assert_eq!(m[[0, 1]], 4.0);
    }

    #[test]
    fn test_matrix_rejects_missing() {
        let frame = Frame::new(df!("a" => &[Some(1.0), None]).unwrap());
        assert!(numeric_matrix(&frame).is_err());
    }
}
