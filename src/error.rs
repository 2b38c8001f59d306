//! Error types for the visualdata pipeline

use thiserror::Error;

/// Result type alias for visualdata operations
pub type Result<T> = std::result::Result<T, VisualDataError>;

/// Every failure the pipeline can surface.
///
/// Third-party errors are mapped into one of these kinds with an explicit
/// `map_err` where they are caught; there are no blanket `From` impls.
#[derive(Error, Debug)]
pub enum VisualDataError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Source unreachable: {0}")]
    SourceUnreachable(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("No numeric columns available after cleaning")]
    NoNumericColumns,

    #[error("Label column not found: {0}")]
    LabelColumnNotFound(String),

    #[error("Invalid hyperparameter: {name} = {value}, {reason}")]
    InvalidHyperparameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Insufficient rank: requested {requested} components, data supports at most {available}")]
    InsufficientRank { requested: usize, available: usize },

    #[error("Reduction failed ({method}): {cause}")]
    ReductionFailed { method: String, cause: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Table already exists: {0}")]
    ExportConflict(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VisualDataError {
    pub fn invalid_hyperparameter(
        name: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        VisualDataError::InvalidHyperparameter {
            name: name.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn reduction_failed(method: impl ToString, cause: impl ToString) -> Self {
        VisualDataError::ReductionFailed {
            method: method.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Stable machine-readable name of the kind.
    pub fn kind(&self) -> &'static str {
        match self {
            VisualDataError::AccessDenied(_) => "access_denied",
            VisualDataError::NotFound(_) => "not_found",
            VisualDataError::SourceUnreachable(_) => "source_unreachable",
            VisualDataError::UnsupportedFormat(_) => "unsupported_format",
            VisualDataError::ParseError(_) => "parse_error",
            VisualDataError::NoNumericColumns => "no_numeric_columns",
            VisualDataError::LabelColumnNotFound(_) => "label_column_not_found",
            VisualDataError::InvalidHyperparameter { .. } => "invalid_hyperparameter",
            VisualDataError::InsufficientRank { .. } => "insufficient_rank",
            VisualDataError::ReductionFailed { .. } => "reduction_failed",
            VisualDataError::InvalidInput(_) => "invalid_input",
            VisualDataError::Storage(_) => "storage",
            VisualDataError::ExportConflict(_) => "export_conflict",
            VisualDataError::Export(_) => "export",
            VisualDataError::Internal(_) => "internal",
        }
    }

    /// True when the caller's input caused the failure.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            VisualDataError::ReductionFailed { .. }
                | VisualDataError::Storage(_)
                | VisualDataError::Export(_)
                | VisualDataError::Internal(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VisualDataError::AccessDenied("../etc/passwd".to_string());
        assert_eq!(err.to_string(), "Access denied: ../etc/passwd");
    }

    #[test]
    fn test_hyperparameter_display() {
        let err = VisualDataError::invalid_hyperparameter("perplexity", 100.0, "must be below the row count (100)");
        assert_eq!(
            err.to_string(),
            "Invalid hyperparameter: perplexity = 100, must be below the row count (100)"
        );
    }

    #[test]
    fn test_client_classification() {
        assert!(VisualDataError::NoNumericColumns.is_client_error());
        assert!(VisualDataError::LabelColumnNotFound("color".into()).is_client_error());
        assert!(VisualDataError::ExportConflict("t".into()).is_client_error());
        assert!(!VisualDataError::reduction_failed("tsne", "nan").is_client_error());
        assert!(!VisualDataError::Storage("disk full".into()).is_client_error());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(VisualDataError::NoNumericColumns.kind(), "no_numeric_columns");
        assert_eq!(
            VisualDataError::InsufficientRank { requested: 3, available: 2 }.kind(),
            "insufficient_rank"
        );
    }
}
