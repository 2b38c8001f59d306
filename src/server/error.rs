//! Error types for the server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::VisualDataError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Pipeline(#[from] VisualDataError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Pipeline(e) => match e {
                VisualDataError::AccessDenied(_) => StatusCode::FORBIDDEN,
                VisualDataError::NotFound(_) | VisualDataError::LabelColumnNotFound(_) => StatusCode::NOT_FOUND,
                VisualDataError::ExportConflict(_) => StatusCode::CONFLICT,
                e if e.is_client_error() => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServerError::BadRequest(_) => "bad_request",
            ServerError::Internal(_) => "internal",
            ServerError::Pipeline(e) => e.kind(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(kind = self.kind(), detail = %self, "Request failed");
            match &self {
                ServerError::Pipeline(VisualDataError::ReductionFailed { method, .. }) => {
                    format!("Reduction with {} failed. Check server logs for details.", method)
                }
                _ => "An internal error occurred".to_string(),
            }
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": true,
            "kind": self.kind(),
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (VisualDataError::AccessDenied("x".into()), StatusCode::FORBIDDEN),
            (VisualDataError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (VisualDataError::LabelColumnNotFound("color".into()), StatusCode::NOT_FOUND),
            (VisualDataError::ExportConflict("t".into()), StatusCode::CONFLICT),
            (VisualDataError::NoNumericColumns, StatusCode::BAD_REQUEST),
            (VisualDataError::invalid_hyperparameter("perplexity", 30, "too large"), StatusCode::BAD_REQUEST),
            (VisualDataError::reduction_failed("tsne", "diverged"), StatusCode::INTERNAL_SERVER_ERROR),
            (VisualDataError::Storage("disk full".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).status(), status);
        }
    }

    #[test]
    fn test_server_errors_hide_details() {
        let response = ServerError::from(VisualDataError::Storage("/secret/path".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
