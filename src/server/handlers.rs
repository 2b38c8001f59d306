//! HTTP request handlers
//!
//! Every pipeline call is synchronous, so handlers move the work onto the
//! blocking pool and only do multipart parsing on the async side.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cleaning::{Cleaner, CleaningPolicy, CleaningReport};
use crate::export::{ConflictPolicy, ExportSummary, SqliteExporter};
use crate::frame::{describe, summarize, ColumnDescription, Summary};
use crate::loading::{load_upload, LoadedData};
use crate::reduction::orchestrator::ResultOverview;
use crate::reduction::{ReductionMethod, ReductionParams, ReductionRequest, TargetDim};
use crate::render::{ScatterPlot, DEFAULT_TITLE};

use super::error::{Result, ServerError};
use super::state::AppState;

/// Run pipeline work on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ServerError::Internal(format!("worker task failed: {}", e)))?
        .map_err(ServerError::from)
}

/// A multipart upload: one `file` part plus named text parts.
struct UploadForm {
    file_name: String,
    bytes: Vec<u8>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut file = None;
        let mut fields = HashMap::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ServerError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let file_name = field.file_name().unwrap_or("upload.csv").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(e.to_string()))?;
                info!(file = %file_name, bytes = data.len(), "Received upload");
                file = Some((file_name, data.to_vec()));
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(e.to_string()))?;
                fields.insert(name, text);
            }
        }

        let (file_name, bytes) = file.ok_or_else(|| ServerError::BadRequest("No file uploaded".to_string()))?;
        Ok(Self {
            file_name,
            bytes,
            fields,
        })
    }

    fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// The JSON `params` part, if one was sent.
    fn params<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.field("params")
            .map(|raw| {
                serde_json::from_str(raw).map_err(|e| ServerError::BadRequest(format!("Invalid params JSON: {}", e)))
            })
            .transpose()
    }
}

// ============================================================================
// Index and health
// ============================================================================

pub async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            { "method": "GET", "path": "/health" },
            { "method": "POST", "path": "/data/describe", "form": ["file"] },
            { "method": "POST", "path": "/data/describe-remote", "json": ["source"] },
            { "method": "POST", "path": "/data/clean", "form": ["file", "params"] },
            { "method": "POST", "path": "/data/export", "form": ["file", "params"] },
            { "method": "POST", "path": "/reduce/2d", "form": ["file", "method", "params"] },
            { "method": "POST", "path": "/reduce/3d", "form": ["file", "method", "params"] },
            { "method": "GET", "path": "/static/renders/{file}" },
        ],
    }))
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ============================================================================
// Data Handlers
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DescribeResponse {
    status: &'static str,
    source: String,
    summary: Summary,
    statistics: Vec<ColumnDescription>,
}

fn describe_loaded(source: String, data: LoadedData) -> crate::error::Result<DescribeResponse> {
    let summary = summarize(&data);
    let statistics = match &data {
        LoadedData::Table(frame) => describe(frame)?,
        _ => Vec::new(),
    };
    Ok(DescribeResponse {
        status: "success",
        source,
        summary,
        statistics,
    })
}

/// Summary and statistics of an uploaded file
pub async fn describe_upload(multipart: Multipart) -> Result<Json<DescribeResponse>> {
    let form = UploadForm::read(multipart).await?;
    let response = blocking(move || {
        let frame = load_upload(&form.file_name, &form.bytes)?;
        describe_loaded(form.file_name, LoadedData::Table(frame))
    })
    .await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct SourceRequest {
    source: String,
}

/// Summary and statistics of a URL or a path under the project root
pub async fn describe_source(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SourceRequest>,
) -> Result<Json<DescribeResponse>> {
    if request.source.trim().is_empty() {
        return Err(ServerError::BadRequest("source must not be empty".to_string()));
    }
    let loader = state.loader.clone();
    let response = blocking(move || {
        let data = loader.load(&request.source)?;
        describe_loaded(request.source, data)
    })
    .await?;
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
pub struct CleanResponse {
    status: &'static str,
    report: CleaningReport,
    columns: Vec<String>,
    records: Vec<serde_json::Value>,
}

/// Clean an uploaded file and return the surviving rows
pub async fn clean_upload(multipart: Multipart) -> Result<Json<CleanResponse>> {
    let form = UploadForm::read(multipart).await?;
    let policy: CleaningPolicy = form.params()?.unwrap_or_default();
    let response = blocking(move || {
        let frame = load_upload(&form.file_name, &form.bytes)?;
        let (cleaned, report) = Cleaner::new(policy).clean_with_report(&frame)?;
        Ok(CleanResponse {
            status: "success",
            report,
            columns: cleaned.column_names(),
            records: cleaned.to_records(),
        })
    })
    .await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    db_path: String,
    table: String,
    #[serde(default)]
    if_exists: ConflictPolicy,
}

/// Write an uploaded file into a SQLite table under the project root
pub async fn export_upload(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ExportSummary>> {
    let form = UploadForm::read(multipart).await?;
    let params: ExportParams = form
        .params()?
        .ok_or_else(|| ServerError::BadRequest("params with db_path and table are required".to_string()))?;
    let db_path = state.loader.resolve_local(&params.db_path)?;

    let summary = blocking(move || {
        let frame = load_upload(&form.file_name, &form.bytes)?;
        SqliteExporter::new(db_path).export(&frame, &params.table, params.if_exists)
    })
    .await?;
    Ok(Json(summary))
}

// ============================================================================
// Reduction Handlers
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReduceParams {
    label_column: Option<String>,
    title: Option<String>,
    perplexity: Option<f64>,
    n_neighbors: Option<usize>,
    min_dist: Option<f64>,
    random_state: Option<u64>,
}

impl ReduceParams {
    fn reduction_params(&self) -> ReductionParams {
        let defaults = ReductionParams::default();
        ReductionParams {
            perplexity: self.perplexity.unwrap_or(defaults.perplexity),
            n_neighbors: self.n_neighbors.unwrap_or(defaults.n_neighbors),
            min_dist: self.min_dist.unwrap_or(defaults.min_dist),
            random_state: self.random_state,
        }
    }

    fn label(&self) -> Option<String> {
        self.label_column
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Serialize)]
pub struct ReduceResponse {
    status: &'static str,
    method: ReductionMethod,
    message: String,
    locator: String,
    html: String,
    result: ResultOverview,
}

pub async fn reduce_2d(State(state): State<Arc<AppState>>, multipart: Multipart) -> Result<Json<ReduceResponse>> {
    reduce(state, TargetDim::Two, multipart).await
}

pub async fn reduce_3d(State(state): State<Arc<AppState>>, multipart: Multipart) -> Result<Json<ReduceResponse>> {
    reduce(state, TargetDim::Three, multipart).await
}

async fn reduce(state: Arc<AppState>, dim: TargetDim, multipart: Multipart) -> Result<Json<ReduceResponse>> {
    let form = UploadForm::read(multipart).await?;
    let method_name = form.field("method").unwrap_or("auto").to_string();
    let method: ReductionMethod = method_name
        .parse()
        .map_err(|_| ServerError::BadRequest(format!("Unknown reduction method '{}'", method_name)))?;
    let params: ReduceParams = form.params()?.unwrap_or_default();

    let mut request = ReductionRequest::new(method, dim).with_params(params.reduction_params());
    if let Some(label) = params.label() {
        request = request.with_label(label);
    }
    let plot = ScatterPlot::new(params.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()));
    let orchestrator = state.orchestrator.clone();
    let store = Arc::clone(&state.store);

    let (result, html, artifact) = blocking(move || {
        let frame = load_upload(&form.file_name, &form.bytes)?;
        let result = orchestrator.run(&frame, &request)?;
        let html = plot.render(&result)?;
        let artifact = store.store(&html)?;
        Ok((result, html, artifact))
    })
    .await?;

    info!(
        method = %result.method,
        dim = dim.get(),
        rows = result.frame.height(),
        artifact = %artifact.id,
        "Reduction artifact stored"
    );

    Ok(Json(ReduceResponse {
        status: "success",
        method: result.method,
        message: format!(
            "{} {}D projection of {} rows",
            result.method.acronym(),
            dim.get(),
            result.frame.height()
        ),
        locator: artifact.locator,
        html,
        result: result.overview(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce_params_fill_defaults() {
        let params: ReduceParams =
            serde_json::from_str(r#"{"label_column": "  ", "perplexity": 12.5, "random_state": 7}"#).unwrap();
        let reduction = params.reduction_params();
        assert_eq!(reduction.perplexity, 12.5);
        assert_eq!(reduction.n_neighbors, 15);
        assert_eq!(reduction.random_state, Some(7));
        assert!(params.label().is_none());
    }

    #[test]
    fn test_export_params_default_policy() {
        let params: ExportParams = serde_json::from_str(r#"{"db_path": "out.db", "table": "t"}"#).unwrap();
        assert_eq!(params.if_exists, ConflictPolicy::Fail);
    }
}
