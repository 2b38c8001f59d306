//! visualdata - tabular data to interactive 2D/3D scatter plots
//!
//! This crate loads a dataset, cleans it, projects its numeric columns to two
//! or three dimensions and renders the projection as a standalone HTML page.
//!
//! # Modules
//!
//! ## Pipeline
//! - [`loading`] - Format-aware loading with path and URL safety checks
//! - [`frame`] - Keyed data frames, numeric projection, statistics
//! - [`cleaning`] - Duplicate removal, missing-value dropping and imputation
//! - [`reduction`] - PCA, t-SNE and UMAP behind one trait, plus auto-selection
//!
//! ## Outputs
//! - [`render`] - Plotly scatter pages and artifact storage
//! - [`export`] - SQLite export
//!
//! ## Services
//! - [`server`] - HTTP server with REST API
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Pipeline
pub mod frame;
pub mod loading;
pub mod cleaning;
pub mod reduction;

// Outputs
pub mod render;
pub mod export;

// Services
pub mod server;
pub mod cli;

pub use error::{Result, VisualDataError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{Result, VisualDataError};

    pub use crate::frame::{describe, summarize, ColumnDescription, Frame, RowKey, Summary};
    pub use crate::loading::{load_upload, DataLoader, LoadOptions, LoadedData};
    pub use crate::cleaning::{Cleaner, CleaningPolicy, CleaningReport, Imputation};
    pub use crate::reduction::{
        AutoSelector, Orchestrator, Reducer, ReductionMethod, ReductionParams, ReductionRequest,
        ReductionResult, TargetDim,
    };
    pub use crate::render::{Artifact, ArtifactStore, FsArtifactStore, MemoryArtifactStore, ScatterPlot};
    pub use crate::export::{ConflictPolicy, ExportSummary, SqliteExporter};
}
