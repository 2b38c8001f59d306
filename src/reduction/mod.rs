//! Dimensionality reduction for 2D and 3D scatter plots.
//!
//! Three interchangeable strategies implement [`Reducer`]:
//! - [`Pca`]: linear, variance-maximizing projection
//! - [`Tsne`]: probability-based neighbor embedding
//! - [`Umap`]: nearest-neighbor graph embedding
//!
//! [`AutoSelector`] picks one from the data shape, and [`Orchestrator`] runs
//! the whole clean → project → reduce → align sequence.

pub mod linalg;
pub mod orchestrator;
pub mod pca;
pub mod selector;
pub mod tsne;
pub mod umap;

pub use orchestrator::{Orchestrator, ReductionResult};
pub use pca::{Pca, PcaConfig, PcaResult};
pub use selector::AutoSelector;
pub use tsne::{Tsne, TsneConfig};
pub use umap::{Umap, UmapConfig};

use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, VisualDataError};

/// Reduction method requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReductionMethod {
    Linear,
    ProbabilityEmbedding,
    GraphEmbedding,
    Auto,
}

impl ReductionMethod {
    pub fn name(&self) -> &'static str {
        match self {
            ReductionMethod::Linear => "linear",
            ReductionMethod::ProbabilityEmbedding => "probability-embedding",
            ReductionMethod::GraphEmbedding => "graph-embedding",
            ReductionMethod::Auto => "auto",
        }
    }

    /// Short upper-case name used in plot titles.
    pub fn acronym(&self) -> &'static str {
        match self {
            ReductionMethod::Linear => "PCA",
            ReductionMethod::ProbabilityEmbedding => "TSNE",
            ReductionMethod::GraphEmbedding => "UMAP",
            ReductionMethod::Auto => "AUTO",
        }
    }

    /// Prefix of the coordinate columns this method produces.
    pub fn column_prefix(&self) -> &'static str {
        match self {
            ReductionMethod::Linear => "PC",
            ReductionMethod::ProbabilityEmbedding => "TSNE",
            ReductionMethod::GraphEmbedding => "UMAP",
            ReductionMethod::Auto => "AUTO",
        }
    }

    /// Deterministic coordinate column names, e.g. `PC_1`, `PC_2`.
    pub fn column_names(&self, dim: TargetDim) -> Vec<String> {
        (1..=dim.get())
            .map(|i| format!("{}_{}", self.column_prefix(), i))
            .collect()
    }
}

impl fmt::Display for ReductionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReductionMethod {
    type Err = VisualDataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" | "pca" | "acp" => Ok(ReductionMethod::Linear),
            "probability-embedding" | "tsne" | "t-sne" => Ok(ReductionMethod::ProbabilityEmbedding),
            "graph-embedding" | "umap" => Ok(ReductionMethod::GraphEmbedding),
            "auto" => Ok(ReductionMethod::Auto),
            other => Err(VisualDataError::reduction_failed(other, "unknown reduction method")),
        }
    }
}

impl Serialize for ReductionMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ReductionMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Output dimensionality: 2 or 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum TargetDim {
    Two,
    Three,
}

impl TargetDim {
    pub fn get(&self) -> usize {
        match self {
            TargetDim::Two => 2,
            TargetDim::Three => 3,
        }
    }
}

impl TryFrom<usize> for TargetDim {
    type Error = VisualDataError;

    fn try_from(value: usize) -> Result<Self> {
        match value {
            2 => Ok(TargetDim::Two),
            3 => Ok(TargetDim::Three),
            other => Err(VisualDataError::InvalidInput(format!(
                "target dimensionality must be 2 or 3, got {}",
                other
            ))),
        }
    }
}

impl From<TargetDim> for usize {
    fn from(dim: TargetDim) -> usize {
        dim.get()
    }
}

/// Method-specific hyperparameters. Each strategy reads only its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionParams {
    /// Probability embedding neighborhood size
    pub perplexity: f64,
    /// Graph embedding neighbor count
    pub n_neighbors: usize,
    /// Graph embedding minimum distance
    pub min_dist: f64,
    /// Seed for graph embedding; t-SNE initializes from its own generator
    pub random_state: Option<u64>,
}

impl Default for ReductionParams {
    fn default() -> Self {
        Self {
            perplexity: 30.0,
            n_neighbors: 15,
            min_dist: 0.1,
            random_state: None,
        }
    }
}

impl ReductionParams {
    pub fn with_perplexity(mut self, perplexity: f64) -> Self {
        self.perplexity = perplexity;
        self
    }

    pub fn with_n_neighbors(mut self, n_neighbors: usize) -> Self {
        self.n_neighbors = n_neighbors;
        self
    }

    pub fn with_min_dist(mut self, min_dist: f64) -> Self {
        self.min_dist = min_dist;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }
}

/// One reduction to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReductionRequest {
    pub method: ReductionMethod,
    pub dim: TargetDim,
    #[serde(default)]
    pub label_column: Option<String>,
    #[serde(default)]
    pub params: ReductionParams,
}

impl ReductionRequest {
    pub fn new(method: ReductionMethod, dim: TargetDim) -> Self {
        Self {
            method,
            dim,
            label_column: None,
            params: ReductionParams::default(),
        }
    }

    pub fn with_label(mut self, column: impl Into<String>) -> Self {
        self.label_column = Some(column.into());
        self
    }

    pub fn with_params(mut self, params: ReductionParams) -> Self {
        self.params = params;
        self
    }
}

/// A reduction strategy: `(rows, features)` in, `(rows, dim)` out, row order preserved.
pub trait Reducer: Send + Sync {
    fn method(&self) -> ReductionMethod;

    fn reduce(&self, data: &Array2<f64>, dim: TargetDim) -> Result<Array2<f64>>;
}

/// Build the strategy for a concrete method.
pub fn reducer_for(method: ReductionMethod, params: &ReductionParams) -> Result<Box<dyn Reducer>> {
    match method {
        ReductionMethod::Linear => Ok(Box::new(Pca::new(PcaConfig::default()))),
        ReductionMethod::ProbabilityEmbedding => Ok(Box::new(Tsne::new(
            TsneConfig::default().with_perplexity(params.perplexity),
        ))),
        ReductionMethod::GraphEmbedding => Ok(Box::new(Umap::new(
            UmapConfig::default()
                .with_n_neighbors(params.n_neighbors)
                .with_min_dist(params.min_dist)
                .with_random_state(params.random_state),
        ))),
        ReductionMethod::Auto => Err(VisualDataError::reduction_failed(
            method,
            "auto must be resolved before a strategy is built",
        )),
    }
}
