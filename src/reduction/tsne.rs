//! t-SNE: t-distributed stochastic neighbor embedding.
//!
//! Backed by `bhtsne`. Small inputs use the exact gradient, larger ones the
//! Barnes-Hut approximation. `bhtsne` panics when `3 * perplexity` exceeds
//! `rows - 1`, so the perplexity handed to it is capped at `(rows - 1) / 3`
//! after validation.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::linalg::{all_finite, euclidean};
use super::{ReductionMethod, Reducer, TargetDim};
use crate::error::{Result, VisualDataError};

/// Above this many rows the Barnes-Hut approximation is used.
pub const EXACT_MAX_ROWS: usize = 1_000;

/// t-SNE configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsneConfig {
    /// Effective number of neighbors
    pub perplexity: f64,
    pub learning_rate: f64,
    pub n_iter: usize,
    /// Barnes-Hut accuracy trade-off
    pub theta: f64,
}

impl Default for TsneConfig {
    fn default() -> Self {
        Self {
            perplexity: 30.0,
            learning_rate: 200.0,
            n_iter: 1000,
            theta: 0.5,
        }
    }
}

impl TsneConfig {
    pub fn with_perplexity(mut self, perplexity: f64) -> Self {
        self.perplexity = perplexity;
        self
    }

    pub fn with_n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }
}

pub struct Tsne {
    config: TsneConfig,
}

impl Tsne {
    pub fn new(config: TsneConfig) -> Self {
        Self { config }
    }

    fn validate(&self, n: usize) -> Result<()> {
        let perplexity = self.config.perplexity;
        if !perplexity.is_finite() || perplexity <= 0.0 {
            return Err(VisualDataError::invalid_hyperparameter(
                "perplexity",
                perplexity,
                "must be a positive number",
            ));
        }
        if perplexity >= n as f64 {
            return Err(VisualDataError::invalid_hyperparameter(
                "perplexity",
                perplexity,
                format!("must be smaller than the number of rows ({}); use at most {}", n, n.saturating_sub(1)),
            ));
        }
        if n < 2 {
            return Err(VisualDataError::invalid_hyperparameter(
                "perplexity",
                perplexity,
                "probability embedding needs at least 2 rows",
            ));
        }
        Ok(())
    }

    /// Perplexity actually passed to `bhtsne` for `n` rows.
    fn effective_perplexity(&self, n: usize) -> f64 {
        let ceiling = (n - 1) as f64 / 3.0;
        if self.config.perplexity > ceiling {
            warn!(
                requested = self.config.perplexity,
                used = ceiling,
                rows = n,
                "Perplexity clamped to (rows - 1) / 3"
            );
            ceiling
        } else {
            self.config.perplexity
        }
    }

    pub fn fit_transform(&self, data: &Array2<f64>, dim: usize) -> Result<Array2<f64>> {
        let (n, features) = data.dim();
        self.validate(n)?;
        if features == 0 {
            return Err(VisualDataError::InvalidInput("t-SNE needs at least one feature column".into()));
        }
        let embedding_dim = u8::try_from(dim)
            .map_err(|_| VisualDataError::InvalidInput(format!("cannot embed into {} dimensions", dim)))?;

        let perplexity = self.effective_perplexity(n);
        let contiguous = data.as_standard_layout();
        let values = contiguous
            .as_slice()
            .ok_or_else(|| VisualDataError::Internal("t-SNE input is not contiguous".to_string()))?;
        let samples: Vec<&[f64]> = values.chunks(features).collect();

        debug!(rows = n, features, perplexity, exact = (n <= EXACT_MAX_ROWS), "Running t-SNE");
        let mut tsne = bhtsne::tSNE::new(&samples);
        tsne.embedding_dim(embedding_dim)
            .perplexity(perplexity)
            .epochs(self.config.n_iter)
            .learning_rate(self.config.learning_rate);
        let flat = if n <= EXACT_MAX_ROWS {
            tsne.exact(|a, b| euclidean(a, b)).embedding()
        } else {
            tsne.barnes_hut(self.config.theta, |a, b| euclidean(a, b)).embedding()
        };

        let y = Array2::from_shape_vec((n, dim), flat)
            .map_err(|e| VisualDataError::Internal(format!("t-SNE output shape: {}", e)))?;
        if !all_finite(&y) {
            return Err(VisualDataError::Internal("t-SNE produced non-finite coordinates".to_string()));
        }
        Ok(y)
    }
}

impl Reducer for Tsne {
    fn method(&self) -> ReductionMethod {
        ReductionMethod::ProbabilityEmbedding
    }

    fn reduce(&self, data: &Array2<f64>, dim: TargetDim) -> Result<Array2<f64>> {
        self.fit_transform(data, dim.get())
    }
}
