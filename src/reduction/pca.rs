//! PCA: linear projection onto the top principal components.
//!
//! Computes the leading eigenvectors of the covariance matrix with power
//! iteration and deflation. The starting vectors come from a fixed seed and
//! eigenvector signs are normalized, so the projection is deterministic.

use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::linalg::{dot, rng_from, standardize};
use super::{ReductionMethod, Reducer, TargetDim};
use crate::error::{Result, VisualDataError};

/// PCA configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcaConfig {
    /// Subtract the mean of each feature
    pub center: bool,
    /// Scale each feature to unit variance
    pub scale: bool,
    /// Seed for the power iteration starting vectors
    pub random_state: u64,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl Default for PcaConfig {
    fn default() -> Self {
        Self {
            center: true,
            scale: true,
            random_state: 42,
            max_iter: 300,
            tolerance: 1e-10,
        }
    }
}

impl PcaConfig {
    pub fn with_scale(mut self, scale: bool) -> Self {
        self.scale = scale;
        self
    }
}

/// Projection plus the variance each component carries.
#[derive(Debug, Clone)]
pub struct PcaResult {
    /// Projected data, rows x components
    pub embedding: Array2<f64>,
    /// Share of total variance per component (sums to at most 1)
    pub explained_variance_ratio: Vec<f64>,
    pub eigenvalues: Vec<f64>,
}

pub struct Pca {
    config: PcaConfig,
}

impl Pca {
    pub fn new(config: PcaConfig) -> Self {
        Self { config }
    }

    pub fn fit_transform(&self, data: &Array2<f64>, n_components: usize) -> Result<PcaResult> {
        let (n, d) = data.dim();
        let available = n.min(d);
        if n_components > available {
            return Err(VisualDataError::InsufficientRank {
                requested: n_components,
                available,
            });
        }

        let centered = if self.config.center {
            standardize(data, true, self.config.scale)
        } else {
            data.clone()
        };

        let cov = centered.t().dot(&centered) / (n as f64 - 1.0).max(1.0);
        let (eigenvalues, components) = self.power_iteration(&cov, n_components);

        let trace: f64 = cov.diag().sum().max(1e-12);
        let explained_variance_ratio = eigenvalues.iter().map(|ev| (ev / trace).max(0.0)).collect();

        let embedding = centered.dot(&components);
        Ok(PcaResult {
            embedding,
            explained_variance_ratio,
            eigenvalues,
        })
    }

    /// Top-k eigenpairs of a symmetric matrix. Eigenvectors are the columns of the returned matrix.
    fn power_iteration(&self, cov: &Array2<f64>, k: usize) -> (Vec<f64>, Array2<f64>) {
        let d = cov.nrows();
        let mut work = cov.clone();
        let mut rng = rng_from(Some(self.config.random_state));
        let mut eigenvalues = Vec::with_capacity(k);
        let mut vectors = Array2::<f64>::zeros((d, k));

        for c in 0..k {
            let mut v: Array1<f64> = (0..d).map(|_| rng.gen_range(-1.0..1.0)).collect();
            orthogonalize(&mut v, &vectors, c);
            normalize(&mut v);

            let mut eigenvalue = 0.0;
            for _ in 0..self.config.max_iter {
                let mut w = work.dot(&v);
                orthogonalize(&mut w, &vectors, c);
                eigenvalue = dot(v.view(), w.view());
                let norm = dot(w.view(), w.view()).sqrt();
                if norm < 1e-12 {
                    // Remaining spectrum is zero; keep the current direction.
                    break;
                }
                w /= norm;
                let diff = (&w - &v).mapv(|x| x * x).sum().sqrt();
                v = w;
                if diff < self.config.tolerance {
                    break;
                }
            }

            // Largest-magnitude loading positive.
            let pivot = v
                .iter()
                .copied()
                .fold(0.0f64, |best, x| if x.abs() > best.abs() { x } else { best });
            if pivot < 0.0 {
                v.mapv_inplace(|x| -x);
            }

            let eigenvalue = eigenvalue.max(0.0);
            for i in 0..d {
                for j in 0..d {
                    work[[i, j]] -= eigenvalue * v[i] * v[j];
                }
            }
            vectors.column_mut(c).assign(&v);
            eigenvalues.push(eigenvalue);
        }

        (eigenvalues, vectors)
    }
}

fn normalize(v: &mut Array1<f64>) {
    let norm = dot(v.view(), v.view()).sqrt().max(1e-12);
    *v /= norm;
}

/// Remove the components of `v` along the first `count` columns of `basis`.
fn orthogonalize(v: &mut Array1<f64>, basis: &Array2<f64>, count: usize) {
    for prev in basis.axis_iter(Axis(1)).take(count) {
        let proj = dot(v.view(), prev);
        v.scaled_add(-proj, &prev);
    }
}

impl Reducer for Pca {
    fn method(&self) -> ReductionMethod {
        ReductionMethod::Linear
    }

    fn reduce(&self, data: &Array2<f64>, dim: TargetDim) -> Result<Array2<f64>> {
        Ok(self.fit_transform(data, dim.get())?.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_pca_basic() {
        let data = array![
            [1.0, 2.0],
            [2.0, 4.0],
            [3.0, 6.0],
            [4.0, 8.0],
            [5.0, 10.0],
        ];
        let result = Pca::new(PcaConfig::default()).fit_transform(&data, 2).unwrap();
        assert_eq!(result.embedding.dim(), (5, 2));
        assert!(
            result.explained_variance_ratio[0] > 0.95,
            "first component should dominate, got {}",
            result.explained_variance_ratio[0]
        );
    }

    #[test]
    fn test_pca_two_clusters() {
        let data = array![
            [0.0, 0.0, 0.0],
            [0.1, 0.1, 0.0],
            [0.0, 0.1, 0.1],
            [10.0, 10.0, 10.0],
            [10.1, 10.0, 10.0],
            [10.0, 10.1, 10.0],
        ];
        let emb = Pca::new(PcaConfig::default()).reduce(&data, TargetDim::Two).unwrap();
        let mean_a = emb.slice(ndarray::s![..3, 0]).sum() / 3.0;
        let mean_b = emb.slice(ndarray::s![3.., 0]).sum() / 3.0;
        assert!((mean_a - mean_b).abs() > 1.0, "clusters should separate on PC_1");
    }

    #[test]
    fn test_pca_deterministic() {
        let data = Array2::from_shape_fn((30, 4), |(i, j)| ((i * 7 + j * 3) % 11) as f64 + j as f64);
        let pca = Pca::new(PcaConfig::default());
        let a = pca.reduce(&data, TargetDim::Three).unwrap();
        let b = pca.reduce(&data, TargetDim::Three).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_components_orthogonal() {
        let data = Array2::from_shape_fn((40, 4), |(i, j)| {
            ((i * (j + 3)) % 7) as f64 * 10f64.powi(j as i32)
        });
        let pca = Pca::new(PcaConfig::default().with_scale(false));
        let result = pca.fit_transform(&data, 3).unwrap();
        let e = &result.embedding;
        let norm = |c: usize| dot(e.column(c), e.column(c)).sqrt();
        let c01 = dot(e.column(0), e.column(1)) / (norm(0) * norm(1));
        let c02 = dot(e.column(0), e.column(2)) / (norm(0) * norm(2));
        assert!(c01.abs() < 1e-6, "scores should be uncorrelated, got {}", c01);
        assert!(c02.abs() < 1e-6, "scores should be uncorrelated, got {}", c02);
        assert!(result.eigenvalues[0] >= result.eigenvalues[1]);
        assert!(result.eigenvalues[1] >= result.eigenvalues[2]);
    }

    #[test]
    fn test_insufficient_rank() {
        let data = array![[1.0, 2.0], [2.0, 1.0], [3.0, 5.0]];
        let err = Pca::new(PcaConfig::default()).reduce(&data, TargetDim::Three).unwrap_err();
        assert!(matches!(
            err,
            VisualDataError::InsufficientRank { requested: 3, available: 2 }
        ));
    }

    #[test]
    fn test_pca_no_scale() {
        let data = array![[1.0, 100.0], [2.0, 200.0], [3.0, 300.0], [4.0, 400.0]];
        let pca = Pca::new(PcaConfig::default().with_scale(false));
        let result = pca.fit_transform(&data, 2).unwrap();
        assert_eq!(result.embedding.nrows(), 4);
        let total: f64 = result.explained_variance_ratio.iter().sum();
        assert!(total > 0.99 && total <= 1.0 + 1e-9);
    }
}
