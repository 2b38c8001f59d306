//! UMAP: Uniform Manifold Approximation and Projection
//!
//! Nearest-neighbor graph embedding for 2D and 3D visualization:
//! - parallel brute-force KNN graph via rayon
//! - fuzzy simplicial set with binary-search sigma
//! - SGD layout optimization with negative sampling
//! - sub-sampling above `max_samples`, with the remaining points placed
//!   next to their nearest sampled neighbor

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use ndarray::Array2;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::linalg::{all_finite, rng_from, squared_distance};
use super::{ReductionMethod, Reducer, TargetDim};
use crate::error::{Result, VisualDataError};

/// UMAP configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UmapConfig {
    /// Number of nearest neighbors (local vs global structure)
    pub n_neighbors: usize,
    /// Minimum distance between points in the embedding
    pub min_dist: f64,
    pub n_epochs: usize,
    pub learning_rate: f64,
    /// Negative samples per positive edge
    pub negative_sample_rate: usize,
    pub spread: f64,
    /// Seed; `None` draws from OS entropy
    pub random_state: Option<u64>,
    /// Sub-sample larger datasets
    pub max_samples: usize,
}

impl Default for UmapConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 15,
            min_dist: 0.1,
            n_epochs: 200,
            learning_rate: 1.0,
            negative_sample_rate: 5,
            spread: 1.0,
            random_state: None,
            max_samples: 10_000,
        }
    }
}

impl UmapConfig {
    pub fn with_n_neighbors(mut self, n_neighbors: usize) -> Self {
        self.n_neighbors = n_neighbors;
        self
    }

    pub fn with_min_dist(mut self, min_dist: f64) -> Self {
        self.min_dist = min_dist;
        self
    }

    pub fn with_n_epochs(mut self, n_epochs: usize) -> Self {
        self.n_epochs = n_epochs;
        self
    }

    pub fn with_random_state(mut self, seed: Option<u64>) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }
}

/// Heap entry; max-heap by distance so the farthest neighbor is evicted first
#[derive(Clone)]
struct Neighbor {
    index: usize,
    distance: f64,
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance.total_cmp(&other.distance)
    }
}

/// Symmetrized edge of the fuzzy graph
struct Edge {
    i: usize,
    j: usize,
    weight: f64,
}

pub struct Umap {
    config: UmapConfig,
}

impl Umap {
    pub fn new(config: UmapConfig) -> Self {
        Self { config }
    }

    /// Check hyperparameters against the row count and return the neighbor count to use.
    fn effective_neighbors(&self, n: usize) -> Result<usize> {
        let k = self.config.n_neighbors;
        if k < 2 {
            return Err(VisualDataError::invalid_hyperparameter(
                "n_neighbors",
                k,
                "must be at least 2",
            ));
        }
        let min_dist = self.config.min_dist;
        if !min_dist.is_finite() || min_dist < 0.0 {
            return Err(VisualDataError::invalid_hyperparameter(
                "min_dist",
                min_dist,
                "must be a finite number >= 0",
            ));
        }
        if n < 3 {
            return Err(VisualDataError::invalid_hyperparameter(
                "n_neighbors",
                k,
                format!("graph embedding needs at least 3 rows, got {}", n),
            ));
        }
        if k >= n {
            warn!(n_neighbors = k, rows = n, clamped = n - 1, "n_neighbors clamped to row count - 1");
            return Ok(n - 1);
        }
        Ok(k)
    }

    pub fn fit_transform(&self, data: &Array2<f64>, dim: usize) -> Result<Array2<f64>> {
        let n = data.nrows();
        let k = self.effective_neighbors(n)?;
        let mut rng = rng_from(self.config.random_state);

        let sample = if n > self.config.max_samples {
            let mut indices: Vec<usize> = (0..n).collect();
            // Fisher-Yates partial shuffle
            for i in 0..self.config.max_samples {
                let j = rng.gen_range(i..n);
                indices.swap(i, j);
            }
            indices.truncate(self.config.max_samples);
            indices.sort_unstable();
            Some(indices)
        } else {
            None
        };

        let work = match &sample {
            Some(indices) => data.select(ndarray::Axis(0), indices),
            None => data.clone(),
        };
        let k = k.min(work.nrows() - 1);

        let (knn_indices, knn_distances) = compute_knn(&work, k);
        let edges = compute_fuzzy_set(&knn_indices, &knn_distances, k);
        debug!(points = work.nrows(), edges = edges.len(), "UMAP graph built");
        let layout = self.optimize_layout(work.nrows(), dim, &edges, &mut rng);

        let embedding = match sample {
            Some(indices) => place_unsampled(data, &indices, &layout),
            None => layout,
        };

        if !all_finite(&embedding) {
            return Err(VisualDataError::Internal("UMAP produced non-finite coordinates".to_string()));
        }
        Ok(embedding)
    }

    /// SGD over the graph edges with negative sampling.
    fn optimize_layout(
        &self,
        n: usize,
        dim: usize,
        edges: &[Edge],
        rng: &mut impl Rng,
    ) -> Array2<f64> {
        let (a, b) = find_ab_params(self.config.spread, self.config.min_dist);
        let mut embedding = Array2::from_shape_fn((n, dim), |_| rng.gen_range(-10.0..10.0));

        // Heavier edges are sampled more often.
        let max_weight = edges.iter().map(|e| e.weight).fold(0.0_f64, f64::max);
        let epochs_per_sample: Vec<f64> = edges
            .iter()
            .map(|e| if e.weight > 0.0 { max_weight / e.weight } else { f64::INFINITY })
            .collect();
        let mut next_sample = epochs_per_sample.clone();

        let n_epochs = self.config.n_epochs;
        let mut delta = vec![0.0; dim];
        for epoch in 0..n_epochs {
            let alpha = self.config.learning_rate * (1.0 - epoch as f64 / n_epochs as f64);

            for (e, edge) in edges.iter().enumerate() {
                if next_sample[e] > (epoch + 1) as f64 {
                    continue;
                }
                next_sample[e] += epochs_per_sample[e];
                let (i, j) = (edge.i, edge.j);

                // Attraction
                let mut dist_sq: f64 = 0.0;
                for c in 0..dim {
                    delta[c] = embedding[[i, c]] - embedding[[j, c]];
                    dist_sq += delta[c] * delta[c];
                }
                if dist_sq > 0.0 {
                    let coeff = -2.0 * a * b * dist_sq.powf(b - 1.0) / (1.0 + a * dist_sq.powf(b));
                    for c in 0..dim {
                        let g = clip(coeff * delta[c]);
                        embedding[[i, c]] += alpha * g;
                        embedding[[j, c]] -= alpha * g;
                    }
                }

                // Repulsion
                for _ in 0..self.config.negative_sample_rate {
                    let other = rng.gen_range(0..n);
                    if other == i {
                        continue;
                    }
                    let mut dist_sq: f64 = 0.0;
                    for c in 0..dim {
                        delta[c] = embedding[[i, c]] - embedding[[other, c]];
                        dist_sq += delta[c] * delta[c];
                    }
                    let coeff = if dist_sq > 0.0 {
                        2.0 * b / ((0.001 + dist_sq) * (1.0 + a * dist_sq.powf(b)))
                    } else {
                        0.0
                    };
                    for c in 0..dim {
                        let g = if coeff > 0.0 { clip(coeff * delta[c]) } else { 4.0 };
                        embedding[[i, c]] += alpha * g;
                    }
                }
            }
        }

        embedding
    }
}

#[inline]
fn clip(g: f64) -> f64 {
    g.clamp(-4.0, 4.0)
}

/// Brute-force k nearest neighbors, parallel over points.
fn compute_knn(data: &Array2<f64>, k: usize) -> (Vec<Vec<usize>>, Vec<Vec<f64>>) {
    let n = data.nrows();
    (0..n)
        .into_par_iter()
        .map(|i| {
            let mut heap: BinaryHeap<Neighbor> = BinaryHeap::with_capacity(k + 1);
            for j in 0..n {
                if i == j {
                    continue;
                }
                let distance = squared_distance(data.row(i), data.row(j)).sqrt();
                if heap.len() < k {
                    heap.push(Neighbor { index: j, distance });
                } else if let Some(top) = heap.peek() {
                    if distance < top.distance {
                        heap.pop();
                        heap.push(Neighbor { index: j, distance });
                    }
                }
            }
            let neighbors = heap.into_sorted_vec();
            (
                neighbors.iter().map(|nb| nb.index).collect(),
                neighbors.iter().map(|nb| nb.distance).collect(),
            )
        })
        .unzip()
}

/// Fuzzy simplicial set: per-point rho and sigma, then
/// w_sym = w_ij + w_ji - w_ij * w_ji.
fn compute_fuzzy_set(knn_indices: &[Vec<usize>], knn_distances: &[Vec<f64>], k: usize) -> Vec<Edge> {
    let target = (k as f64).log2();

    let params: Vec<(f64, f64)> = knn_distances
        .par_iter()
        .map(|dists| {
            let rho = dists.iter().copied().find(|d| *d > 0.0).unwrap_or(0.0);
            let mut lo = 1e-8_f64;
            let mut hi = 1000.0_f64;
            let mut sigma = 1.0_f64;
            for _ in 0..64 {
                sigma = (lo + hi) / 2.0;
                let sum: f64 = dists.iter().map(|&d| (-(d - rho).max(0.0) / sigma).exp()).sum();
                if (sum - target).abs() < 1e-5 {
                    break;
                }
                if sum > target {
                    hi = sigma;
                } else {
                    lo = sigma;
                }
            }
            (rho, sigma.max(1e-12))
        })
        .collect();

    let mut directed: HashMap<(usize, usize), f64> = HashMap::with_capacity(knn_indices.len() * k);
    for (i, (indices, dists)) in knn_indices.iter().zip(knn_distances).enumerate() {
        let (rho, sigma) = params[i];
        for (&j, &d) in indices.iter().zip(dists) {
            let w = if d <= rho { 1.0 } else { (-(d - rho) / sigma).exp() };
            directed.insert((i, j), w);
        }
    }

    let mut symmetric: HashMap<(usize, usize), f64> = HashMap::with_capacity(directed.len());
    for (&(i, j), &w_ij) in &directed {
        let key = if i < j { (i, j) } else { (j, i) };
        let w_ji = directed.get(&(j, i)).copied().unwrap_or(0.0);
        symmetric.insert(key, w_ij + w_ji - w_ij * w_ji);
    }

    let mut edges: Vec<Edge> = symmetric
        .into_iter()
        .filter(|(_, w)| *w > 1e-8)
        .map(|((i, j), weight)| Edge { i, j, weight })
        .collect();
    // HashMap order is random; sort so seeded runs repeat.
    edges.sort_unstable_by_key(|e| (e.i, e.j));
    edges
}

/// Put each point left out of the sample next to its nearest sampled point.
fn place_unsampled(data: &Array2<f64>, sampled: &[usize], layout: &Array2<f64>) -> Array2<f64> {
    let dim = layout.ncols();
    let positions: HashMap<usize, usize> = sampled.iter().enumerate().map(|(s, &i)| (i, s)).collect();
    let rows: Vec<Vec<f64>> = (0..data.nrows())
        .into_par_iter()
        .map(|i| {
            if let Some(&s) = positions.get(&i) {
                return layout.row(s).to_vec();
            }
            let nearest = sampled
                .iter()
                .enumerate()
                .map(|(s, &orig)| (s, squared_distance(data.row(i), data.row(orig))))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(s, _)| s)
                .unwrap_or(0);
            (0..dim)
                .map(|c| layout[[nearest, c]] + ((i as f64) * 0.001 + c as f64).sin() * 0.1)
                .collect()
        })
        .collect();
    let mut out = Array2::<f64>::zeros((data.nrows(), dim));
    for (i, row) in rows.into_iter().enumerate() {
        for (c, v) in row.into_iter().enumerate() {
            out[[i, c]] = v;
        }
    }
    out
}

/// Fit `1 / (1 + a d^(2b))` to the target membership curve: 1 below
/// `min_dist`, `exp(-(d - min_dist) / spread)` above it.
pub fn find_ab_params(spread: f64, min_dist: f64) -> (f64, f64) {
    let xs: Vec<f64> = (1..=300).map(|i| i as f64 * 3.0 * spread / 300.0).collect();
    let ys: Vec<f64> = xs
        .iter()
        .map(|&x| if x < min_dist { 1.0 } else { (-(x - min_dist) / spread).exp() })
        .collect();
    let loss = |a: f64, b: f64| -> f64 {
        xs.iter()
            .zip(&ys)
            .map(|(&x, &y)| {
                let f = 1.0 / (1.0 + a * x.powf(2.0 * b));
                (f - y).powi(2)
            })
            .sum()
    };

    // Coarse grid over (ln a, b), then zoom around the best cell.
    let (mut la_lo, mut la_hi) = (-5.0_f64, 5.0_f64);
    let (mut b_lo, mut b_hi) = (0.1_f64, 3.0_f64);
    let mut best = (1.0_f64, 1.0_f64, f64::INFINITY);
    for _ in 0..6 {
        let steps = 40;
        for ia in 0..=steps {
            let la = la_lo + (la_hi - la_lo) * ia as f64 / steps as f64;
            for ib in 0..=steps {
                let b = b_lo + (b_hi - b_lo) * ib as f64 / steps as f64;
                let l = loss(la.exp(), b);
                if l < best.2 {
                    best = (la.exp(), b, l);
                }
            }
        }
        let la_step = (la_hi - la_lo) / steps as f64 * 2.0;
        let b_step = (b_hi - b_lo) / steps as f64 * 2.0;
        let la = best.0.ln();
        la_lo = la - la_step;
        la_hi = la + la_step;
        b_lo = (best.1 - b_step).max(0.01);
        b_hi = best.1 + b_step;
    }
    (best.0, best.1)
}

impl Reducer for Umap {
    fn method(&self) -> ReductionMethod {
        ReductionMethod::GraphEmbedding
    }

    fn reduce(&self, data: &Array2<f64>, dim: TargetDim) -> Result<Array2<f64>> {
        self.fit_transform(data, dim.get())
    }
}
