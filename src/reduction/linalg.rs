//! Small dense helpers shared by the reducers.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[inline]
pub fn dot(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[inline]
pub fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Column means and sample standard deviations (floored at 1e-12).
pub fn column_moments(data: &Array2<f64>) -> (Array1<f64>, Array1<f64>) {
    let n = data.nrows().max(1) as f64;
    let means = data.sum_axis(Axis(0)) / n;
    let denom = (data.nrows() as f64 - 1.0).max(1.0);
    let stds = data
        .axis_iter(Axis(1))
        .zip(means.iter())
        .map(|(col, m)| {
            let ss: f64 = col.iter().map(|v| (v - m).powi(2)).sum();
            (ss / denom).sqrt().max(1e-12)
        })
        .collect::<Array1<f64>>();
    (means, stds)
}

/// Subtract column means, optionally dividing by column standard deviations.
pub fn standardize(data: &Array2<f64>, center: bool, scale: bool) -> Array2<f64> {
    let (means, stds) = column_moments(data);
    let mut out = data.clone();
    for mut row in out.axis_iter_mut(Axis(0)) {
        for (j, v) in row.iter_mut().enumerate() {
            if center {
                *v -= means[j];
            }
            if scale {
                *v /= stds[j];
            }
        }
    }
    out
}

/// Euclidean distance between two samples stored as slices.
#[inline]
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()
}

/// Seeded generator, or one drawn from OS entropy.
pub fn rng_from(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

pub fn all_finite(data: &Array2<f64>) -> bool {
    data.iter().all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standardize() {
        let data = array![[1.0, 10.0], [3.0, 30.0]];
        let z = standardize(&data, true, true);
        assert!((z[[0, 0]] + z[[1, 0]]).abs() < 1e-12);
        assert!((z[[1, 1]] - 1.0 / 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_euclidean() {
        assert_eq!(euclidean(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(euclidean(&[1.5], &[1.5]), 0.0);
    }

    #[test]
    fn test_seeded_rng_repeats() {
        use rand::Rng;
        let a: f64 = rng_from(Some(7)).gen();
        let b: f64 = rng_from(Some(7)).gen();
        assert_eq!(a, b);
    }
}
