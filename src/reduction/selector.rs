//! Automatic choice of a reduction method from the data shape.

use tracing::info;

use super::{ReductionMethod, TargetDim};
use crate::frame::Frame;

/// Pure heuristic over `(rows, columns, target_dim)`.
///
/// Rules, first match wins:
/// 1. fewer than `min_rows_for_embedding` rows: linear
/// 2. exactly as many columns as target dimensions: linear
/// 3. more than `max_rows_for_probability` rows: graph embedding
/// 4. more than `max_columns_for_probability` columns: graph embedding
/// 5. otherwise: probability embedding
///
/// With fewer columns than target dimensions a linear projection has no
/// rank to offer, so rule 2 does not apply and an embedding is chosen.
#[derive(Debug, Clone)]
pub struct AutoSelector {
    pub min_rows_for_embedding: usize,
    pub max_rows_for_probability: usize,
    pub max_columns_for_probability: usize,
}

impl Default for AutoSelector {
    fn default() -> Self {
        Self {
            min_rows_for_embedding: 50,
            max_rows_for_probability: 5_000,
            max_columns_for_probability: 100,
        }
    }
}

impl AutoSelector {
    pub fn choose(&self, rows: usize, columns: usize, dim: TargetDim) -> ReductionMethod {
        if rows < self.min_rows_for_embedding || columns == dim.get() {
            ReductionMethod::Linear
        } else if rows > self.max_rows_for_probability || columns > self.max_columns_for_probability {
            ReductionMethod::GraphEmbedding
        } else {
            ReductionMethod::ProbabilityEmbedding
        }
    }

    /// Choose for a numeric frame.
    pub fn select(&self, numeric: &Frame, dim: TargetDim) -> ReductionMethod {
        let method = self.choose(numeric.height(), numeric.width(), dim);
        info!(
            rows = numeric.height(),
            columns = numeric.width(),
            dim = dim.get(),
            method = %method,
            "Auto-selected reduction method"
        );
        method
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_in_order() {
        let s = AutoSelector::default();
        assert_eq!(s.choose(10, 50, TargetDim::Two), ReductionMethod::Linear);
        assert_eq!(s.choose(49, 500, TargetDim::Two), ReductionMethod::Linear);
        assert_eq!(s.choose(1000, 2, TargetDim::Two), ReductionMethod::Linear);
        assert_eq!(s.choose(1000, 3, TargetDim::Three), ReductionMethod::Linear);
        assert_eq!(s.choose(100, 2, TargetDim::Three), ReductionMethod::ProbabilityEmbedding);
        assert_eq!(s.choose(1000, 1, TargetDim::Two), ReductionMethod::ProbabilityEmbedding);
        assert_eq!(s.choose(6_000, 2, TargetDim::Three), ReductionMethod::GraphEmbedding);
        assert_eq!(s.choose(1000, 3, TargetDim::Two), ReductionMethod::ProbabilityEmbedding);
        assert_eq!(s.choose(5_001, 10, TargetDim::Two), ReductionMethod::GraphEmbedding);
        assert_eq!(s.choose(200, 101, TargetDim::Two), ReductionMethod::GraphEmbedding);
        assert_eq!(s.choose(5_000, 100, TargetDim::Three), ReductionMethod::ProbabilityEmbedding);
        assert_eq!(s.choose(50, 4, TargetDim::Two), ReductionMethod::ProbabilityEmbedding);
    }

    #[test]
    fn test_choice_is_pure() {
        let s = AutoSelector::default();
        for _ in 0..3 {
            assert_eq!(s.choose(300, 8, TargetDim::Two), ReductionMethod::ProbabilityEmbedding);
        }
    }
}
