use std::{cmp::Ordering, collections::BTreeMap};

use common::error::AppError;

/// Holds optional subscores gathered from the dense and sparse signals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Scores {
    pub dense: Option<f64>,
    pub sparse: Option<f64>,
}

/// A document identifier paired with its per-signal scores and fused score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub document_id: String,
    pub scores: Scores,
    pub fused: f64,
}

impl ScoredDocument {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            scores: Scores::default(),
            fused: 0.0,
        }
    }

    #[must_use]
    pub const fn with_dense_score(mut self, score: f64) -> Self {
        self.scores.dense = Some(score);
        self
    }

    #[must_use]
    pub const fn with_sparse_score(mut self, score: f64) -> Self {
        self.scores.sparse = Some(score);
        self
    }
}

/// Weights used for linear score fusion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub dense: f64,
    pub sparse: f64,
}

impl FusionWeights {
    /// `lambda` weighs the dense signal; the sparse signal gets the remainder.
    pub fn from_lambda(lambda: f64) -> Result<Self, AppError> {
        if !lambda.is_finite() || !(0.0..=1.0).contains(&lambda) {
            return Err(AppError::Validation(format!(
                "hybrid weight must be a finite number in [0, 1] (got {lambda})"
            )));
        }
        Ok(Self {
            dense: lambda,
            sparse: 1.0 - lambda,
        })
    }
}

pub fn fuse_scores(scores: &Scores, weights: FusionWeights) -> f64 {
    let dense = scores.dense.unwrap_or(0.0);
    let sparse = scores.sparse.unwrap_or(0.0);
    dense.mul_add(weights.dense, sparse * weights.sparse)
}

/// Merge per-signal score maps into one candidate per document.
pub fn merge_signals(
    dense: &BTreeMap<String, f64>,
    sparse: &BTreeMap<String, f64>,
) -> Vec<ScoredDocument> {
    let mut merged: BTreeMap<&str, ScoredDocument> = BTreeMap::new();
    for (id, score) in dense {
        merged.insert(id.as_str(), ScoredDocument::new(id.as_str()).with_dense_score(*score));
    }
    for (id, score) in sparse {
        merged
            .entry(id.as_str())
            .and_modify(|existing| existing.scores.sparse = Some(*score))
            .or_insert_with(|| ScoredDocument::new(id.as_str()).with_sparse_score(*score));
    }
    merged.into_values().collect()
}

pub fn sort_by_fused_desc(items: &mut [ScoredDocument]) {
    items.sort_by(|a, b| {
        b.fused
            .partial_cmp(&a.fused)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.document_id.cmp(&b.document_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_lambda_splits_weight() {
        let weights = FusionWeights::from_lambda(0.25).expect("valid lambda");
        assert!((weights.dense - 0.25).abs() < f64::EPSILON);
        assert!((weights.sparse - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn from_lambda_rejects_out_of_range() {
        assert!(FusionWeights::from_lambda(1.5).is_err());
        assert!(FusionWeights::from_lambda(-0.1).is_err());
        assert!(FusionWeights::from_lambda(f64::NAN).is_err());
    }

    #[test]
    fn fuse_scores_treats_missing_signal_as_zero() {
        let weights = FusionWeights::from_lambda(0.5).expect("valid lambda");
        let only_dense = Scores {
            dense: Some(0.8),
            sparse: None,
        };
        assert!((fuse_scores(&only_dense, weights) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn merge_signals_combines_both_maps() {
        let dense = BTreeMap::from([("a".to_string(), 0.9), ("b".to_string(), 0.1)]);
        let sparse = BTreeMap::from([("b".to_string(), 0.7), ("c".to_string(), 0.3)]);

        let merged = merge_signals(&dense, &sparse);
        let ids: Vec<&str> = merged.iter().map(|doc| doc.document_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(merged[1].scores.dense, Some(0.1));
        assert_eq!(merged[1].scores.sparse, Some(0.7));
        assert_eq!(merged[2].scores.dense, None);
    }

    #[test]
    fn sort_by_fused_desc_breaks_ties_by_identifier() {
        let mut items = vec![
            ScoredDocument {
                fused: 0.5,
                ..ScoredDocument::new("b")
            },
            ScoredDocument {
                fused: 0.9,
                ..ScoredDocument::new("c")
            },
            ScoredDocument {
                fused: 0.5,
                ..ScoredDocument::new("a")
            },
        ];
        sort_by_fused_desc(&mut items);
        let ids: Vec<&str> = items.iter().map(|doc| doc.document_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
