use serde::Serialize;

use crate::metrics::{recall_precision::average_curves, NdcgOutcome, QueryEvaluation, LEVEL_COUNT};

/// Run-scoped state merged after each per-query evaluation.
#[derive(Debug, Clone, Default)]
pub struct RunAccumulator {
    ndcg_limit: Option<usize>,
    evaluations: Vec<QueryEvaluation>,
    ndcg_sums: Vec<f64>,
    ndcg_queries: usize,
    degenerate_queries: usize,
}

/// Averages over the whole run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub queries: usize,
    pub interpolated_precision: [f64; LEVEL_COUNT],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ndcg: Option<Vec<f64>>,
    pub ndcg_queries: usize,
    pub degenerate_queries: usize,
}

impl RunAccumulator {
    /// `ndcg_limit` is set for graded runs; binary runs only track recall/precision.
    pub fn new(ndcg_limit: Option<usize>) -> Self {
        Self {
            ndcg_limit,
            ndcg_sums: vec![0.0; ndcg_limit.unwrap_or_default()],
            ..Self::default()
        }
    }

    pub fn merge(&mut self, evaluation: QueryEvaluation) {
        match &evaluation.ndcg {
            Some(NdcgOutcome::Scored(curve)) => {
                for (sum, value) in self.ndcg_sums.iter_mut().zip(&curve.ndcg) {
                    *sum += value;
                }
                self.ndcg_queries = self.ndcg_queries.saturating_add(1);
            }
            Some(NdcgOutcome::Degenerate) => {
                self.degenerate_queries = self.degenerate_queries.saturating_add(1);
            }
            None => {}
        }
        self.evaluations.push(evaluation);
    }

    pub fn len(&self) -> usize {
        self.evaluations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluations.is_empty()
    }

    pub fn aggregate(&self) -> AggregateResult {
        let interpolated_precision = average_curves(
            self.evaluations
                .iter()
                .map(|evaluation| &evaluation.recall_precision.interpolated),
        );

        let ndcg = self.ndcg_limit.map(|_| {
            if self.ndcg_queries == 0 {
                return vec![0.0; self.ndcg_sums.len()];
            }
            self.ndcg_sums
                .iter()
                .map(|sum| sum / self.ndcg_queries as f64)
                .collect()
        });

        AggregateResult {
            queries: self.evaluations.len(),
            interpolated_precision,
            ndcg,
            ndcg_queries: self.ndcg_queries,
            degenerate_queries: self.degenerate_queries,
        }
    }

    pub fn into_evaluations(self) -> Vec<QueryEvaluation> {
        self.evaluations
    }
}
