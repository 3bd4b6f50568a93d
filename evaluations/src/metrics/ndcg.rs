//! Normalized discounted cumulative gain over the top `K` ranks.
//!
//! DCG arrays are cumulative: `dcg[r]` is the discounted gain of the prefix of
//! length `r + 1`, and normalization divides prefix by prefix.

use std::cmp::Ordering;

use common::{error::AppError, utils::config::DcgDiscount};
use retrieval_pipeline::RetrievalResult;
use serde::Serialize;
use tracing::debug;

use crate::corpus::Relevance;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NdcgCurve {
    pub gains: Vec<f64>,
    pub dcg: Vec<f64>,
    pub ideal_dcg: Vec<f64>,
    pub ndcg: Vec<f64>,
}

/// Grade of the document at each of the first `limit` ranks, 0 when unjudged or past the end.
pub fn gain_vector(result: &RetrievalResult, relevance: &Relevance, limit: usize) -> Vec<f64> {
    let mut gains = vec![0.0; limit];
    for (gain, document) in gains.iter_mut().zip(result.iter()) {
        *gain = relevance.grade(&document.document_id).unwrap_or(0.0);
    }
    gains
}

/// Every positive judged grade sorted descending, truncated or zero-padded to `limit`.
///
/// A negatively graded document never belongs in the ideal ranking; an unjudged
/// document (gain 0) fills that rank instead.
pub fn ideal_gains(relevance: &Relevance, limit: usize) -> Vec<f64> {
    let mut grades: Vec<f64> = relevance
        .grades()
        .into_iter()
        .filter(|grade| *grade > 0.0)
        .collect();
    grades.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
    grades.resize(limit, 0.0);
    grades
}

pub fn cumulative_dcg(gains: &[f64], discount: DcgDiscount) -> Vec<f64> {
    let mut running = 0.0;
    gains
        .iter()
        .enumerate()
        .map(|(rank, gain)| {
            running += if rank == 0 {
                *gain
            } else {
                gain / discount_factor(rank, discount)
            };
            running
        })
        .collect()
}

fn discount_factor(rank: usize, discount: DcgDiscount) -> f64 {
    let offset = match discount {
        DcgDiscount::Classic => 1.0,
        DcgDiscount::Standard => 2.0,
    };
    (rank as f64 + offset).log2()
}

/// Score one query, refusing queries without a positive ideal gain at the first rank.
pub fn evaluate(
    query_index: usize,
    result: &RetrievalResult,
    relevance: &Relevance,
    limit: usize,
    discount: DcgDiscount,
) -> Result<NdcgCurve, AppError> {
    let ideal_dcg = cumulative_dcg(&ideal_gains(relevance, limit), discount);
    match ideal_dcg.first() {
        Some(top) if *top > 0.0 && top.is_finite() => {}
        _ => return Err(AppError::DegenerateQuery { index: query_index }),
    }

    let gains = gain_vector(result, relevance, limit);
    let dcg = cumulative_dcg(&gains, discount);
    let ndcg = dcg
        .iter()
        .zip(&ideal_dcg)
        .map(|(actual, ideal)| actual / ideal)
        .collect();

    debug!(
        query_index,
        ?gains,
        ?dcg,
        ?ideal_dcg,
        "Computed discounted cumulative gain"
    );

    Ok(NdcgCurve {
        gains,
        dcg,
        ideal_dcg,
        ndcg,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use retrieval_pipeline::RetrievedDocument;

    use super::*;

    fn ranked(ids: &[&str]) -> RetrievalResult {
        RetrievalResult::from_unsorted(
            ids.iter()
                .enumerate()
                .map(|(rank, id)| RetrievedDocument::new(*id, 1.0 / (rank as f64 + 1.0)))
                .collect(),
        )
    }

    fn graded(pairs: &[(&str, f64)]) -> Relevance {
        Relevance::Graded(
            pairs
                .iter()
                .map(|(id, grade)| ((*id).to_string(), *grade))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    fn assert_close(actual: &[f64], expected: &[f64], tolerance: f64) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < tolerance, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn gain_vector_pads_short_results_with_zero() {
        let gains = gain_vector(
            &ranked(&["docB", "docX"]),
            &graded(&[("docA", 1.0), ("docB", 0.5)]),
            4,
        );
        assert_close(&gains, &[0.5, 0.0, 0.0, 0.0], 1e-12);
    }

    #[test]
    fn standard_discount_scores_swapped_pair() {
        let curve = evaluate(
            0,
            &ranked(&["docB", "docA"]),
            &graded(&[("docA", 1.0), ("docB", 0.5)]),
            2,
            DcgDiscount::Standard,
        )
        .expect("query has positive grades");

        assert_close(&curve.gains, &[0.5, 1.0], 1e-12);
        assert_close(&curve.dcg, &[0.5, 1.131], 1e-3);
        assert_close(&curve.ideal_dcg, &[1.0, 1.315], 1e-3);
        assert_close(&curve.ndcg, &[0.5, 0.860], 1e-3);
    }

    #[test]
    fn classic_discount_leaves_second_rank_undiscounted() {
        let curve = evaluate(
            0,
            &ranked(&["docB", "docA"]),
            &graded(&[("docA", 1.0), ("docB", 0.5)]),
            2,
            DcgDiscount::Classic,
        )
        .expect("query has positive grades");

        assert_close(&curve.dcg, &[0.5, 1.5], 1e-12);
        assert_close(&curve.ideal_dcg, &[1.0, 1.5], 1e-12);
        assert_close(&curve.ndcg, &[0.5, 1.0], 1e-12);
    }

    #[test]
    fn ideal_ranking_scores_one_at_every_rank() {
        let relevance = graded(&[("a", 0.9), ("b", 0.6), ("c", 0.3)]);
        let curve = evaluate(0, &ranked(&["a", "b", "c"]), &relevance, 5, DcgDiscount::Classic)
            .expect("query has positive grades");

        assert_close(&curve.ndcg, &[1.0; 5], 1e-12);
    }

    #[test]
    fn ndcg_stays_within_unit_interval() {
        let relevance = graded(&[("a", 0.2), ("b", 1.0), ("c", 0.7), ("d", 0.4)]);
        for discount in [DcgDiscount::Classic, DcgDiscount::Standard] {
            let curve = evaluate(
                3,
                &ranked(&["x", "a", "d", "y", "c", "b"]),
                &relevance,
                10,
                discount,
            )
            .expect("query has positive grades");
            assert!(curve.ndcg.iter().all(|value| (0.0..=1.0).contains(value)));
        }
    }

    #[test]
    fn queries_without_positive_grades_are_degenerate() {
        let empty = graded(&[]);
        let zero = graded(&[("a", 0.0)]);

        for relevance in [empty, zero] {
            let err = evaluate(7, &ranked(&["a"]), &relevance, 3, DcgDiscount::Classic)
                .expect_err("ideal DCG is zero");
            assert!(matches!(err, AppError::DegenerateQuery { index: 7 }));
        }
    }

    #[test]
    fn negative_later_grades_do_not_make_a_query_degenerate() {
        let relevance = graded(&[("a", 1.0), ("b", -0.5)]);
        let curve = evaluate(2, &ranked(&["a", "b"]), &relevance, 3, DcgDiscount::Classic)
            .expect("query has a positive grade");

        assert_close(&curve.ideal_dcg, &[1.0, 1.0, 1.0], 1e-12);
        assert_close(&curve.dcg, &[1.0, 0.5, 0.5], 1e-12);
        assert_close(&curve.ndcg, &[1.0, 0.5, 0.5], 1e-12);
    }

    #[test]
    fn binary_relevance_grades_every_listed_document_one() {
        let relevance = Relevance::Binary(BTreeSet::from(["a".to_string(), "c".to_string()]));
        let gains = gain_vector(&ranked(&["a", "b", "c"]), &relevance, 3);

        assert_close(&gains, &[1.0, 0.0, 1.0], 1e-12);
        assert_close(&ideal_gains(&relevance, 3), &[1.0, 1.0, 0.0], 1e-12);
    }
}
