pub mod ndcg;
pub mod recall_precision;

use common::utils::config::DcgDiscount;
use retrieval_pipeline::RetrievalResult;
use serde::Serialize;
use tracing::warn;

use crate::corpus::{Query, RelevanceMode};

pub use ndcg::NdcgCurve;
pub use recall_precision::{PerQueryCurve, LEVEL_COUNT, RECALL_LEVELS};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NdcgParams {
    pub limit: usize,
    pub discount: DcgDiscount,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum NdcgOutcome {
    Scored(NdcgCurve),
    Degenerate,
}

/// Everything measured for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryEvaluation {
    pub index: usize,
    pub text: String,
    pub embedding: String,
    pub relevant: usize,
    pub retrieved: usize,
    pub recall_precision: PerQueryCurve,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ndcg: Option<NdcgOutcome>,
}

/// Score one query's ranking. NDCG is only computed when `ndcg` is given and the
/// judgments are graded.
pub fn evaluate_query(
    query: &Query,
    result: &RetrievalResult,
    ndcg: Option<NdcgParams>,
) -> QueryEvaluation {
    let recall_precision = PerQueryCurve::evaluate(result, &query.relevance);

    let ndcg = ndcg
        .filter(|_| query.relevance.mode() == RelevanceMode::Graded)
        .map(|params| {
            match ndcg::evaluate(
                query.index,
                result,
                &query.relevance,
                params.limit,
                params.discount,
            ) {
                Ok(curve) => NdcgOutcome::Scored(curve),
                Err(err) => {
                    warn!(
                        query_index = query.index,
                        line = query.line,
                        error = %err,
                        "Excluding query from NDCG averages"
                    );
                    NdcgOutcome::Degenerate
                }
            }
        });

    QueryEvaluation {
        index: query.index,
        text: query.text.clone(),
        embedding: query
            .embedding
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        relevant: query.relevance.relevant_count(),
        retrieved: result.len(),
        recall_precision,
        ndcg,
    }
}
