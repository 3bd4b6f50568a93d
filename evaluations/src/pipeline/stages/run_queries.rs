use std::time::Instant;

use anyhow::Context;
use tracing::{debug, info};

use crate::{
    corpus::RelevanceMode,
    metrics::{evaluate_query, NdcgOutcome, NdcgParams},
};

use super::super::{
    context::{EvalStage, EvaluationContext},
    state::{CorpusLoaded, EvaluationMachine, QueriesFinished},
};
use super::{map_guard_error, StageResult};

pub(crate) fn run_queries(
    machine: EvaluationMachine<(), CorpusLoaded>,
    ctx: &mut EvaluationContext<'_>,
) -> StageResult<QueriesFinished> {
    let stage = EvalStage::RunQueries;
    info!(
        evaluation_stage = stage.label(),
        "starting evaluation stage"
    );
    let started = Instant::now();

    let config = ctx.config();
    let retriever = ctx.retriever();
    let ndcg = (config.relevance == RelevanceMode::Graded).then_some(NdcgParams {
        limit: config.settings.ndcg_limit,
        discount: config.settings.ndcg_discount,
    });
    let total = ctx.queries.len();

    for query in &ctx.queries {
        info!(
            query_index = query.index,
            total,
            embedding = %query.embedding.display(),
            query = query.text.as_str(),
            "Running query"
        );

        let mut result = retriever
            .retrieve(&query.embedding, &query.text)
            .with_context(|| {
                format!(
                    "retrieving query {} (line {}) with embedding {}",
                    query.index,
                    query.line,
                    query.embedding.display()
                )
            })?;
        if let Some(limit) = config.settings.max_results {
            result.truncate(limit);
        }

        let evaluation = evaluate_query(query, &result, ndcg);
        info!(
            query_index = query.index,
            retrieved = evaluation.retrieved,
            relevant = evaluation.relevant,
            relevant_retrieved = evaluation.recall_precision.points.len(),
            "Evaluated query"
        );
        if let Some(NdcgOutcome::Scored(curve)) = &evaluation.ndcg {
            debug!(query_index = query.index, ndcg = ?curve.ndcg, "Per-rank NDCG");
        }

        ctx.accumulator.merge(evaluation);
    }

    let elapsed = started.elapsed();
    ctx.record_stage_duration(stage, elapsed);
    info!(
        evaluation_stage = stage.label(),
        queries = ctx.accumulator.len(),
        duration_ms = elapsed.as_millis(),
        "completed evaluation stage"
    );

    machine
        .run_queries()
        .map_err(|(_, guard)| map_guard_error("run_queries", guard))
}
