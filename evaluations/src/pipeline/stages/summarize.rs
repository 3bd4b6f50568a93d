use std::time::Instant;

use tracing::{info, warn};

use super::super::{
    context::{EvalStage, EvaluationContext},
    state::{EvaluationMachine, QueriesFinished, Summarized},
};
use super::{map_guard_error, StageResult};

pub(crate) fn summarize(
    machine: EvaluationMachine<(), QueriesFinished>,
    ctx: &mut EvaluationContext<'_>,
) -> StageResult<Summarized> {
    let stage = EvalStage::Summarize;
    info!(
        evaluation_stage = stage.label(),
        "starting evaluation stage"
    );
    let started = Instant::now();

    if ctx.accumulator.is_empty() {
        warn!("No queries were evaluated; averages are all zero");
    }
    let aggregate = ctx.accumulator.aggregate();
    info!(
        queries = aggregate.queries,
        precision_at_recall_0 = aggregate.interpolated_precision[0],
        precision_at_recall_1 = aggregate.interpolated_precision[10],
        "Average interpolated precision"
    );
    if let Some(ndcg) = &aggregate.ndcg {
        info!(
            ndcg_queries = aggregate.ndcg_queries,
            degenerate_queries = aggregate.degenerate_queries,
            ndcg_at_limit = ndcg.last().copied().unwrap_or_default(),
            "Average NDCG"
        );
    }
    ctx.aggregate = Some(aggregate);

    let elapsed = started.elapsed();
    ctx.record_stage_duration(stage, elapsed);
    info!(
        evaluation_stage = stage.label(),
        duration_ms = elapsed.as_millis(),
        "completed evaluation stage"
    );

    machine
        .summarize()
        .map_err(|(_, guard)| map_guard_error("summarize", guard))
}
