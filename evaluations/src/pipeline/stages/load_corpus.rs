use std::time::Instant;

use anyhow::Context;
use tracing::info;

use crate::{
    accumulator::RunAccumulator,
    corpus::{load_queries, RelevanceMode},
};

use super::super::{
    context::{EvalStage, EvaluationContext},
    state::{CorpusLoaded, EvaluationMachine, Ready},
};
use super::{map_guard_error, StageResult};

pub(crate) fn load_corpus(
    machine: EvaluationMachine<(), Ready>,
    ctx: &mut EvaluationContext<'_>,
) -> StageResult<CorpusLoaded> {
    let stage = EvalStage::LoadCorpus;
    info!(
        evaluation_stage = stage.label(),
        "starting evaluation stage"
    );
    let started = Instant::now();

    let config = ctx.config();
    ctx.queries = load_queries(
        &config.query_file,
        &config.query_embedding_dir,
        config.relevance,
    )
    .with_context(|| format!("loading query corpus {}", config.query_file.display()))?;

    let ndcg_limit =
        (config.relevance == RelevanceMode::Graded).then_some(config.settings.ndcg_limit);
    ctx.accumulator = RunAccumulator::new(ndcg_limit);

    let elapsed = started.elapsed();
    ctx.record_stage_duration(stage, elapsed);
    info!(
        evaluation_stage = stage.label(),
        queries = ctx.queries.len(),
        duration_ms = elapsed.as_millis(),
        "completed evaluation stage"
    );

    machine
        .load_corpus()
        .map_err(|(_, guard)| map_guard_error("load_corpus", guard))
}
