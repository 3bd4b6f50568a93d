mod context;
mod stages;
mod state;

use anyhow::Result;
use retrieval_pipeline::Retriever;
use tracing::info;

use crate::args::Config;

use context::EvaluationContext;
pub use context::EvaluationOutcome;

/// Parse the query corpus, score every query in corpus order, then average.
pub fn run_evaluation(config: &Config, retriever: &dyn Retriever) -> Result<EvaluationOutcome> {
    let mut ctx = EvaluationContext::new(config, retriever);
    let machine = state::ready();

    let machine = stages::load_corpus(machine, &mut ctx)?;
    let machine = stages::run_queries(machine, &mut ctx)?;
    let machine = stages::summarize(machine, &mut ctx)?;

    drop(machine);

    info!(
        stages = ctx.stage_durations.len(),
        duration_ms = ctx.total_duration().as_millis(),
        "Evaluation pipeline finished"
    );

    ctx.into_outcome()
}
