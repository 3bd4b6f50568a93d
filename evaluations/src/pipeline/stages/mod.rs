mod load_corpus;
mod run_queries;
mod summarize;

pub(crate) use load_corpus::load_corpus;
pub(crate) use run_queries::run_queries;
pub(crate) use summarize::summarize;

use anyhow::Result;
use state_machines::core::GuardError;

use super::state::EvaluationMachine;

fn map_guard_error(event: &str, guard: GuardError) -> anyhow::Error {
    anyhow::anyhow!("invalid evaluation pipeline transition during {event}: {guard:?}")
}

type StageResult<S> = Result<EvaluationMachine<(), S>>;
