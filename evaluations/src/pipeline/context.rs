use std::time::Duration;

use retrieval_pipeline::Retriever;

use crate::{
    accumulator::{AggregateResult, RunAccumulator},
    args::Config,
    corpus::Query,
    metrics::QueryEvaluation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum EvalStage {
    LoadCorpus,
    RunQueries,
    Summarize,
}

impl EvalStage {
    pub fn label(self) -> &'static str {
        match self {
            Self::LoadCorpus => "load-corpus",
            Self::RunQueries => "run-queries",
            Self::Summarize => "summarize",
        }
    }
}

/// Result of a completed run.
#[derive(Debug)]
pub struct EvaluationOutcome {
    pub aggregate: AggregateResult,
    pub evaluations: Vec<QueryEvaluation>,
}

pub(super) struct EvaluationContext<'a> {
    config: &'a Config,
    retriever: &'a dyn Retriever,
    pub queries: Vec<Query>,
    pub accumulator: RunAccumulator,
    pub aggregate: Option<AggregateResult>,
    pub stage_durations: Vec<(EvalStage, Duration)>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(config: &'a Config, retriever: &'a dyn Retriever) -> Self {
        Self {
            config,
            retriever,
            queries: Vec::new(),
            accumulator: RunAccumulator::default(),
            aggregate: None,
            stage_durations: Vec::new(),
        }
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    pub fn retriever(&self) -> &'a dyn Retriever {
        self.retriever
    }

    pub fn record_stage_duration(&mut self, stage: EvalStage, duration: Duration) {
        self.stage_durations.push((stage, duration));
    }

    pub fn total_duration(&self) -> Duration {
        self.stage_durations.iter().map(|(_, duration)| *duration).sum()
    }

    pub fn into_outcome(self) -> anyhow::Result<EvaluationOutcome> {
        let aggregate = self
            .aggregate
            .ok_or_else(|| anyhow::anyhow!("evaluation finished without a summary"))?;
        Ok(EvaluationOutcome {
            aggregate,
            evaluations: self.accumulator.into_evaluations(),
        })
    }
}
