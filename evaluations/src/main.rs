mod accumulator;
mod args;
mod corpus;
mod metrics;
mod pipeline;
mod report;

use anyhow::Context;
use retrieval_pipeline::HybridRetriever;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use crate::report::{EvaluationReport, RunSection};

fn main() -> anyhow::Result<()> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let _ = fmt()
        .with_env_filter(EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .try_init();

    let parsed = args::parse()?;
    let config = &parsed.config;

    info!(
        corpus = %config.corpus_dir.display(),
        queries = %config.query_file.display(),
        lambda = config.lambda,
        relevance = config.relevance.label(),
        similarity = config.settings.similarity.label(),
        ndcg_limit = config.settings.ndcg_limit,
        ndcg_discount = config.settings.ndcg_discount.label(),
        "Starting hybrid retrieval evaluation"
    );

    let retriever = HybridRetriever::load(
        &config.corpus_dir,
        &config.embedding_dir,
        config.lambda,
        config.settings.similarity,
    )
    .with_context(|| {
        format!(
            "building hybrid retriever from {} and {}",
            config.corpus_dir.display(),
            config.embedding_dir.display()
        )
    })?;

    let outcome = pipeline::run_evaluation(config, &retriever)?;

    let paths = report::write_reports(&config.output, &outcome.aggregate, &config.settings.plot_title)
        .with_context(|| format!("writing reports for {}", config.output.display()))?;
    info!(
        recall_precision = %paths.recall_precision.display(),
        recall_precision_plot = %paths.recall_precision_plot.display(),
        ndcg = ?paths.ndcg,
        ndcg_plot = ?paths.ndcg_plot,
        "Wrote evaluation artifacts"
    );

    if let Some(summary_path) = config.summary_json.as_deref() {
        let report = EvaluationReport {
            run: RunSection::from_config(config),
            aggregate: &outcome.aggregate,
            queries: &outcome.evaluations,
        };
        report::write_summary_json(summary_path, &report)
            .with_context(|| format!("writing JSON summary {}", summary_path.display()))?;
        info!(path = %summary_path.display(), "Wrote JSON summary");
    }

    let aggregate = &outcome.aggregate;
    match aggregate.ndcg.as_deref() {
        Some(ndcg) => println!(
            "Evaluated {} queries: precision@recall0 {:.4}, NDCG@{} {:.4} ({} degenerate); results in {}",
            aggregate.queries,
            aggregate.interpolated_precision[0],
            ndcg.len(),
            ndcg.last().copied().unwrap_or_default(),
            aggregate.degenerate_queries,
            paths.recall_precision.display()
        ),
        None => println!(
            "Evaluated {} queries: precision@recall0 {:.4}, precision@recall1 {:.4}; results in {}",
            aggregate.queries,
            aggregate.interpolated_precision[0],
            aggregate.interpolated_precision[10],
            paths.recall_precision.display()
        ),
    }

    Ok(())
}
