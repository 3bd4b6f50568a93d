use std::{
    ffi::OsString,
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    accumulator::AggregateResult,
    args::{ensure_parent, Config},
    metrics::{QueryEvaluation, RECALL_LEVELS},
};

#[derive(Debug, Clone, PartialEq)]
pub struct ReportPaths {
    pub recall_precision: PathBuf,
    pub recall_precision_plot: PathBuf,
    pub ndcg: Option<PathBuf>,
    pub ndcg_plot: Option<PathBuf>,
}

/// Run parameters echoed into the JSON summary.
#[derive(Debug, Serialize)]
pub struct RunSection {
    pub corpus_dir: String,
    pub embedding_dir: String,
    pub query_file: String,
    pub query_embedding_dir: String,
    pub lambda: f64,
    pub relevance: &'static str,
    pub similarity: &'static str,
    pub ndcg_limit: usize,
    pub ndcg_discount: &'static str,
    pub max_results: Option<usize>,
}

impl RunSection {
    pub fn from_config(config: &Config) -> Self {
        Self {
            corpus_dir: config.corpus_dir.display().to_string(),
            embedding_dir: config.embedding_dir.display().to_string(),
            query_file: config.query_file.display().to_string(),
            query_embedding_dir: config.query_embedding_dir.display().to_string(),
            lambda: config.lambda,
            relevance: config.relevance.label(),
            similarity: config.settings.similarity.label(),
            ndcg_limit: config.settings.ndcg_limit,
            ndcg_discount: config.settings.ndcg_discount.label(),
            max_results: config.settings.max_results,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EvaluationReport<'a> {
    pub run: RunSection,
    pub aggregate: &'a AggregateResult,
    pub queries: &'a [QueryEvaluation],
}

/// `path` with `suffix` appended to its file name (`out` -> `out.gplot`).
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw = OsString::from(path.as_os_str());
    raw.push(suffix);
    PathBuf::from(raw)
}

/// Shortest round-trip decimal, keeping a `.0` on integral values.
///
/// Magnitudes below `1e-3` or from `1e7` up switch to `<mantissa>E<exponent>`
/// (`5.0E-4`, `1.2345E7`), the layout of the original tables.
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-3..1e7).contains(&magnitude) {
        let scientific = format!("{value:e}");
        let (mantissa, exponent) = scientific
            .split_once('e')
            .unwrap_or((scientific.as_str(), "0"));
        return format!("{}E{exponent}", with_decimal_point(mantissa));
    }

    with_decimal_point(&value.to_string())
}

fn with_decimal_point(text: &str) -> String {
    if text.contains('.') {
        text.to_string()
    } else {
        format!("{text}.0")
    }
}

pub fn render_recall_precision_table(averages: &[f64]) -> String {
    let mut out = String::new();
    for (level, value) in RECALL_LEVELS.iter().zip(averages) {
        let _ = writeln!(out, "{level:.1} {}", format_value(*value));
    }
    out
}

pub fn render_ndcg_table(averages: &[f64]) -> String {
    let mut out = String::new();
    for (rank, value) in averages.iter().enumerate() {
        let _ = writeln!(out, "{} {}", rank + 1, format_value(*value));
    }
    out
}

fn render_plot(
    x_label: &str,
    y_label: &str,
    x_range: &str,
    data_file: &str,
    title: &str,
) -> String {
    format!(
        "set xlabel \"{x_label}\"\nset ylabel \"{y_label}\"\n\n\
         set terminal postscript color\nset size 0.75,0.75\n\n\
         set style data linespoints\nset key top right\n\n\
         set xrange [{x_range}]\nset yrange [0:1]\n\n\
         plot '{data_file}' title \"{title}\""
    )
}

pub fn render_recall_precision_plot(data_file: &str, title: &str) -> String {
    render_plot("Recall", "Precision", "0:1", data_file, title)
}

pub fn render_ndcg_plot(data_file: &str, title: &str, limit: usize) -> String {
    render_plot("Rank", "NDCG", &format!("1:{limit}"), data_file, title)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}

/// Write the recall/precision table and plot, plus the NDCG pair when the run was graded.
pub fn write_reports(
    output: &Path,
    aggregate: &AggregateResult,
    plot_title: &str,
) -> Result<ReportPaths> {
    let data_name = output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("output path {} has no file name", output.display()))?;

    let recall_precision = output.to_path_buf();
    write_file(
        &recall_precision,
        &render_recall_precision_table(&aggregate.interpolated_precision),
    )?;
    let recall_precision_plot = with_suffix(output, ".gplot");
    write_file(
        &recall_precision_plot,
        &render_recall_precision_plot(&data_name, plot_title),
    )?;

    let (ndcg, ndcg_plot) = match aggregate.ndcg.as_deref() {
        Some(averages) => {
            let table = with_suffix(output, ".ndcg");
            write_file(&table, &render_ndcg_table(averages))?;
            let plot = with_suffix(output, ".ndcg.gplot");
            write_file(
                &plot,
                &render_ndcg_plot(&format!("{data_name}.ndcg"), plot_title, averages.len()),
            )?;
            (Some(table), Some(plot))
        }
        None => (None, None),
    };

    Ok(ReportPaths {
        recall_precision,
        recall_precision_plot,
        ndcg,
        ndcg_plot,
    })
}

pub fn write_summary_json(path: &Path, report: &EvaluationReport<'_>) -> Result<()> {
    let mut blob = serde_json::to_string_pretty(report).context("serialising JSON summary")?;
    blob.push('\n');
    write_file(path, &blob)
}
