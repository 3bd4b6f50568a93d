use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use common::utils::config::{get_settings, EvalSettings};

use crate::corpus::RelevanceMode;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "hybrid-eval",
    author,
    version,
    about = "Recall/precision and NDCG evaluation of hybrid dense + sparse retrieval",
    long_about = None
)]
pub struct Config {
    /// Directory holding one file per document
    pub corpus_dir: PathBuf,

    /// Directory holding one embedding file per document, named like the document
    pub embedding_dir: PathBuf,

    /// Query corpus: query line, relevance line, blank line, repeated
    pub query_file: PathBuf,

    /// Directory of per-query embedding files, matched to queries in file-name order
    pub query_embedding_dir: PathBuf,

    /// Weight of the dense score in [0, 1]; the sparse score gets the remainder
    #[arg(allow_negative_numbers = true)]
    pub lambda: f64,

    /// Recall/precision table path; plots and NDCG tables are written next to it
    pub output: PathBuf,

    /// How relevance lines are interpreted
    #[arg(long, value_enum, default_value_t = RelevanceMode::Binary)]
    pub relevance: RelevanceMode,

    /// Number of ranks scored by NDCG (graded runs)
    #[arg(long)]
    pub ndcg_limit: Option<usize>,

    /// Truncate each ranking to this many documents before scoring
    #[arg(long)]
    pub max_results: Option<usize>,

    /// Also write a JSON summary of the run to this path
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Title used in the generated gnuplot scripts
    #[arg(long)]
    pub plot_title: Option<String>,

    // Computed fields (not arguments)
    #[arg(skip)]
    pub settings: EvalSettings,
}

impl Config {
    /// Layer command-line overrides over `settings` and validate the result.
    pub fn finalize(&mut self, mut settings: EvalSettings) -> Result<()> {
        if let Some(limit) = self.ndcg_limit {
            settings.ndcg_limit = limit;
        }
        if let Some(max_results) = self.max_results {
            settings.max_results = Some(max_results);
        }
        if let Some(title) = &self.plot_title {
            settings.plot_title.clone_from(title);
        }
        self.settings = settings;

        if !self.lambda.is_finite() || !(0.0..=1.0).contains(&self.lambda) {
            return Err(anyhow!(
                "LAMBDA must be a finite number in [0, 1] (got {})",
                self.lambda
            ));
        }

        if self.settings.ndcg_limit == 0 {
            return Err(anyhow!("--ndcg-limit must be greater than zero"));
        }

        if self.settings.max_results == Some(0) {
            return Err(anyhow!("--max-results must be greater than zero"));
        }

        if self.output.file_name().is_none() {
            return Err(anyhow!(
                "OUTPUT must name a file (got {})",
                self.output.display()
            ));
        }

        for (label, dir) in [
            ("CORPUS_DIR", &self.corpus_dir),
            ("EMBEDDING_DIR", &self.embedding_dir),
            ("QUERY_EMBEDDING_DIR", &self.query_embedding_dir),
        ] {
            if !dir.is_dir() {
                return Err(anyhow!("{label} {} is not a directory", dir.display()));
            }
        }

        if !self.query_file.is_file() {
            return Err(anyhow!(
                "QUERY_FILE {} is not a readable file",
                self.query_file.display()
            ));
        }

        Ok(())
    }
}

pub struct ParsedArgs {
    pub config: Config,
}

pub fn parse() -> Result<ParsedArgs> {
    let mut config = Config::parse();
    let settings = get_settings().context("loading hybrid-eval settings")?;
    config.finalize(settings)?;
    Ok(ParsedArgs { config })
}

pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating parent directory for {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().expect("temp dir");
            for name in ["docs", "doc-embeddings", "query-embeddings"] {
                std::fs::create_dir(dir.path().join(name)).expect("create dir");
            }
            std::fs::write(dir.path().join("queries.txt"), "q\ndoc\n").expect("write queries");
            Self { dir }
        }

        fn argv(&self, lambda: &str, extra: &[&str]) -> Vec<String> {
            let root = self.dir.path();
            let mut argv: Vec<String> = vec!["hybrid-eval".to_string()];
            argv.extend(
                [
                    root.join("docs"),
                    root.join("doc-embeddings"),
                    root.join("queries.txt"),
                    root.join("query-embeddings"),
                ]
                .iter()
                .map(|path| path.display().to_string()),
            );
            argv.push(lambda.to_string());
            argv.push(root.join("out/run").display().to_string());
            argv.extend(extra.iter().map(|arg| (*arg).to_string()));
            argv
        }
    }

    fn finalize(argv: Vec<String>, settings: EvalSettings) -> Result<Config> {
        let mut config = Config::try_parse_from(argv)?;
        config.finalize(settings)?;
        Ok(config)
    }

    #[test]
    fn positional_arguments_and_defaults() {
        let fixture = Fixture::new();
        let config = finalize(fixture.argv("0.5", &[]), EvalSettings::default())
            .expect("valid arguments");

        assert!((config.lambda - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.relevance, RelevanceMode::Binary);
        assert_eq!(config.settings.ndcg_limit, 10);
        assert!(config.summary_json.is_none());
    }

    #[test]
    fn command_line_flags_override_settings() {
        let fixture = Fixture::new();
        let settings = EvalSettings {
            ndcg_limit: 20,
            plot_title: "From settings".to_string(),
            ..EvalSettings::default()
        };
        let config = finalize(
            fixture.argv(
                "1",
                &["--relevance", "graded", "--ndcg-limit", "5", "--plot-title", "VSR"],
            ),
            settings,
        )
        .expect("valid arguments");

        assert_eq!(config.relevance, RelevanceMode::Graded);
        assert_eq!(config.settings.ndcg_limit, 5);
        assert_eq!(config.settings.plot_title, "VSR");
    }

    #[test]
    fn lambda_outside_unit_interval_is_rejected() {
        let fixture = Fixture::new();
        assert!(finalize(fixture.argv("1.5", &[]), EvalSettings::default()).is_err());
        assert!(finalize(fixture.argv("-0.1", &[]), EvalSettings::default()).is_err());
        assert!(finalize(fixture.argv("NaN", &[]), EvalSettings::default()).is_err());
    }

    #[test]
    fn zero_limits_are_rejected() {
        let fixture = Fixture::new();
        assert!(finalize(
            fixture.argv("0.5", &["--ndcg-limit", "0"]),
            EvalSettings::default()
        )
        .is_err());
        assert!(finalize(
            fixture.argv("0.5", &["--max-results", "0"]),
            EvalSettings::default()
        )
        .is_err());
    }

    #[test]
    fn missing_input_directory_is_rejected() {
        let fixture = Fixture::new();
        std::fs::remove_dir(fixture.dir.path().join("query-embeddings")).expect("remove dir");

        let err = finalize(fixture.argv("0.5", &[]), EvalSettings::default())
            .expect_err("directory is missing");
        assert!(err.to_string().contains("QUERY_EMBEDDING_DIR"));
    }

    #[test]
    fn ensure_parent_creates_missing_directories() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("a/b/report.txt");

        ensure_parent(&path).expect("parents created");
        assert!(dir.path().join("a/b").is_dir());
    }
}
