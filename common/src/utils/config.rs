use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Discount applied to the gain at each rank when accumulating DCG.
#[derive(Clone, Copy, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DcgDiscount {
    /// `dcg[r] = dcg[r-1] + g[r] / log2(r + 1)` for zero-based `r >= 1`; rank 2 is undiscounted.
    #[default]
    Classic,
    /// `dcg[r] = dcg[r-1] + g[r] / log2(r + 2)`.
    Standard,
}

impl DcgDiscount {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Standard => "standard",
        }
    }
}

/// Dense similarity used by the reference hybrid retriever.
#[derive(Clone, Copy, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityKind {
    #[default]
    Cosine,
    /// Inverse Euclidean distance, `1 / (1 + d)`.
    Euclidean,
}

impl SimilarityKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
        }
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct EvalSettings {
    #[serde(default = "default_ndcg_limit")]
    pub ndcg_limit: usize,
    #[serde(default)]
    pub ndcg_discount: DcgDiscount,
    #[serde(default)]
    pub similarity: SimilarityKind,
    #[serde(default)]
    pub max_results: Option<usize>,
    #[serde(default = "default_plot_title")]
    pub plot_title: String,
}

pub const DEFAULT_NDCG_LIMIT: usize = 10;

fn default_ndcg_limit() -> usize {
    DEFAULT_NDCG_LIMIT
}

fn default_plot_title() -> String {
    "Hybrid".to_string()
}

impl Default for EvalSettings {
    fn default() -> Self {
        Self {
            ndcg_limit: default_ndcg_limit(),
            ndcg_discount: DcgDiscount::default(),
            similarity: SimilarityKind::default(),
            max_results: None,
            plot_title: default_plot_title(),
        }
    }
}

/// Load settings from an optional `hybrid-eval` config file, then `HYBRID_EVAL_*` variables.
pub fn get_settings() -> Result<EvalSettings, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("hybrid-eval").required(false))
        .add_source(Environment::with_prefix("HYBRID_EVAL"))
        .build()?;

    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sources_fall_back_to_defaults() {
        let settings: EvalSettings = Config::builder()
            .build()
            .and_then(Config::try_deserialize)
            .expect("empty config should deserialize");

        assert_eq!(settings.ndcg_limit, DEFAULT_NDCG_LIMIT);
        assert_eq!(settings.ndcg_discount, DcgDiscount::Classic);
        assert_eq!(settings.similarity, SimilarityKind::Cosine);
        assert!(settings.max_results.is_none());
        assert_eq!(settings.plot_title, "Hybrid");
    }

    #[test]
    fn overrides_are_parsed_from_sources() {
        let settings: EvalSettings = Config::builder()
            .set_override("ndcg_limit", 5_i64)
            .and_then(|builder| builder.set_override("ndcg_discount", "standard"))
            .and_then(|builder| builder.set_override("similarity", "euclidean"))
            .and_then(|builder| builder.set_override("max_results", 100_i64))
            .expect("overrides should be accepted")
            .build()
            .and_then(Config::try_deserialize)
            .expect("overridden config should deserialize");

        assert_eq!(settings.ndcg_limit, 5);
        assert_eq!(settings.ndcg_discount, DcgDiscount::Standard);
        assert_eq!(settings.similarity, SimilarityKind::Euclidean);
        assert_eq!(settings.max_results, Some(100));
    }
}
