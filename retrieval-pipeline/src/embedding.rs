//! Dense vectors stored as plain text: one file per document or query, holding
//! whitespace-separated real values.

use std::{
    fs,
    path::{Path, PathBuf},
};

use common::{error::AppError, utils::config::SimilarityKind};

#[derive(Debug, Clone, PartialEq)]
pub struct DenseVector {
    values: Vec<f64>,
}

impl DenseVector {
    pub fn new(values: Vec<f64>) -> Result<Self, AppError> {
        if values.is_empty() {
            return Err(AppError::Embedding("embedding vector is empty".to_string()));
        }
        if values.iter().any(|value| !value.is_finite()) {
            return Err(AppError::Embedding(
                "embedding vector contains non-finite values".to_string(),
            ));
        }
        Ok(Self { values })
    }

    pub fn parse(text: &str) -> Result<Self, AppError> {
        let values = text
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|err| {
                    AppError::Embedding(format!("invalid embedding component '{token}': {err}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(values)
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
            .map_err(|err| AppError::Embedding(format!("{}: {err}", path.display())))
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn similarity(&self, other: &Self, kind: SimilarityKind) -> Result<f64, AppError> {
        if self.dimension() != other.dimension() {
            return Err(AppError::Embedding(format!(
                "dimension mismatch: {} vs {}",
                self.dimension(),
                other.dimension()
            )));
        }
        let (a, b) = (self.values(), other.values());
        Ok(match kind {
            SimilarityKind::Cosine => cosine_similarity(a, b),
            SimilarityKind::Euclidean => distance_to_similarity(euclidean_distance(a, b)),
        })
    }
}

/// Regular files directly under `dir`, sorted lexicographically by file name.
pub fn list_files_sorted(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot = x.mul_add(*y, dot);
        norm_a = x.mul_add(*x, norm_a);
        norm_b = y.mul_add(*y, norm_b);
    }
    if norm_a <= 0.0 || norm_b <= 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

pub fn distance_to_similarity(distance: f64) -> f64 {
    if !distance.is_finite() {
        return 0.0;
    }
    (1.0 / (1.0 + distance.max(0.0))).clamp(0.0, 1.0)
}
