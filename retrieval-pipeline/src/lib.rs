pub mod embedding;
pub mod fts;
pub mod hybrid;
pub mod scoring;

use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use common::error::AppError;

pub use hybrid::HybridRetriever;

/// Produces a ranked result list for one query.
///
/// Implementations own every similarity computation; callers only sequence
/// queries and score the rankings they get back. Identical inputs must yield
/// identical rankings.
pub trait Retriever {
    fn retrieve(&self, query_embedding: &Path, query_text: &str)
        -> Result<RetrievalResult, AppError>;
}

/// A single ranked hit: document identifier plus the retriever's score.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedDocument {
    pub document_id: String,
    pub score: f64,
}

impl RetrievedDocument {
    pub fn new(document_id: impl Into<String>, score: f64) -> Self {
        Self {
            document_id: document_id.into(),
            score,
        }
    }
}

/// Ranked documents for one query, ordered by non-increasing score.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalResult {
    documents: Vec<RetrievedDocument>,
}

impl RetrievalResult {
    /// Accept an already ranked list, rejecting any rank whose score exceeds its predecessor
    /// and any document identifier that appears more than once.
    pub fn ranked(documents: Vec<RetrievedDocument>) -> Result<Self, AppError> {
        let mut seen = BTreeSet::new();
        for (rank, document) in documents.iter().enumerate() {
            if !seen.insert(document.document_id.as_str()) {
                return Err(AppError::Validation(format!(
                    "retrieval result repeats document {} at rank {}",
                    document.document_id,
                    rank.saturating_add(1)
                )));
            }
        }
        if let Some(rank) = documents
            .windows(2)
            .position(|pair| match pair {
                [above, below] => below.score > above.score || below.score.is_nan(),
                _ => false,
            })
        {
            return Err(AppError::Validation(format!(
                "retrieval result is not sorted by non-increasing score at rank {}",
                rank.saturating_add(2)
            )));
        }
        Ok(Self { documents })
    }

    /// Rank an unordered list by score descending; ties fall back to the document identifier.
    /// A document listed more than once keeps its best score.
    pub fn from_unsorted(documents: Vec<RetrievedDocument>) -> Self {
        let mut best: BTreeMap<String, f64> = BTreeMap::new();
        for RetrievedDocument { document_id, score } in documents {
            best.entry(document_id)
                .and_modify(|kept| {
                    if score > *kept || kept.is_nan() {
                        *kept = score;
                    }
                })
                .or_insert(score);
        }

        let mut documents: Vec<RetrievedDocument> = best
            .into_iter()
            .map(|(document_id, score)| RetrievedDocument { document_id, score })
            .collect();
        documents.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.document_id.cmp(&b.document_id))
        });
        Self { documents }
    }

    pub fn documents(&self) -> &[RetrievedDocument] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Keep only the top `limit` ranks.
    pub fn truncate(&mut self, limit: usize) {
        self.documents.truncate(limit);
    }

    pub fn iter(&self) -> impl Iterator<Item = &RetrievedDocument> {
        self.documents.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranked_accepts_ties_and_descending_scores() {
        let result = RetrievalResult::ranked(vec![
            RetrievedDocument::new("a", 0.9),
            RetrievedDocument::new("b", 0.9),
            RetrievedDocument::new("c", 0.1),
        ])
        .expect("non-increasing scores are valid");

        assert_eq!(result.len(), 3);
    }

    #[test]
    fn ranked_rejects_increasing_scores() {
        let result = RetrievalResult::ranked(vec![
            RetrievedDocument::new("a", 0.2),
            RetrievedDocument::new("b", 0.5),
        ]);

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn ranked_rejects_repeated_document_ids() {
        let result = RetrievalResult::ranked(vec![
            RetrievedDocument::new("a", 0.9),
            RetrievedDocument::new("b", 0.85),
            RetrievedDocument::new("a", 0.8),
        ]);

        match result {
            Err(AppError::Validation(message)) => {
                assert!(message.contains("document a at rank 3"), "{message}");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn from_unsorted_keeps_best_score_per_document() {
        let result = RetrievalResult::from_unsorted(vec![
            RetrievedDocument::new("a", 0.2),
            RetrievedDocument::new("b", 0.5),
            RetrievedDocument::new("a", 0.9),
        ]);

        assert_eq!(
            result.documents(),
            &[
                RetrievedDocument::new("a", 0.9),
                RetrievedDocument::new("b", 0.5),
            ]
        );
    }

    #[test]
    fn from_unsorted_orders_by_score_then_identifier() {
        let result = RetrievalResult::from_unsorted(vec![
            RetrievedDocument::new("zeta", 0.5),
            RetrievedDocument::new("alpha", 0.5),
            RetrievedDocument::new("beta", 0.8),
        ]);

        let ids: Vec<&str> = result.iter().map(|doc| doc.document_id.as_str()).collect();
        assert_eq!(ids, vec!["beta", "alpha", "zeta"]);
    }

    #[test]
    fn truncate_keeps_top_ranks() {
        let mut result = RetrievalResult::from_unsorted(vec![
            RetrievedDocument::new("a", 0.3),
            RetrievedDocument::new("b", 0.2),
            RetrievedDocument::new("c", 0.1),
        ]);
        result.truncate(2);

        assert_eq!(result.len(), 2);
        assert_eq!(result.documents()[1].document_id, "b");
    }
}
