//! In-memory TF-IDF vector-space index used as the sparse half of hybrid retrieval.
//!
//! Weights are `tf * ln(N / df)`; relevance is the cosine between the query's
//! weight vector and each document's. All maps are ordered so that floating
//! point accumulation, and therefore ranking, is identical across runs.

use std::collections::BTreeMap;

use tracing::debug;

#[derive(Debug, Clone)]
struct WeightedDocument {
    weights: BTreeMap<String, f64>,
    norm: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TfIdfIndex {
    documents: BTreeMap<String, WeightedDocument>,
    document_frequency: BTreeMap<String, usize>,
    document_count: usize,
}

/// Lowercased alphanumeric runs.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|ch: char| !ch.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn term_counts(text: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for token in tokenize(text) {
        let count: &mut usize = counts.entry(token).or_default();
        *count = count.saturating_add(1);
    }
    counts
}

impl TfIdfIndex {
    pub fn build<I, S>(documents: I) -> Self
    where
        I: IntoIterator<Item = (String, S)>,
        S: AsRef<str>,
    {
        let counted: BTreeMap<String, BTreeMap<String, usize>> = documents
            .into_iter()
            .map(|(id, text)| (id, term_counts(text.as_ref())))
            .collect();

        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        for counts in counted.values() {
            for term in counts.keys() {
                let df = document_frequency.entry(term.clone()).or_default();
                *df = df.saturating_add(1);
            }
        }

        let mut index = Self {
            documents: BTreeMap::new(),
            document_frequency,
            document_count: counted.len(),
        };

        let documents = counted
            .into_iter()
            .map(|(id, counts)| {
                let weights = index.weigh(&counts);
                let norm = vector_norm(&weights);
                (id, WeightedDocument { weights, norm })
            })
            .collect();
        index.documents = documents;

        debug!(
            documents = index.documents.len(),
            vocabulary = index.document_frequency.len(),
            "Built TF-IDF index"
        );
        index
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn idf(&self, term: &str) -> f64 {
        match self.document_frequency.get(term) {
            Some(&df) if df > 0 => (self.document_count as f64 / df as f64).ln(),
            _ => 0.0,
        }
    }

    fn weigh(&self, counts: &BTreeMap<String, usize>) -> BTreeMap<String, f64> {
        counts
            .iter()
            .filter_map(|(term, &tf)| {
                let weight = tf as f64 * self.idf(term);
                (weight > 0.0).then(|| (term.clone(), weight))
            })
            .collect()
    }

    /// Cosine similarity of the query against every document sharing at least one weighted term.
    pub fn score(&self, query_text: &str) -> BTreeMap<String, f64> {
        let query = self.weigh(&term_counts(query_text));
        let query_norm = vector_norm(&query);
        let mut scores = BTreeMap::new();
        if query_norm <= 0.0 {
            return scores;
        }

        for (id, document) in &self.documents {
            if document.norm <= 0.0 {
                continue;
            }
            let dot = query
                .iter()
                .filter_map(|(term, weight)| document.weights.get(term).map(|w| w * weight))
                .sum::<f64>();
            if dot > 0.0 {
                scores.insert(id.clone(), dot / (query_norm * document.norm));
            }
        }
        scores
    }
}

fn vector_norm(weights: &BTreeMap<String, f64>) -> f64 {
    weights.values().map(|w| w * w).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> TfIdfIndex {
        TfIdfIndex::build(vec![
            ("d1".to_string(), "rust ownership and borrowing"),
            ("d2".to_string(), "garbage collection in java"),
            ("d3".to_string(), "rust async runtimes and rust traits"),
        ])
    }

    #[test]
    fn tokenize_lowercases_and_splits_on_punctuation() {
        assert_eq!(
            tokenize("Hello, World! C3PO-droid"),
            vec!["hello", "world", "c3po", "droid"]
        );
    }

    #[test]
    fn idf_is_zero_for_terms_in_every_document_and_unknown_terms() {
        let index = TfIdfIndex::build(vec![
            ("a".to_string(), "shared alpha"),
            ("b".to_string(), "shared beta"),
        ]);
        assert!(index.idf("shared").abs() < f64::EPSILON);
        assert!(index.idf("missing").abs() < f64::EPSILON);
        assert!((index.idf("alpha") - 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn build_indexes_every_document() {
        let index = sample_index();

        assert_eq!(index.len(), 3);
        assert!(!index.is_empty());
        let scores = index.score("garbage collection");
        assert_eq!(scores.keys().collect::<Vec<_>>(), vec!["d2"]);
    }

    #[test]
    fn score_only_returns_matching_documents() {
        let index = sample_index();
        let scores = index.score("rust traits");

        assert!(scores.contains_key("d1"));
        assert!(scores.contains_key("d3"));
        assert!(!scores.contains_key("d2"));
        assert!(scores["d3"] > scores["d1"]);
        assert!(scores.values().all(|score| *score > 0.0 && *score <= 1.0 + 1e-12));
    }

    #[test]
    fn score_of_unmatched_query_is_empty() {
        let index = sample_index();
        assert!(index.score("python").is_empty());
        assert!(index.score("").is_empty());
    }
}
