//! Reference retriever blending dense embedding similarity with sparse TF-IDF
//! similarity through a single weight λ.

use std::{collections::BTreeMap, fs, path::Path};

use common::{error::AppError, utils::config::SimilarityKind};
use tracing::{debug, info, instrument};

use crate::{
    embedding::{list_files_sorted, DenseVector},
    fts::TfIdfIndex,
    scoring::{fuse_scores, merge_signals, sort_by_fused_desc, FusionWeights},
    RetrievalResult, RetrievedDocument, Retriever,
};

pub struct HybridRetriever {
    index: TfIdfIndex,
    embeddings: BTreeMap<String, DenseVector>,
    weights: FusionWeights,
    similarity: SimilarityKind,
    dimension: usize,
}

impl HybridRetriever {
    /// Build from in-memory documents and their embeddings, keyed by document identifier.
    pub fn new(
        documents: BTreeMap<String, String>,
        embeddings: BTreeMap<String, DenseVector>,
        lambda: f64,
        similarity: SimilarityKind,
    ) -> Result<Self, AppError> {
        let weights = FusionWeights::from_lambda(lambda)?;

        if let Some(missing) = documents.keys().find(|id| !embeddings.contains_key(*id)) {
            return Err(AppError::Embedding(format!(
                "document '{missing}' has no embedding"
            )));
        }

        let mut dimensions = embeddings.values().map(DenseVector::dimension);
        let dimension = dimensions.next().unwrap_or_default();
        if dimensions.any(|other| other != dimension) {
            return Err(AppError::Embedding(
                "document embeddings do not share a single dimension".to_string(),
            ));
        }

        let index = TfIdfIndex::build(documents);

        Ok(Self {
            index,
            embeddings,
            weights,
            similarity,
            dimension,
        })
    }

    /// Read every file of `corpus_dir` as a document and its embedding from the
    /// identically named file in `embedding_dir`.
    #[instrument(skip_all, fields(corpus = %corpus_dir.display(), embeddings = %embedding_dir.display()))]
    pub fn load(
        corpus_dir: &Path,
        embedding_dir: &Path,
        lambda: f64,
        similarity: SimilarityKind,
    ) -> Result<Self, AppError> {
        let mut documents = BTreeMap::new();
        let mut embeddings = BTreeMap::new();

        for path in list_files_sorted(corpus_dir)? {
            let Some(name) = path.file_name() else {
                continue;
            };
            let id = name.to_string_lossy().into_owned();
            let text = String::from_utf8_lossy(&fs::read(&path)?).into_owned();
            let embedding_path = embedding_dir.join(name);
            if !embedding_path.is_file() {
                return Err(AppError::Embedding(format!(
                    "missing embedding file {} for document '{id}'",
                    embedding_path.display()
                )));
            }
            embeddings.insert(id.clone(), DenseVector::load(&embedding_path)?);
            documents.insert(id, text);
        }

        let retriever = Self::new(documents, embeddings, lambda, similarity)?;
        info!(
            documents = retriever.document_count(),
            dimension = retriever.dimension,
            lambda,
            similarity = similarity.label(),
            "Loaded hybrid retriever"
        );
        Ok(retriever)
    }

    pub fn document_count(&self) -> usize {
        self.index.len()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn dense_scores(&self, query: &DenseVector) -> Result<BTreeMap<String, f64>, AppError> {
        self.embeddings
            .iter()
            .map(|(id, vector)| Ok((id.clone(), query.similarity(vector, self.similarity)?)))
            .collect()
    }
}

impl Retriever for HybridRetriever {
    fn retrieve(
        &self,
        query_embedding: &Path,
        query_text: &str,
    ) -> Result<RetrievalResult, AppError> {
        let query_vector = DenseVector::load(query_embedding)?;
        if query_vector.dimension() != self.dimension {
            return Err(AppError::Embedding(format!(
                "query embedding {} has dimension {}, documents have {}",
                query_embedding.display(),
                query_vector.dimension(),
                self.dimension
            )));
        }

        let dense = self.dense_scores(&query_vector)?;
        let sparse = self.index.score(query_text);

        let mut candidates = merge_signals(&dense, &sparse);
        for candidate in &mut candidates {
            candidate.fused = fuse_scores(&candidate.scores, self.weights);
        }
        candidates.retain(|candidate| candidate.fused > 0.0);
        sort_by_fused_desc(&mut candidates);

        debug!(
            dense_candidates = dense.len(),
            sparse_candidates = sparse.len(),
            returned = candidates.len(),
            "Fused hybrid scores"
        );

        RetrievalResult::ranked(
            candidates
                .into_iter()
                .map(|candidate| RetrievedDocument::new(candidate.document_id, candidate.fused))
                .collect(),
        )
    }
}
