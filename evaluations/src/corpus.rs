//! Query corpus parsing.
//!
//! The corpus is a sequence of blocks: a query-text line, a relevance line, and
//! a blank separator (or end of input). Binary relevance lines list document
//! identifiers; graded lines alternate identifier and decimal grade.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    fs::File,
    io::{BufRead, BufReader, Lines},
    path::{Path, PathBuf},
};

use clap::ValueEnum;
use common::error::AppError;
use retrieval_pipeline::embedding::list_files_sorted;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum RelevanceMode {
    #[default]
    Binary,
    Graded,
}

impl RelevanceMode {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Graded => "graded",
        }
    }
}

impl fmt::Display for RelevanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ground-truth judgments for one query.
#[derive(Debug, Clone, PartialEq)]
pub enum Relevance {
    Binary(BTreeSet<String>),
    Graded(BTreeMap<String, f64>),
}

impl Relevance {
    pub const fn mode(&self) -> RelevanceMode {
        match self {
            Self::Binary(_) => RelevanceMode::Binary,
            Self::Graded(_) => RelevanceMode::Graded,
        }
    }

    pub fn relevant_count(&self) -> usize {
        match self {
            Self::Binary(ids) => ids.len(),
            Self::Graded(grades) => grades.len(),
        }
    }

    pub fn is_relevant(&self, document_id: &str) -> bool {
        match self {
            Self::Binary(ids) => ids.contains(document_id),
            Self::Graded(grades) => grades.contains_key(document_id),
        }
    }

    /// Grade of a judged document; binary judgments grade every listed document 1.0.
    pub fn grade(&self, document_id: &str) -> Option<f64> {
        match self {
            Self::Binary(ids) => ids.contains(document_id).then_some(1.0),
            Self::Graded(grades) => grades.get(document_id).copied(),
        }
    }

    pub fn grades(&self) -> Vec<f64> {
        match self {
            Self::Binary(ids) => vec![1.0; ids.len()],
            Self::Graded(grades) => grades.values().copied().collect(),
        }
    }

    fn parse(line: &str, line_number: usize, mode: RelevanceMode) -> Result<Self, AppError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match mode {
            RelevanceMode::Binary => {
                let mut ids = BTreeSet::new();
                for token in tokens {
                    if !ids.insert(token.to_string()) {
                        warn!(line = line_number, document = token, "Duplicate relevant document");
                    }
                }
                Ok(Self::Binary(ids))
            }
            RelevanceMode::Graded => {
                if tokens.len() % 2 != 0 {
                    return Err(AppError::format(
                        line_number,
                        format!(
                            "graded relevance line has an odd number of tokens ({})",
                            tokens.len()
                        ),
                    ));
                }
                let mut grades = BTreeMap::new();
                for pair in tokens.chunks_exact(2) {
                    let (id, raw_grade) = (pair[0], pair[1]);
                    let grade = raw_grade.parse::<f64>().map_err(|err| {
                        AppError::format(
                            line_number,
                            format!("invalid relevance score '{raw_grade}' for '{id}': {err}"),
                        )
                    })?;
                    if grades.insert(id.to_string(), grade).is_some() {
                        warn!(
                            line = line_number,
                            document = id,
                            grade,
                            "Duplicate graded document; keeping the later grade"
                        );
                    }
                }
                Ok(Self::Graded(grades))
            }
        }
    }
}

/// One parsed corpus block before it is paired with its embedding file.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryBlock {
    pub line: usize,
    pub text: String,
    pub relevance: Relevance,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub index: usize,
    pub line: usize,
    pub text: String,
    pub embedding: PathBuf,
    pub relevance: Relevance,
}

pub struct QueryCorpusReader<R> {
    lines: Lines<R>,
    line_number: usize,
    mode: RelevanceMode,
    failed: bool,
}

impl<R: BufRead> QueryCorpusReader<R> {
    pub fn new(reader: R, mode: RelevanceMode) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
            mode,
            failed: false,
        }
    }

    fn next_line(&mut self) -> Result<Option<String>, AppError> {
        match self.lines.next() {
            Some(line) => {
                self.line_number = self.line_number.saturating_add(1);
                Ok(Some(line?))
            }
            None => Ok(None),
        }
    }

    fn read_block(&mut self) -> Result<Option<QueryBlock>, AppError> {
        let (text_line, text) = loop {
            match self.next_line()? {
                None => return Ok(None),
                Some(line) if line.trim().is_empty() => {}
                Some(line) => break (self.line_number, line.trim().to_string()),
            }
        };

        let Some(relevance_line) = self.next_line()? else {
            return Err(AppError::format(
                text_line,
                "query text is not followed by a relevance line",
            ));
        };
        let relevance = Relevance::parse(&relevance_line, self.line_number, self.mode)?;

        if let Some(separator) = self.next_line()? {
            if !separator.trim().is_empty() {
                return Err(AppError::format(
                    self.line_number,
                    format!("expected a blank line after the query block, found '{separator}'"),
                ));
            }
        }

        Ok(Some(QueryBlock {
            line: text_line,
            text,
            relevance,
        }))
    }
}

impl<R: BufRead> Iterator for QueryCorpusReader<R> {
    type Item = Result<QueryBlock, AppError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_block() {
            Ok(block) => block.map(Ok),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Parse every block up front; the first format violation aborts.
pub fn parse_query_corpus<R: BufRead>(
    reader: R,
    mode: RelevanceMode,
) -> Result<Vec<QueryBlock>, AppError> {
    QueryCorpusReader::new(reader, mode).collect()
}

/// Pair blocks positionally with the query embedding files sorted by name.
pub fn attach_embeddings(
    blocks: Vec<QueryBlock>,
    embedding_files: Vec<PathBuf>,
) -> Result<Vec<Query>, AppError> {
    if blocks.len() != embedding_files.len() {
        return Err(AppError::Validation(format!(
            "query corpus has {} queries but {} query embedding files were found",
            blocks.len(),
            embedding_files.len()
        )));
    }

    Ok(blocks
        .into_iter()
        .zip(embedding_files)
        .enumerate()
        .map(|(index, (block, embedding))| {
            debug!(
                query_index = index,
                line = block.line,
                embedding = %embedding.display(),
                "Paired query with embedding file"
            );
            Query {
                index,
                line: block.line,
                text: block.text,
                embedding,
                relevance: block.relevance,
            }
        })
        .collect())
}

pub fn load_queries(
    query_file: &Path,
    query_embedding_dir: &Path,
    mode: RelevanceMode,
) -> Result<Vec<Query>, AppError> {
    let reader = BufReader::new(File::open(query_file)?);
    let blocks = parse_query_corpus(reader, mode)?;
    let embedding_files = list_files_sorted(query_embedding_dir)?;
    let queries = attach_embeddings(blocks, embedding_files)?;
    info!(
        queries = queries.len(),
        relevance = mode.label(),
        corpus = %query_file.display(),
        "Parsed query corpus"
    );
    Ok(queries)
}
