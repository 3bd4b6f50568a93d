use config::ConfigError;
use thiserror::Error;

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Query corpus format error at line {line}: {message}")]
    Format { line: usize, message: String },
    #[error("Degenerate query {index}: ideal DCG is not positive at every rank")]
    DegenerateQuery { index: usize },
    #[error("Embedding error: {0}")]
    Embedding(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl AppError {
    pub fn format(line: usize, message: impl Into<String>) -> Self {
        Self::Format {
            line,
            message: message.into(),
        }
    }
}
