//! Error types for DocBuddy
//!
//! One error enum for the whole library, grouped the way callers need to
//! react to it: rejected input, missing records, an empty candidate pool,
//! an unreachable language model, and infrastructure failures.

use thiserror::Error;

/// Main error type for DocBuddy
#[derive(Error, Debug)]
pub enum DocError {
    /// The question was blank after trimming
    #[error("Question is required")]
    EmptyQuestion,

    /// Upload request carried no file
    #[error("No file provided")]
    MissingFile,

    /// Upload filename has an extension we cannot parse
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Malformed request body or parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Chunker called with unusable window parameters
    #[error("Invalid chunking parameters: chunk_size={chunk_size}, overlap={overlap} (need chunk_size > 0 and overlap < chunk_size)")]
    InvalidChunking { chunk_size: usize, overlap: usize },

    /// Referenced record does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Candidate pool for a question is empty
    #[error("No document chunks available. Please upload documents first.")]
    NoChunksAvailable,

    /// Language model endpoint could not be reached at startup
    #[error("Ollama is not running or not accessible. Please install and start Ollama: https://ollama.ai\nError: {0}")]
    SynthesizerUnavailable(String),

    /// SQLite errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage layer errors that are not plain SQLite failures
    #[error("Storage error: {0}")]
    Storage(String),
}

impl DocError {
    /// True for errors caused by the caller rather than by the system
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DocError::EmptyQuestion
                | DocError::MissingFile
                | DocError::UnsupportedFileType(_)
                | DocError::InvalidRequest(_)
                | DocError::InvalidChunking { .. }
                | DocError::NotFound { .. }
                | DocError::NoChunksAvailable
        )
    }
}

/// Result type alias for DocBuddy operations
pub type Result<T> = std::result::Result<T, DocError>;
