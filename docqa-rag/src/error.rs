//! Error types for the `docqa-rag` crate.

use thiserror::Error;

/// Errors that can occur while ingesting or answering against a document.
#[derive(Debug, Error)]
pub enum RagError {
    /// The uploaded file has an extension no loader handles.
    #[error("Unsupported file type: .{0}")]
    UnsupportedFileType(String),

    /// An I/O error while reading a source file.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Text extraction from a source file failed.
    #[error("Extraction error ({format}): {message}")]
    ExtractionError {
        /// The file format being extracted (e.g. `pdf`, `docx`).
        format: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The chat-completion backend failed to produce an answer.
    #[error("Completion error ({provider}): {message}")]
    CompletionError {
        /// The completion provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

/// A convenience result type for pipeline operations.
pub type Result<T> = std::result::Result<T, RagError>;
