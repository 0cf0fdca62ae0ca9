//! Data types for documents, chunks, and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A page-scoped text segment extracted from a source file.
///
/// Loaders produce one `Document` per page (PDF) or one for the whole file
/// (DOCX, plain text). The pipeline assigns the generated document identifier
/// before chunking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Identifier shared by every segment of the same upload.
    pub id: String,
    /// The extracted text content of this segment.
    pub text: String,
    /// Key-value metadata associated with the segment.
    pub metadata: HashMap<String, String>,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
    /// One-based page number, when the source format has pages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// A segment of a [`Document`] with its vector embedding.
///
/// Chunk IDs are the composite key `{document_id}_{sequence}`. Once written
/// to a vector store a chunk is immutable; reusing a key overwrites.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Composite key: document identifier plus sequence index.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
    /// Metadata inherited from the parent document plus chunk-specific fields.
    pub metadata: HashMap<String, String>,
    /// The identifier of the parent document.
    pub document_id: String,
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

/// Outcome of ingesting one uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestReport {
    /// The generated identifier under which the file's vectors are stored.
    pub document_id: String,
    /// Number of chunks embedded and written to the vector index.
    pub chunks_processed: usize,
    /// Number of page-scoped segments the loader produced.
    pub pages: usize,
}

/// Outcome of answering one question against a document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// The model's answer text, or the canned no-information answer.
    pub text: String,
    /// Number of retrieved chunks that backed the answer.
    pub sources_used: usize,
}
