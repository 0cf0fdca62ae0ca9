//! Document question-answering pipeline.
//!
//! `docqa-rag` implements the ingest-and-answer workflow behind the DocQA
//! service: uploaded files are extracted into page segments, split into
//! overlapping chunks, embedded, and upserted into a vector index under a
//! generated document identifier; questions are embedded, matched against a
//! single document's chunks, and answered by a chat-completion model grounded
//! in the retrieved text.
//!
//! The seams are traits — [`Chunker`], [`EmbeddingProvider`], [`VectorStore`],
//! [`CompletionModel`] — with hosted-API backends ([`cohere`],
//! [`completion::GroqCompletionModel`], [`qdrant`] behind the `qdrant`
//! feature) and an in-memory store for development and tests. The
//! [`DocQaPipeline`] ties them together.

pub mod chunking;
pub mod cohere;
pub mod completion;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod inmemory;
pub mod loader;
pub mod pipeline;
#[cfg(feature = "qdrant")]
pub mod qdrant;
pub mod vectorstore;

pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker};
pub use cohere::CohereEmbeddingProvider;
pub use completion::{CompletionModel, GroqCompletionModel};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Answer, Chunk, Document, IngestReport, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use inmemory::InMemoryVectorStore;
pub use pipeline::{DocQaPipeline, DocQaPipelineBuilder, NO_MATCH_ANSWER};
#[cfg(feature = "qdrant")]
pub use qdrant::QdrantVectorStore;
pub use vectorstore::VectorStore;
