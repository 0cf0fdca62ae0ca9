//! Document question-answering pipeline orchestrator.
//!
//! The [`DocQaPipeline`] coordinates the two workflows of the service by
//! composing an [`EmbeddingProvider`], a [`VectorStore`], a [`Chunker`], and
//! a [`CompletionModel`]:
//!
//! - **ingestion** — load a file into page segments, chunk, embed in
//!   sequential batches, and upsert under a freshly generated document id;
//! - **answering** — embed the question, run a document-filtered similarity
//!   search, and either return the canned no-information answer or forward
//!   the assembled context to the completion model.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docqa_rag::{DocQaPipeline, RagConfig, InMemoryVectorStore, RecursiveChunker};
//!
//! let pipeline = DocQaPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .chunker(Arc::new(RecursiveChunker::new(200, 20)))
//!     .completion_model(Arc::new(model))
//!     .build()?;
//!
//! pipeline.ensure_collection().await?;
//! let report = pipeline.ingest_file(&path, "notes.txt").await?;
//! let answer = pipeline.answer("what does it say?", &report.document_id).await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info};
use uuid::Uuid;

use crate::chunking::Chunker;
use crate::completion::CompletionModel;
use crate::config::RagConfig;
use crate::document::{Answer, Chunk, IngestReport};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::loader;
use crate::vectorstore::VectorStore;

/// The default vector store collection name.
const DEFAULT_COLLECTION: &str = "documents";

/// Answer returned when the filtered search finds no matches. Zero matches
/// is a successful outcome, not an error.
pub const NO_MATCH_ANSWER: &str = "I couldn't find any relevant information.";

/// The pipeline orchestrator. Construct one via [`DocQaPipeline::builder()`].
pub struct DocQaPipeline {
    config: RagConfig,
    collection: String,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    completion_model: Arc<dyn CompletionModel>,
}

impl DocQaPipeline {
    /// Create a new [`DocQaPipelineBuilder`].
    pub fn builder() -> DocQaPipelineBuilder {
        DocQaPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Create the pipeline's collection in the vector store if it does not
    /// already exist, with the dimensionality reported by the configured
    /// [`EmbeddingProvider`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if the vector store operation fails.
    pub async fn ensure_collection(&self) -> Result<()> {
        let dimensions = self.embedding_provider.dimensions();
        self.vector_store.create_collection(&self.collection, dimensions).await.map_err(|e| {
            error!(collection = %self.collection, error = %e, "failed to create collection");
            RagError::PipelineError(format!(
                "failed to create collection '{}': {e}",
                self.collection
            ))
        })
    }

    /// Ingest an uploaded file: load → chunk → embed → upsert.
    ///
    /// A fresh v4 UUID becomes the document identifier; every chunk is keyed
    /// `{document_id}_{seq}` with a sequence spanning all page segments.
    /// Chunks are embedded and upserted in sequential batches of
    /// `embed_batch_size`, so a mid-stream failure leaves earlier batches
    /// durably written under a document id the caller never received —
    /// ingestion is not transactional and nothing is rolled back.
    ///
    /// The transient file itself is the caller's to clean up; the pipeline
    /// only reads it.
    ///
    /// # Errors
    ///
    /// Loader errors pass through unchanged (so unsupported types stay
    /// distinguishable as client errors); embedding and store failures are
    /// wrapped in [`RagError::PipelineError`].
    pub async fn ingest_file(&self, path: &Path, file_name: &str) -> Result<IngestReport> {
        let mut pages = loader::load_file(path, file_name).await?;
        let page_count = pages.len();

        let document_id = Uuid::new_v4().to_string();

        let mut chunks: Vec<Chunk> = Vec::new();
        for page in &mut pages {
            page.id = document_id.clone();
            chunks.extend(self.chunker.chunk(page));
        }

        // Re-key with one sequence across all pages so composite keys stay
        // unique within the document.
        for (seq, chunk) in chunks.iter_mut().enumerate() {
            chunk.id = format!("{document_id}_{seq}");
            chunk.metadata.insert("chunk_index".to_string(), seq.to_string());
        }

        if chunks.is_empty() {
            info!(document.id = %document_id, chunk_count = 0, "ingested document (empty)");
            return Ok(IngestReport { document_id, chunks_processed: 0, pages: page_count });
        }

        let total = chunks.len();
        let batch_size = self.config.embed_batch_size;

        for (batch_index, batch) in chunks.chunks_mut(batch_size).enumerate() {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();

            let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
                error!(document.id = %document_id, batch_index, error = %e, "embedding failed during ingestion");
                RagError::PipelineError(format!(
                    "embedding failed for document '{document_id}': {e}"
                ))
            })?;

            for (chunk, embedding) in batch.iter_mut().zip(embeddings) {
                chunk.embedding = embedding;
            }

            self.vector_store.upsert(&self.collection, batch).await.map_err(|e| {
                error!(document.id = %document_id, batch_index, error = %e, "upsert failed during ingestion");
                RagError::PipelineError(format!("upsert failed for document '{document_id}': {e}"))
            })?;

            debug!(document.id = %document_id, batch_index, batch_len = batch.len(), "processed batch");
        }

        info!(document.id = %document_id, chunk_count = total, pages = page_count, "ingested document");

        Ok(IngestReport { document_id, chunks_processed: total, pages: page_count })
    }

    /// Answer a question against one document's chunks.
    ///
    /// Embeds the question, searches the top-K chunks restricted to
    /// `document_id`, and forwards the assembled context to the completion
    /// model. Zero matches yields the canned [`NO_MATCH_ANSWER`] with
    /// `sources_used = 0`. Each call is stateless.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if embedding, search, or the
    /// completion call fails.
    pub async fn answer(&self, question: &str, document_id: &str) -> Result<Answer> {
        let query_embedding = self.embedding_provider.embed_query(question).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            RagError::PipelineError(format!("query embedding failed: {e}"))
        })?;

        let matches = self
            .vector_store
            .search(&self.collection, &query_embedding, self.config.top_k, Some(document_id))
            .await
            .map_err(|e| {
                error!(document.id = %document_id, error = %e, "vector store search failed");
                RagError::PipelineError(format!(
                    "search failed for document '{document_id}': {e}"
                ))
            })?;

        if matches.is_empty() {
            info!(document.id = %document_id, "no matches for question");
            return Ok(Answer { text: NO_MATCH_ANSWER.to_string(), sources_used: 0 });
        }

        let sources_used = matches.len();
        let context =
            matches.iter().map(|m| m.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n");

        let text = self.completion_model.complete(&context, question).await.map_err(|e| {
            error!(document.id = %document_id, error = %e, "completion failed");
            RagError::PipelineError(format!("completion failed: {e}"))
        })?;

        info!(document.id = %document_id, sources_used, "answered question");

        Ok(Answer { text, sources_used })
    }
}

/// Builder for constructing a [`DocQaPipeline`].
///
/// All component fields are required; `collection` defaults to `documents`.
#[derive(Default)]
pub struct DocQaPipelineBuilder {
    config: Option<RagConfig>,
    collection: Option<String>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    completion_model: Option<Arc<dyn CompletionModel>>,
}

impl DocQaPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the vector store collection name (default `documents`).
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = Some(name.into());
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the chat-completion model.
    pub fn completion_model(mut self, model: Arc<dyn CompletionModel>) -> Self {
        self.completion_model = Some(model);
        self
    }

    /// Build the [`DocQaPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing.
    pub fn build(self) -> Result<DocQaPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chunker =
            self.chunker.ok_or_else(|| RagError::ConfigError("chunker is required".to_string()))?;
        let completion_model = self
            .completion_model
            .ok_or_else(|| RagError::ConfigError("completion_model is required".to_string()))?;

        Ok(DocQaPipeline {
            config,
            collection: self.collection.unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            embedding_provider,
            vector_store,
            chunker,
            completion_model,
        })
    }
}
