//! Vector store trait for storing and searching vector embeddings.

use async_trait::async_trait;

use crate::document::{Chunk, SearchResult};
use crate::error::Result;

/// A storage backend for vector embeddings with filtered similarity search.
///
/// Implementations manage named collections of [`Chunk`]s keyed by chunk id.
/// Writes are insert-only: upserting an existing key overwrites it, and there
/// is no update path. Every search can be restricted to a single document's
/// chunks via the `document_id` filter, which the backend must apply itself —
/// callers never post-filter.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{VectorStore, InMemoryVectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("documents", 1024).await?;
/// store.upsert("documents", &chunks).await?;
/// let results = store.search("documents", &query_embedding, 3, Some(&doc_id)).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Upsert chunks into a collection. Chunks must have embeddings set;
    /// reusing a chunk id overwrites the stored record.
    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()>;

    /// Search for the `top_k` most similar chunks to the given embedding.
    ///
    /// When `document_id` is set, only chunks belonging to that document are
    /// considered. Returns results ordered by descending similarity score;
    /// ties keep the backend's return order.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
        document_id: Option<&str>,
    ) -> Result<Vec<SearchResult>>;
}
