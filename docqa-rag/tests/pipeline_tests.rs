//! End-to-end pipeline tests over the in-memory store with mock
//! embedding and completion backends.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use docqa_rag::{
    CompletionModel, DocQaPipeline, EmbeddingProvider, FixedSizeChunker, InMemoryVectorStore,
    NO_MATCH_ANSWER, RagConfig, RagError, Result, VectorStore,
};

/// Hashes text into a deterministic normalized 64-dim vector.
fn hash_embedding(text: &str) -> Vec<f32> {
    let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
    let mut v = vec![0.0f32; 64];
    for (i, x) in v.iter_mut().enumerate() {
        *x = ((hash.wrapping_add(i as u64)) as f32).sin();
    }
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}

/// Deterministic embedder backed by [`hash_embedding`].
struct MockEmbedder {
    calls: AtomicUsize,
}

impl MockEmbedder {
    fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(hash_embedding(text))
    }

    fn dimensions(&self) -> usize {
        64
    }
}

/// Embedder that always fails; used to exercise error paths.
struct FailingEmbedder;

#[async_trait::async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::EmbeddingError { provider: "mock".into(), message: "down".into() })
    }

    fn dimensions(&self) -> usize {
        64
    }
}

/// Embedder whose first `embed_batch` call succeeds and every later one fails.
struct FlakyBatchEmbedder {
    batches: AtomicUsize,
}

impl FlakyBatchEmbedder {
    fn new() -> Self {
        Self { batches: AtomicUsize::new(0) }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for FlakyBatchEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(hash_embedding(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if self.batches.fetch_add(1, Ordering::SeqCst) > 0 {
            return Err(RagError::EmbeddingError { provider: "mock".into(), message: "down".into() });
        }
        Ok(texts.iter().map(|t| hash_embedding(t)).collect())
    }

    fn dimensions(&self) -> usize {
        64
    }
}

/// Completion model that echoes the context it was given.
struct EchoCompletion {
    calls: AtomicUsize,
}

impl EchoCompletion {
    fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }
}

#[async_trait::async_trait]
impl CompletionModel for EchoCompletion {
    async fn complete(&self, context: &str, question: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("Q: {question} | CONTEXT: {context}"))
    }
}

fn build_pipeline(
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    completion: Arc<dyn CompletionModel>,
    config: RagConfig,
) -> DocQaPipeline {
    let (chunk_size, chunk_overlap) = (config.chunk_size, config.chunk_overlap);
    DocQaPipeline::builder()
        .config(config)
        .embedding_provider(embedder)
        .vector_store(store)
        .chunker(Arc::new(FixedSizeChunker::new(chunk_size, chunk_overlap)))
        .completion_model(completion)
        .build()
        .unwrap()
}

fn temp_txt(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[tokio::test]
async fn ingest_returns_document_id_and_chunk_count() {
    let pipeline = build_pipeline(
        Arc::new(MockEmbedder::new()),
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(EchoCompletion::new()),
        RagConfig::default(),
    );
    pipeline.ensure_collection().await.unwrap();

    let file = temp_txt("The warehouse inventory system tracks pallets by aisle and bay.");
    let report = pipeline.ingest_file(file.path(), "notes.txt").await.unwrap();

    assert!(!report.document_id.is_empty());
    assert!(report.chunks_processed >= 1);
    assert_eq!(report.pages, 1);
}

#[tokio::test]
async fn thousand_chars_with_size_500_overlap_100_yields_three_chunks() {
    let pipeline = build_pipeline(
        Arc::new(MockEmbedder::new()),
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(EchoCompletion::new()),
        RagConfig::builder().chunk_size(500).chunk_overlap(100).build().unwrap(),
    );
    pipeline.ensure_collection().await.unwrap();

    let file = temp_txt(&"x".repeat(1000));
    let report = pipeline.ingest_file(file.path(), "notes.txt").await.unwrap();

    // windows start at 0, 400, 800
    assert_eq!(report.chunks_processed, 3);
}

#[tokio::test]
async fn unsupported_extension_writes_nothing() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = build_pipeline(
        Arc::new(MockEmbedder::new()),
        store.clone(),
        Arc::new(EchoCompletion::new()),
        RagConfig::default(),
    );
    pipeline.ensure_collection().await.unwrap();

    let file = temp_txt("a,b,c");
    let err = pipeline.ingest_file(file.path(), "table.csv").await.unwrap_err();
    assert!(matches!(err, RagError::UnsupportedFileType(_)));

    let results = store.search("documents", &[0.0; 64], 10, None).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn embedding_failure_surfaces_as_pipeline_error() {
    let pipeline = build_pipeline(
        Arc::new(FailingEmbedder),
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(EchoCompletion::new()),
        RagConfig::default(),
    );
    pipeline.ensure_collection().await.unwrap();

    let file = temp_txt("some text");
    let err = pipeline.ingest_file(file.path(), "notes.txt").await.unwrap_err();
    assert!(matches!(err, RagError::PipelineError(_)));
}

#[tokio::test]
async fn mid_batch_failure_leaves_earlier_batches_written() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = build_pipeline(
        Arc::new(FlakyBatchEmbedder::new()),
        store.clone(),
        Arc::new(EchoCompletion::new()),
        RagConfig::builder()
            .chunk_size(10)
            .chunk_overlap(0)
            .embed_batch_size(4)
            .build()
            .unwrap(),
    );
    pipeline.ensure_collection().await.unwrap();

    // 7 chunks of 10 chars split into batches of 4 + 3; the second batch fails.
    let file = temp_txt(&"x".repeat(70));
    let err = pipeline.ingest_file(file.path(), "notes.txt").await.unwrap_err();
    assert!(matches!(err, RagError::PipelineError(_)));

    // The first batch stays durably written under one document id.
    let leftovers = store.search("documents", &hash_embedding("x"), 100, None).await.unwrap();
    assert_eq!(leftovers.len(), 4);
    let document_id = &leftovers[0].chunk.document_id;
    assert!(leftovers.iter().all(|r| &r.chunk.document_id == document_id));
}

#[tokio::test]
async fn unknown_document_gets_canned_answer_without_completion_call() {
    let completion = Arc::new(EchoCompletion::new());
    let pipeline = build_pipeline(
        Arc::new(MockEmbedder::new()),
        Arc::new(InMemoryVectorStore::new()),
        completion.clone(),
        RagConfig::default(),
    );
    pipeline.ensure_collection().await.unwrap();

    let answer = pipeline.answer("anything?", "no-such-document").await.unwrap();

    assert_eq!(answer.text, NO_MATCH_ANSWER);
    assert_eq!(answer.sources_used, 0);
    assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn answer_uses_retrieved_chunks_and_reports_source_count() {
    let completion = Arc::new(EchoCompletion::new());
    let pipeline = build_pipeline(
        Arc::new(MockEmbedder::new()),
        Arc::new(InMemoryVectorStore::new()),
        completion.clone(),
        RagConfig::default(),
    );
    pipeline.ensure_collection().await.unwrap();

    let file = temp_txt("The shipment arrives on Thursday at the loading dock.");
    let report = pipeline.ingest_file(file.path(), "notes.txt").await.unwrap();

    let answer = pipeline.answer("when does the shipment arrive?", &report.document_id).await.unwrap();

    assert!(answer.sources_used >= 1);
    assert!(answer.sources_used <= pipeline.config().top_k);
    assert!(answer.text.contains("shipment"));
    assert_eq!(completion.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn answers_never_cross_document_boundaries() {
    let completion = Arc::new(EchoCompletion::new());
    let pipeline = build_pipeline(
        Arc::new(MockEmbedder::new()),
        Arc::new(InMemoryVectorStore::new()),
        completion.clone(),
        RagConfig::default(),
    );
    pipeline.ensure_collection().await.unwrap();

    let file_a = temp_txt("ALPHA facts about the first document.");
    let file_b = temp_txt("BRAVO facts about the second document.");
    let report_a = pipeline.ingest_file(file_a.path(), "a.txt").await.unwrap();
    let _report_b = pipeline.ingest_file(file_b.path(), "b.txt").await.unwrap();

    // Ask document A for document B's content; the context must stay in A.
    let answer = pipeline.answer("what are the BRAVO facts?", &report_a.document_id).await.unwrap();

    assert!(answer.text.contains("ALPHA"));
    assert!(!answer.text.contains("BRAVO facts about the second document"));
    assert!(answer.sources_used >= 1);
}
